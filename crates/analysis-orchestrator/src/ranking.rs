use analysis_core::{
    AnalysisResult, BucketIndicator, BucketSide, FinalSignal, IndicatorBucket, IndicatorConfig,
    IndicatorSnapshot, ResultSet, ScoredResult, TechnicalVerdict,
};
use chrono::Utc;
use std::cmp::Ordering;

/// Partition, rank and bucket a run's results.
///
/// Results are first ordered by symbol so the output does not depend on the
/// order in which workers finished; every later sort is stable.
pub fn build_result_set(
    mut results: Vec<AnalysisResult>,
    total_instruments: usize,
    config: &IndicatorConfig,
) -> ResultSet {
    results.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut buy = Vec::new();
    let mut sell = Vec::new();
    let mut hold = Vec::new();
    for result in results {
        match result.final_signal {
            FinalSignal::Buy => buy.push(result),
            FinalSignal::Sell => sell.push(result),
            FinalSignal::Hold => hold.push(result),
        }
    }

    buy.sort_by(compare_buy);
    sell.sort_by(compare_sell);

    let mut indicator_buckets = Vec::with_capacity(BucketIndicator::ALL.len() * 2);
    for indicator in BucketIndicator::ALL {
        indicator_buckets.push(score_bucket(indicator, BucketSide::Buy, &buy, config));
        indicator_buckets.push(score_bucket(indicator, BucketSide::Sell, &sell, config));
    }

    let overall = buy.iter().chain(&sell).chain(&hold).cloned().collect();

    ResultSet {
        generated_at: Utc::now(),
        total_instruments,
        overall,
        buy,
        sell,
        hold,
        indicator_buckets,
    }
}

/// Technically confirmed buys first, then strongest net pressure, then
/// strongest sentiment.
fn compare_buy(a: &AnalysisResult, b: &AnalysisResult) -> Ordering {
    let confirmed = |r: &AnalysisResult| r.technical_verdict == TechnicalVerdict::Buy;
    confirmed(b)
        .cmp(&confirmed(a))
        .then_with(|| b.net_pressure.total_cmp(&a.net_pressure))
        .then_with(|| b.sentiment_score.total_cmp(&a.sentiment_score))
}

/// Mirror image of [`compare_buy`]: technically confirmed sells first, then
/// the most negative net pressure, then the most negative sentiment.
fn compare_sell(a: &AnalysisResult, b: &AnalysisResult) -> Ordering {
    let confirmed = |r: &AnalysisResult| r.technical_verdict == TechnicalVerdict::Sell;
    confirmed(b)
        .cmp(&confirmed(a))
        .then_with(|| a.net_pressure.total_cmp(&b.net_pressure))
        .then_with(|| a.sentiment_score.total_cmp(&b.sentiment_score))
}

/// Relative strength of an already classified result within one indicator
/// bucket. `None` when a value the score needs is missing.
pub fn indicator_score(
    indicator: BucketIndicator,
    side: BucketSide,
    snapshot: &IndicatorSnapshot,
    config: &IndicatorConfig,
) -> Option<f64> {
    let s = snapshot;
    match (indicator, side) {
        (BucketIndicator::Bollinger, BucketSide::Buy) => Some(s.bollinger_lower? - s.close?),
        (BucketIndicator::Bollinger, BucketSide::Sell) => Some(s.close? - s.bollinger_upper?),
        (BucketIndicator::Macd, BucketSide::Buy) => Some(s.macd? - s.macd_signal?),
        (BucketIndicator::Macd, BucketSide::Sell) => Some(s.macd_signal? - s.macd?),
        (BucketIndicator::Rsi, BucketSide::Buy) => Some(config.rsi_oversold - s.rsi?),
        (BucketIndicator::Rsi, BucketSide::Sell) => Some(s.rsi? - config.rsi_overbought),
        (BucketIndicator::MovingAverage, BucketSide::Buy) => Some(s.short_ma? - s.long_ma?),
        (BucketIndicator::MovingAverage, BucketSide::Sell) => Some(s.long_ma? - s.short_ma?),
    }
}

fn score_bucket(
    indicator: BucketIndicator,
    side: BucketSide,
    ranked: &[AnalysisResult],
    config: &IndicatorConfig,
) -> IndicatorBucket {
    let scores: Vec<Option<f64>> = ranked
        .iter()
        .map(|r| indicator_score(indicator, side, &r.indicators, config))
        .collect();

    let mut bucket = IndicatorBucket {
        indicator,
        side,
        scored: true,
        entries: Vec::with_capacity(ranked.len()),
    };

    if let Some(pos) = scores.iter().position(Option::is_none) {
        tracing::warn!(
            "Scoring disabled for {}: {} lacks the required values",
            bucket.name(),
            ranked[pos].symbol
        );
        bucket.scored = false;
        bucket.entries = ranked
            .iter()
            .cloned()
            .map(|result| ScoredResult { result, score: None })
            .collect();
        return bucket;
    }

    bucket.entries = ranked
        .iter()
        .cloned()
        .zip(scores)
        .map(|(result, score)| ScoredResult { result, score })
        .collect();
    bucket.entries.sort_by(|a, b| {
        let (a, b) = (a.score.unwrap_or(f64::NEG_INFINITY), b.score.unwrap_or(f64::NEG_INFINITY));
        b.total_cmp(&a)
    });
    bucket
}
