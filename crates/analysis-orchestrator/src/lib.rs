use analysis_core::{
    AnalysisContext, AnalysisResult, EngineConfig, PriceSeries, SentimentModel,
};
use chrono::Utc;
use sentiment_analysis::{LexiconSentimentModel, SentimentAggregator};
use std::sync::Arc;
use technical_analysis::TechnicalAnalysisEngine;

pub mod decision;
pub mod ranking;
pub mod screener;

pub use decision::{decide, Decision};
pub use ranking::{build_result_set, indicator_score};
pub use screener::{ScreenerOptions, SignalScreener};

/// Per-instrument pipeline: indicators, verdict, sentiment, fusion.
///
/// Holds no per-run state; one instance is shared by every worker.
pub struct AnalysisOrchestrator {
    config: EngineConfig,
    technical_analyzer: TechnicalAnalysisEngine,
    sentiment_aggregator: SentimentAggregator,
}

impl AnalysisOrchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sentiment_model(config, Arc::new(LexiconSentimentModel::new()))
    }

    /// Swap in a different polarity model.
    pub fn with_sentiment_model(config: EngineConfig, model: Arc<dyn SentimentModel>) -> Self {
        Self {
            technical_analyzer: TechnicalAnalysisEngine::new(config.indicators.clone()),
            sentiment_aggregator: SentimentAggregator::new(model, config.sentiment_decay_days),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze_series(&self, series: &PriceSeries, context: &AnalysisContext) -> AnalysisResult {
        let symbol = series.symbol();
        let technical = self.technical_analyzer.analyze(series);
        let sentiment_score = self.sentiment_aggregator.aggregate(symbol, context);
        let net_pressure = technical.pressure.net();

        let decision = decide(
            technical.verdict,
            net_pressure,
            sentiment_score,
            &self.config.decision,
        );

        tracing::debug!(
            "{}: technical {}, net pressure {:.0}, sentiment {:.3} => {} ({}/{})",
            symbol,
            technical.verdict,
            net_pressure,
            sentiment_score,
            decision.signal,
            decision.buy_points,
            decision.sell_points
        );

        AnalysisResult {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            buy_pressure: technical.pressure.buy,
            sell_pressure: technical.pressure.sell,
            net_pressure,
            sentiment_score,
            technical_verdict: technical.verdict,
            buy_points: decision.buy_points,
            sell_points: decision.sell_points,
            final_signal: decision.signal,
            indicators: technical.snapshot,
        }
    }
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{FinalSignal, NewsIndex, NewsItem, PriceBar, TechnicalVerdict};
    use chrono::{Duration, NaiveDate};

    fn rising_series(symbol: &str, n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| PriceBar {
                date: start + Duration::days(i as i64),
                close: 100.0 + i as f64,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::from_bars(symbol, bars)
    }

    fn context_with(items: Vec<NewsItem>) -> AnalysisContext {
        AnalysisContext::new(
            NewsIndex::from_items(items),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        )
    }

    #[test]
    fn test_rising_series_with_good_news_is_buy() {
        let orchestrator = AnalysisOrchestrator::default();
        let ctx = context_with(vec![NewsItem {
            symbol: "ABC".to_string(),
            published_date: "2024-02-14".to_string(),
            headline: "Record profit".to_string(),
            remarks: "Board approved bonus shares".to_string(),
        }]);
        let result = orchestrator.analyze_series(&rising_series("ABC", 40), &ctx);

        assert_eq!(result.symbol, "ABC");
        assert!(result.net_pressure > 0.0);
        assert!(result.sentiment_score > 0.05);
        assert!(result.buy_points >= 2);
        assert_eq!(result.final_signal, FinalSignal::Buy);
        assert_eq!(result.indicators.bar_count, 40);
    }

    #[test]
    fn test_short_history_without_news_holds() {
        let orchestrator = AnalysisOrchestrator::default();
        let result = orchestrator.analyze_series(&rising_series("XYZ", 10), &context_with(vec![]));

        assert_eq!(result.technical_verdict, TechnicalVerdict::Neutral);
        assert_eq!(result.sentiment_score, 0.0);
        // pressure alone is one point
        assert_eq!(result.buy_points, 1);
        assert_eq!(result.final_signal, FinalSignal::Hold);
    }

    #[test]
    fn test_empty_series_is_neutral_hold() {
        let orchestrator = AnalysisOrchestrator::default();
        let series = PriceSeries::from_bars("NIL", vec![]);
        let result = orchestrator.analyze_series(&series, &context_with(vec![]));

        assert_eq!(result.net_pressure, 0.0);
        assert_eq!(result.buy_points + result.sell_points, 0);
        assert_eq!(result.final_signal, FinalSignal::Hold);
        assert!(result.indicators.close.is_none());
    }
}
