use super::AnalysisOrchestrator;
use crate::ranking::build_result_set;
use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisResult, Instrument, MarketDataSource, NewsIndex,
    PriceSeries, ResultSet,
};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct ScreenerOptions {
    /// Maximum instruments analyzed at once.
    pub concurrency: usize,
    /// Calendar days of history requested per instrument.
    pub lookback_days: i64,
    /// Restrict the run to these symbols; `None` analyzes the whole roster.
    pub symbols: Option<Vec<String>>,
}

impl Default for ScreenerOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            lookback_days: 365,
            symbols: None,
        }
    }
}

/// Runs the per-instrument pipeline over the exchange roster on a bounded
/// worker pool and ranks what comes back.
pub struct SignalScreener {
    orchestrator: Arc<AnalysisOrchestrator>,
    source: Arc<dyn MarketDataSource>,
}

impl SignalScreener {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            orchestrator,
            source,
        }
    }

    pub async fn screen(&self, options: &ScreenerOptions) -> Result<ResultSet, AnalysisError> {
        self.screen_as_of(options, Utc::now().date_naive()).await
    }

    /// Full run with an explicit reference date for history and news decay.
    ///
    /// Only an empty outcome is an error: instruments that fail are logged
    /// and left out of the result set.
    pub async fn screen_as_of(
        &self,
        options: &ScreenerOptions,
        as_of: NaiveDate,
    ) -> Result<ResultSet, AnalysisError> {
        let from = history_start(as_of, options.lookback_days)?;

        match self.source.market_status().await {
            Ok(status) => tracing::info!(
                "Market is {}{}",
                if status.is_open { "open" } else { "closed" },
                status
                    .index
                    .as_ref()
                    .map(|idx| format!(", index: {}", idx))
                    .unwrap_or_default()
            ),
            Err(e) => tracing::warn!("Market status unavailable: {}", e),
        }

        let instruments = self.roster(options).await;
        let total = instruments.len();
        if total == 0 {
            tracing::warn!("No instruments to analyze");
            return Err(AnalysisError::NoResults);
        }

        let news = match self.source.news().await {
            Ok(items) => NewsIndex::from_items(items),
            Err(e) => {
                tracing::warn!("News unavailable, sentiment will be neutral: {}", e);
                NewsIndex::default()
            }
        };
        tracing::info!(
            "Loaded {} news items for {} symbols",
            news.item_count(),
            news.symbol_count()
        );

        let context = Arc::new(AnalysisContext::new(news, as_of));
        let concurrency = options.concurrency.max(1);

        tracing::info!(
            "📊 Analyzing {} instruments ({} workers, history from {})",
            total,
            concurrency,
            from
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        for instrument in instruments {
            let semaphore = Arc::clone(&semaphore);
            let orchestrator = Arc::clone(&self.orchestrator);
            let source = Arc::clone(&self.source);
            let context = Arc::clone(&context);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let err = AnalysisError::DataUnavailable("worker pool closed".to_string());
                    return (instrument.symbol, Err(err));
                };
                let result =
                    analyze_instrument(&orchestrator, source.as_ref(), &instrument, &context, from, as_of)
                        .await;
                (instrument.symbol, result)
            });
        }

        let mut results: Vec<AnalysisResult> = Vec::with_capacity(total);
        let mut failed = 0usize;
        let mut done = 0usize;

        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((symbol, Ok(result))) => {
                    tracing::info!(
                        "{}/{} {}: {} ({}, sentiment {:.3}, net pressure {:.0})",
                        done,
                        total,
                        symbol,
                        result.final_signal,
                        result.technical_verdict,
                        result.sentiment_score,
                        result.net_pressure
                    );
                    results.push(result);
                }
                Ok((symbol, Err(e))) => {
                    failed += 1;
                    tracing::warn!("{}/{} {}: skipped: {}", done, total, symbol, e);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("{}/{} analysis task failed: {}", done, total, e);
                }
            }
        }

        if results.is_empty() {
            tracing::warn!("No instrument produced a result ({} failed)", failed);
            return Err(AnalysisError::NoResults);
        }

        let set = build_result_set(results, total, &self.orchestrator.config().indicators);
        tracing::info!(
            "✅ Screen complete: {} analyzed, {} skipped: {} buy, {} sell, {} hold",
            set.overall.len(),
            failed,
            set.buy.len(),
            set.sell.len(),
            set.hold.len()
        );
        Ok(set)
    }

    /// Active roster, optionally narrowed to the requested symbols. A failed
    /// roster fetch yields no instruments.
    async fn roster(&self, options: &ScreenerOptions) -> Vec<Instrument> {
        let instruments = match self.source.list_instruments().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Instrument roster unavailable: {}", e);
                return Vec::new();
            }
        };

        let mut active: Vec<Instrument> = instruments.into_iter().filter(|i| i.active).collect();

        if let Some(wanted) = &options.symbols {
            active.retain(|i| wanted.iter().any(|s| s.eq_ignore_ascii_case(&i.symbol)));
            for symbol in wanted {
                if !active.iter().any(|i| i.symbol.eq_ignore_ascii_case(symbol)) {
                    tracing::warn!("{} is not an active listed instrument", symbol);
                }
            }
        }

        active
    }
}

/// First day of the history window. Out-of-range lookbacks are rejected
/// before any retrieval happens.
fn history_start(as_of: NaiveDate, lookback_days: i64) -> Result<NaiveDate, AnalysisError> {
    Duration::try_days(lookback_days.max(1))
        .and_then(|lookback| as_of.checked_sub_signed(lookback))
        .ok_or_else(|| {
            AnalysisError::InvalidOptions(format!(
                "lookback of {} days reaches before the earliest representable date",
                lookback_days
            ))
        })
}

async fn analyze_instrument(
    orchestrator: &AnalysisOrchestrator,
    source: &dyn MarketDataSource,
    instrument: &Instrument,
    context: &AnalysisContext,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<AnalysisResult, AnalysisError> {
    let records = source.price_history(instrument, from, to).await?;
    let series = PriceSeries::from_records(&instrument.symbol, &records);
    if series.is_empty() {
        return Err(AnalysisError::DataUnavailable(format!(
            "no usable price history in {} records",
            records.len()
        )));
    }

    Ok(orchestrator.analyze_series(&series, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{FinalSignal, MarketStatus, NewsItem, PriceRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySource {
        instruments: Vec<Instrument>,
        history: HashMap<i64, Vec<PriceRecord>>,
        news: Vec<NewsItem>,
        roster_down: bool,
        news_down: bool,
        panic_on: Option<i64>,
    }

    impl MemorySource {
        fn add(&mut self, id: i64, symbol: &str, active: bool, closes: &[f64]) {
            self.instruments.push(Instrument {
                id,
                symbol: symbol.to_string(),
                name: None,
                active,
            });
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let records = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| PriceRecord {
                    business_date: (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                    close_price: Some(c),
                    total_traded_quantity: Some(1000.0),
                })
                .collect();
            self.history.insert(id, records);
        }
    }

    #[async_trait]
    impl MarketDataSource for MemorySource {
        async fn market_status(&self) -> Result<MarketStatus, AnalysisError> {
            Ok(MarketStatus::default())
        }

        async fn list_instruments(&self) -> Result<Vec<Instrument>, AnalysisError> {
            if self.roster_down {
                return Err(AnalysisError::DataUnavailable("roster".to_string()));
            }
            Ok(self.instruments.clone())
        }

        async fn price_history(
            &self,
            instrument: &Instrument,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PriceRecord>, AnalysisError> {
            if self.panic_on == Some(instrument.id) {
                panic!("malformed payload for {}", instrument.symbol);
            }
            self.history
                .get(&instrument.id)
                .cloned()
                .ok_or_else(|| AnalysisError::DataUnavailable(instrument.symbol.clone()))
        }

        async fn news(&self) -> Result<Vec<NewsItem>, AnalysisError> {
            if self.news_down {
                return Err(AnalysisError::DataUnavailable("news".to_string()));
            }
            Ok(self.news.clone())
        }
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 300.0 - 2.0 * i as f64).collect()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn screener(source: MemorySource) -> SignalScreener {
        SignalScreener::new(Arc::new(AnalysisOrchestrator::default()), Arc::new(source))
    }

    fn symbols(results: &[AnalysisResult]) -> Vec<&str> {
        results.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[tokio::test]
    async fn test_failed_and_panicking_instruments_are_excluded() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(40));
        source.add(2, "BBB", true, &falling(40));
        source.add(3, "CCC", true, &rising(10));
        source.add(4, "PANIC", true, &rising(40));
        source.panic_on = Some(4);
        source.instruments.push(Instrument {
            id: 5,
            symbol: "GONE".to_string(),
            name: None,
            active: true,
        });

        let set = screener(source)
            .screen_as_of(&ScreenerOptions::default(), as_of())
            .await
            .unwrap();

        assert_eq!(set.total_instruments, 5);
        let mut analyzed = symbols(&set.overall);
        analyzed.sort();
        assert_eq!(analyzed, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(set.indicator_buckets.len(), 8);
    }

    #[tokio::test]
    async fn test_inactive_and_unrequested_instruments_are_skipped() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(30));
        source.add(2, "BBB", false, &rising(30));
        source.add(3, "CCC", true, &rising(30));

        let options = ScreenerOptions {
            symbols: Some(vec!["aaa".to_string(), "BBB".to_string()]),
            ..ScreenerOptions::default()
        };
        let set = screener(source).screen_as_of(&options, as_of()).await.unwrap();
        assert_eq!(symbols(&set.overall), vec!["AAA"]);
        assert_eq!(set.total_instruments, 1);
    }

    #[tokio::test]
    async fn test_zero_results_is_an_error() {
        let mut source = MemorySource::default();
        source.add(1, "EMPTY", true, &[]);
        source.instruments.push(Instrument {
            id: 2,
            symbol: "GONE".to_string(),
            name: None,
            active: true,
        });

        let err = screener(source)
            .screen_as_of(&ScreenerOptions::default(), as_of())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoResults));
    }

    #[test]
    fn test_history_start() {
        assert_eq!(
            history_start(as_of(), 365).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()
        );
        assert_eq!(
            history_start(as_of(), 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(history_start(as_of(), i64::MAX).is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_lookback_is_an_error() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(30));

        let options = ScreenerOptions {
            lookback_days: 100_000_000,
            ..ScreenerOptions::default()
        };
        let err = screener(source)
            .screen_as_of(&options, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn test_roster_failure_is_an_error() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(30));
        source.roster_down = true;

        let err = screener(source)
            .screen_as_of(&ScreenerOptions::default(), as_of())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoResults));
    }

    #[tokio::test]
    async fn test_news_failure_degrades_to_neutral_sentiment() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(30));
        source.news = vec![NewsItem {
            symbol: "AAA".to_string(),
            published_date: "2024-02-29".to_string(),
            headline: "excellent results".to_string(),
            remarks: String::new(),
        }];
        source.news_down = true;

        let set = screener(source)
            .screen_as_of(&ScreenerOptions::default(), as_of())
            .await
            .unwrap();
        assert_eq!(set.overall[0].sentiment_score, 0.0);
    }

    #[tokio::test]
    async fn test_news_reaches_the_right_instrument() {
        let mut source = MemorySource::default();
        source.add(1, "AAA", true, &rising(40));
        source.add(2, "BBB", true, &rising(40));
        source.news = vec![NewsItem {
            symbol: "AAA".to_string(),
            published_date: "2024-02-29".to_string(),
            headline: "excellent results".to_string(),
            remarks: String::new(),
        }];

        let set = screener(source)
            .screen_as_of(&ScreenerOptions::default(), as_of())
            .await
            .unwrap();
        let by_symbol: HashMap<&str, &AnalysisResult> =
            set.overall.iter().map(|r| (r.symbol.as_str(), r)).collect();
        assert!(by_symbol["AAA"].sentiment_score > 0.0);
        assert_eq!(by_symbol["BBB"].sentiment_score, 0.0);
        assert_eq!(by_symbol["AAA"].final_signal, FinalSignal::Buy);
    }

    #[tokio::test]
    async fn test_output_independent_of_concurrency() {
        let build = || {
            let mut source = MemorySource::default();
            for (i, symbol) in ["KKK", "AAA", "ZZZ", "MMM", "BBB", "QQQ"].iter().enumerate() {
                let closes = if i % 2 == 0 { rising(30 + i) } else { falling(30 + i) };
                source.add(i as i64, symbol, true, &closes);
            }
            source
        };

        let serial = ScreenerOptions {
            concurrency: 1,
            ..ScreenerOptions::default()
        };
        let parallel = ScreenerOptions {
            concurrency: 6,
            ..ScreenerOptions::default()
        };

        let a = screener(build()).screen_as_of(&serial, as_of()).await.unwrap();
        let b = screener(build()).screen_as_of(&parallel, as_of()).await.unwrap();
        assert_eq!(symbols(&a.overall), symbols(&b.overall));
        assert_eq!(symbols(&a.buy), symbols(&b.buy));
        assert_eq!(symbols(&a.sell), symbols(&b.sell));
    }
}
