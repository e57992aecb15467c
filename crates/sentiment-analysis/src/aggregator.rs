use analysis_core::{parse_date, AnalysisContext, NewsItem, SentimentModel};
use chrono::NaiveDate;
use std::sync::Arc;

/// Time-decayed mean polarity of an instrument's news.
///
/// Each item's polarity is weighted by `clamp(1 - age_days / decay_days, 0, 1)`
/// and the weighted values are averaged over every item with a readable
/// date. Items older than the decay horizon still count in the denominator.
pub struct SentimentAggregator {
    model: Arc<dyn SentimentModel>,
    decay_days: f64,
}

impl SentimentAggregator {
    pub fn new(model: Arc<dyn SentimentModel>, decay_days: f64) -> Self {
        Self { model, decay_days }
    }

    /// Linear recency weight. News dated after `as_of` weighs 1.
    pub fn recency_weight(&self, published: NaiveDate, as_of: NaiveDate) -> f64 {
        let age_days = (as_of - published).num_days() as f64;
        if self.decay_days <= 0.0 {
            return if age_days <= 0.0 { 1.0 } else { 0.0 };
        }
        (1.0 - age_days / self.decay_days).clamp(0.0, 1.0)
    }

    /// Score a set of news items; 0 when none of them carries a usable date.
    pub fn score_items(&self, symbol: &str, items: &[NewsItem], as_of: NaiveDate) -> f64 {
        let mut total = 0.0;
        let mut counted = 0usize;

        for item in items {
            let Some(published) = parse_date(&item.published_date) else {
                tracing::warn!(
                    "{}: skipping news item with malformed date '{}'",
                    symbol,
                    item.published_date
                );
                continue;
            };

            let polarity = self.model.polarity(&item.text());
            let polarity = if polarity.is_finite() {
                polarity.clamp(-1.0, 1.0)
            } else {
                0.0
            };

            total += polarity * self.recency_weight(published, as_of);
            counted += 1;
        }

        if counted == 0 {
            return 0.0;
        }
        total / counted as f64
    }

    pub fn aggregate(&self, symbol: &str, context: &AnalysisContext) -> f64 {
        self.score_items(symbol, context.news.for_symbol(symbol), context.as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::NewsIndex;
    use chrono::Duration;

    struct FixedModel(f64);

    impl SentimentModel for FixedModel {
        fn polarity(&self, _text: &str) -> f64 {
            self.0
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn news(symbol: &str, days_ago: i64, headline: &str) -> NewsItem {
        NewsItem {
            symbol: symbol.to_string(),
            published_date: (as_of() - Duration::days(days_ago)).format("%Y-%m-%d").to_string(),
            headline: headline.to_string(),
            remarks: String::new(),
        }
    }

    fn aggregator(polarity: f64) -> SentimentAggregator {
        SentimentAggregator::new(Arc::new(FixedModel(polarity)), 30.0)
    }

    #[test]
    fn test_no_news_scores_exactly_zero() {
        let agg = aggregator(0.9);
        let ctx = AnalysisContext::new(NewsIndex::default(), as_of());
        assert_eq!(agg.aggregate("ABC", &ctx), 0.0);
    }

    #[test]
    fn test_stale_news_weighs_zero() {
        let agg = aggregator(1.0);
        let score = agg.score_items("ABC", &[news("ABC", 31, "great")], as_of());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_recent_positive_news_is_positive() {
        let agg = SentimentAggregator::new(Arc::new(crate::LexiconSentimentModel::new()), 30.0);
        let ctx = AnalysisContext::new(
            NewsIndex::from_items(vec![news("ABC", 0, "great"), news("XYZ", 0, "crash")]),
            as_of(),
        );
        assert!(agg.aggregate("ABC", &ctx) > 0.0);
        assert!(agg.aggregate("XYZ", &ctx) < 0.0);
    }

    #[test]
    fn test_linear_decay_and_mean() {
        let agg = aggregator(1.0);
        // weights 1.0 and 0.5, mean 0.75
        let items = vec![news("ABC", 0, "a"), news("ABC", 15, "b")];
        let score = agg.score_items("ABC", &items, as_of());
        assert!((score - 0.75).abs() < 1e-9);

        // stale item still dilutes the mean
        let items = vec![news("ABC", 0, "a"), news("ABC", 45, "b")];
        let score = agg.score_items("ABC", &items, as_of());
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_dates_are_skipped() {
        let agg = aggregator(-0.8);
        let mut bad = news("ABC", 0, "x");
        bad.published_date = "yesterday".to_string();
        let items = vec![bad.clone(), news("ABC", 0, "y")];
        let score = agg.score_items("ABC", &items, as_of());
        assert!((score + 0.8).abs() < 1e-9);

        assert_eq!(agg.score_items("ABC", &[bad], as_of()), 0.0);
    }

    #[test]
    fn test_future_dates_are_clamped() {
        let agg = aggregator(0.6);
        let score = agg.score_items("ABC", &[news("ABC", -5, "a")], as_of());
        assert!((score - 0.6).abs() < 1e-9);
        assert_eq!(agg.recency_weight(as_of() + Duration::days(3), as_of()), 1.0);
    }

    #[test]
    fn test_timestamped_dates_are_accepted() {
        let agg = aggregator(1.0);
        let mut item = news("ABC", 0, "a");
        item.published_date = "2024-06-30T09:45:00".to_string();
        assert_eq!(agg.score_items("ABC", &[item], as_of()), 1.0);
    }

    #[test]
    fn test_non_finite_polarity_counts_as_neutral() {
        let agg = aggregator(f64::NAN);
        assert_eq!(agg.score_items("ABC", &[news("ABC", 0, "a")], as_of()), 0.0);
    }
}
