use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{AnalysisError, Instrument, MarketStatus, NewsItem, PriceRecord};

/// Text polarity capability: text in, score in [-1, 1] out.
pub trait SentimentModel: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Retrieval collaborator. Errors mean "no data"; callers decide how far
/// the absence propagates.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn market_status(&self) -> Result<MarketStatus, AnalysisError>;

    /// Active instruments only.
    async fn list_instruments(&self) -> Result<Vec<Instrument>, AnalysisError>;

    async fn price_history(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, AnalysisError>;

    async fn news(&self) -> Result<Vec<NewsItem>, AnalysisError>;
}
