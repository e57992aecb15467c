use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Listed instrument from the exchange roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub active: bool,
}

/// Raw daily history record as delivered by retrieval, before cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecord {
    pub business_date: String,
    pub close_price: Option<f64>,
    pub total_traded_quantity: Option<f64>,
}

/// One trading day for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Cleaned, date-ordered daily history for one instrument.
///
/// Built once per run from retrieval output and never mutated afterwards;
/// indicators are computed as views over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Clean raw records into a series.
    ///
    /// Records with a missing or non-finite close, or an unparseable date,
    /// are dropped. Bars are sorted by date; when a date repeats the record
    /// that arrived last wins. A missing quantity counts as zero volume.
    pub fn from_records(symbol: &str, records: &[PriceRecord]) -> Self {
        let mut by_date: HashMap<NaiveDate, PriceBar> = HashMap::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            let close = match record.close_price {
                Some(c) if c.is_finite() => c,
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            let Some(date) = parse_date(&record.business_date) else {
                dropped += 1;
                continue;
            };
            let volume = record
                .total_traded_quantity
                .filter(|q| q.is_finite())
                .unwrap_or(0.0);
            by_date.insert(date, PriceBar { date, close, volume });
        }

        if dropped > 0 {
            tracing::debug!("{}: dropped {} unusable history records", symbol, dropped);
        }

        let mut bars: Vec<PriceBar> = by_date.into_values().collect();
        bars.sort_by_key(|b| b.date);

        Self {
            symbol: symbol.to_string(),
            bars,
        }
    }

    pub fn from_bars(symbol: &str, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                *earlier = *later;
                true
            } else {
                false
            }
        });
        Self {
            symbol: symbol.to_string(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

/// Parse a calendar date that may carry a trailing time part
/// (`2024-05-01`, `2024-05-01T10:00:00`, `2024-05-01 10:00:00`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Company news disclosure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub symbol: String,
    /// Kept verbatim; malformed dates are skipped at aggregation time.
    pub published_date: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub remarks: String,
}

impl NewsItem {
    /// Text scored by the polarity model: headline followed by remarks.
    pub fn text(&self) -> String {
        format!("{} {}", self.headline, self.remarks)
    }
}

/// News grouped by symbol, built once per run and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct NewsIndex {
    by_symbol: HashMap<String, Vec<NewsItem>>,
}

impl NewsIndex {
    pub fn from_items(items: impl IntoIterator<Item = NewsItem>) -> Self {
        let mut by_symbol: HashMap<String, Vec<NewsItem>> = HashMap::new();
        for item in items {
            let symbol = item.symbol.trim();
            if symbol.is_empty() {
                continue;
            }
            by_symbol.entry(symbol.to_string()).or_default().push(item);
        }
        Self { by_symbol }
    }

    pub fn for_symbol(&self, symbol: &str) -> &[NewsItem] {
        self.by_symbol.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn item_count(&self) -> usize {
        self.by_symbol.values().map(Vec::len).sum()
    }
}

/// Read-only context handed to every per-instrument analysis of a run
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub news: Arc<NewsIndex>,
    /// Reference date for news recency.
    pub as_of: NaiveDate,
}

impl AnalysisContext {
    pub fn new(news: NewsIndex, as_of: NaiveDate) -> Self {
        Self {
            news: Arc::new(news),
            as_of,
        }
    }
}

/// Exchange-wide status, fetched once per run for logging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketStatus {
    pub is_open: bool,
    #[serde(default)]
    pub index: Option<serde_json::Value>,
}

/// Single indicator's opinion on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Buy,
    Sell,
    Abstain,
}

/// Categorical outcome of the technical resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechnicalVerdict {
    Buy,
    Sell,
    Neutral,
}

impl TechnicalVerdict {
    pub fn to_label(&self) -> &'static str {
        match self {
            TechnicalVerdict::Buy => "Buy",
            TechnicalVerdict::Sell => "Sell",
            TechnicalVerdict::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for TechnicalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

/// Fused recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalSignal {
    Buy,
    Sell,
    Hold,
}

impl FinalSignal {
    pub fn to_label(&self) -> &'static str {
        match self {
            FinalSignal::Buy => "Buy",
            FinalSignal::Sell => "Sell",
            FinalSignal::Hold => "Hold",
        }
    }
}

impl fmt::Display for FinalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

/// Latest-bar indicator values. `None` means the value is not computable
/// from the available history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub bar_count: usize,
    pub close: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi: Option<f64>,
}

/// Per-instrument output record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub buy_pressure: f64,
    pub sell_pressure: f64,
    pub net_pressure: f64,
    pub sentiment_score: f64,
    pub technical_verdict: TechnicalVerdict,
    pub buy_points: u32,
    pub sell_points: u32,
    pub final_signal: FinalSignal,
    pub indicators: IndicatorSnapshot,
}

/// Indicator that owns a presentation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketIndicator {
    Bollinger,
    Macd,
    Rsi,
    MovingAverage,
}

impl BucketIndicator {
    pub const ALL: [BucketIndicator; 4] = [
        BucketIndicator::Bollinger,
        BucketIndicator::Macd,
        BucketIndicator::Rsi,
        BucketIndicator::MovingAverage,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            BucketIndicator::Bollinger => "Bollinger",
            BucketIndicator::Macd => "MACD",
            BucketIndicator::Rsi => "RSI",
            BucketIndicator::MovingAverage => "MA",
        }
    }
}

/// Side of an indicator bucket; only Buy and Sell results are bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketSide {
    Buy,
    Sell,
}

impl BucketSide {
    pub fn signal(&self) -> FinalSignal {
        match self {
            BucketSide::Buy => FinalSignal::Buy,
            BucketSide::Sell => FinalSignal::Sell,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            BucketSide::Buy => "Buy",
            BucketSide::Sell => "Sell",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    pub result: AnalysisResult,
    pub score: Option<f64>,
}

/// Presentation bucket such as `RSI_Buy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorBucket {
    pub indicator: BucketIndicator,
    pub side: BucketSide,
    /// False when a member lacked the values needed for scoring.
    pub scored: bool,
    pub entries: Vec<ScoredResult>,
}

impl IndicatorBucket {
    pub fn name(&self) -> String {
        format!("{}_{}", self.indicator.prefix(), self.side.suffix())
    }
}

/// Ranked, partitioned output of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub generated_at: DateTime<Utc>,
    pub total_instruments: usize,
    /// Buy bucket, then Sell bucket, then Hold bucket.
    pub overall: Vec<AnalysisResult>,
    pub buy: Vec<AnalysisResult>,
    pub sell: Vec<AnalysisResult>,
    pub hold: Vec<AnalysisResult>,
    pub indicator_buckets: Vec<IndicatorBucket>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.overall.is_empty()
    }

    pub fn bucket(&self, indicator: BucketIndicator, side: BucketSide) -> Option<&IndicatorBucket> {
        self.indicator_buckets
            .iter()
            .find(|b| b.indicator == indicator && b.side == side)
    }
}
