use analysis_core::{stats, IndicatorConfig, IndicatorSnapshot, PriceSeries, TechnicalVerdict, Vote};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Individual indicator votes on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorVotes {
    pub moving_average: Vote,
    pub bollinger: Vote,
    pub macd: Vote,
    pub rsi: Vote,
}

impl IndicatorVotes {
    fn all(&self) -> [Vote; 4] {
        [self.moving_average, self.bollinger, self.macd, self.rsi]
    }

    pub fn buy_count(&self) -> usize {
        self.all().iter().filter(|v| **v == Vote::Buy).count()
    }

    pub fn sell_count(&self) -> usize {
        self.all().iter().filter(|v| **v == Vote::Sell).count()
    }

    /// Strict majority wins; ties, including all abstentions, are Neutral.
    pub fn verdict(&self) -> TechnicalVerdict {
        let (buy, sell) = (self.buy_count(), self.sell_count());
        if buy > sell {
            TechnicalVerdict::Buy
        } else if sell > buy {
            TechnicalVerdict::Sell
        } else {
            TechnicalVerdict::Neutral
        }
    }
}

/// Everything the technical stage contributes to one instrument's result
#[derive(Debug, Clone)]
pub struct TechnicalAnalysis {
    pub snapshot: IndicatorSnapshot,
    /// `None` when the history was too short to vote.
    pub votes: Option<IndicatorVotes>,
    pub verdict: TechnicalVerdict,
    pub pressure: Pressure,
}

pub struct TechnicalAnalysisEngine {
    config: IndicatorConfig,
}

impl TechnicalAnalysisEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Latest-bar values of every indicator. An empty series yields an empty
    /// snapshot; indicators whose window has not filled are `None`.
    pub fn compute_indicators(&self, series: &PriceSeries) -> IndicatorSnapshot {
        if series.is_empty() {
            return IndicatorSnapshot::default();
        }

        let cfg = &self.config;
        let closes = series.closes();

        let short_ma = sma(&closes, cfg.short_ma_window);
        let long_ma = sma(&closes, cfg.long_ma_window);
        let bb = bollinger_bands(&closes, cfg.bollinger_window, cfg.bollinger_num_std);
        let macd_result = macd(&closes, cfg.macd_fast_span, cfg.macd_slow_span, cfg.macd_signal_span);
        let rsi_values = rsi(&closes, cfg.rsi_window);

        IndicatorSnapshot {
            bar_count: series.len(),
            close: stats::last_finite(&closes),
            short_ma: stats::last_finite(&short_ma),
            long_ma: stats::last_finite(&long_ma),
            bollinger_lower: stats::last_finite(&bb.lower),
            bollinger_middle: stats::last_finite(&bb.middle),
            bollinger_upper: stats::last_finite(&bb.upper),
            macd: stats::last_finite(&macd_result.macd_line),
            macd_signal: stats::last_finite(&macd_result.signal_line),
            macd_histogram: stats::last_finite(&macd_result.histogram),
            rsi: stats::last_finite(&rsi_values),
        }
    }

    /// Collect one vote per indicator. Missing inputs abstain.
    pub fn votes(&self, snapshot: &IndicatorSnapshot) -> IndicatorVotes {
        let moving_average = match (snapshot.short_ma, snapshot.long_ma) {
            (Some(short), Some(long)) if short > long => Vote::Buy,
            (Some(_), Some(_)) => Vote::Sell,
            _ => Vote::Abstain,
        };

        let bollinger = match (snapshot.close, snapshot.bollinger_lower, snapshot.bollinger_upper) {
            (Some(close), Some(lower), _) if close < lower => Vote::Buy,
            (Some(close), _, Some(upper)) if close > upper => Vote::Sell,
            _ => Vote::Abstain,
        };

        let macd = match (snapshot.macd, snapshot.macd_signal) {
            (Some(line), Some(signal)) if line > signal => Vote::Buy,
            (Some(_), Some(_)) => Vote::Sell,
            _ => Vote::Abstain,
        };

        let rsi = match snapshot.rsi {
            Some(value) if value < self.config.rsi_oversold => Vote::Buy,
            Some(value) if value > self.config.rsi_overbought => Vote::Sell,
            _ => Vote::Abstain,
        };

        IndicatorVotes {
            moving_average,
            bollinger,
            macd,
            rsi,
        }
    }

    /// Technical verdict for a snapshot; Neutral without voting when the
    /// history is shorter than the configured minimum.
    pub fn resolve(&self, snapshot: &IndicatorSnapshot) -> (TechnicalVerdict, Option<IndicatorVotes>) {
        if snapshot.bar_count < self.config.min_bars {
            return (TechnicalVerdict::Neutral, None);
        }
        let votes = self.votes(snapshot);
        (votes.verdict(), Some(votes))
    }

    pub fn analyze(&self, series: &PriceSeries) -> TechnicalAnalysis {
        let snapshot = self.compute_indicators(series);
        let (verdict, votes) = self.resolve(&snapshot);
        if votes.is_none() {
            tracing::debug!(
                "Insufficient data for {}: {} bars, need {}",
                series.symbol(),
                series.len(),
                self.config.min_bars
            );
        }

        TechnicalAnalysis {
            snapshot,
            votes,
            verdict,
            pressure: buy_sell_pressure(series.bars()),
        }
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}
