use serde::{Deserialize, Serialize};

/// Points needed before a Buy or Sell recommendation is issued. With the
/// technical verdict worth 2 and pressure and sentiment worth 1 each, this
/// requires at least two independent signals to agree.
pub const QUORUM_POINTS: u32 = 3;
pub const TECHNICAL_POINTS: u32 = 2;
pub const PRESSURE_POINTS: u32 = 1;
pub const SENTIMENT_POINTS: u32 = 1;

/// Windows and thresholds for the indicator library and the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub short_ma_window: usize,
    pub long_ma_window: usize,
    pub bollinger_window: usize,
    pub bollinger_num_std: f64,
    pub macd_fast_span: usize,
    pub macd_slow_span: usize,
    pub macd_signal_span: usize,
    pub rsi_window: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Below this many valid bars the resolver returns Neutral without voting.
    pub min_bars: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_ma_window: 5,
            long_ma_window: 20,
            bollinger_window: 20,
            bollinger_num_std: 2.0,
            macd_fast_span: 12,
            macd_slow_span: 26,
            macd_signal_span: 9,
            rsi_window: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            min_bars: 20,
        }
    }
}

/// Fusion thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Sentiment must exceed +threshold (or fall below -threshold) to score.
    pub sentiment_threshold: f64,
    /// Net pressure must exceed +deadband (or fall below -deadband) to score.
    /// Zero gives the strict sign test.
    pub pressure_deadband: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: 0.05,
            pressure_deadband: 0.0,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub indicators: IndicatorConfig,
    pub decision: DecisionConfig,
    /// News older than this many days carries zero weight.
    pub sentiment_decay_days: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            decision: DecisionConfig::default(),
            sentiment_decay_days: 30.0,
        }
    }
}
