use analysis_core::{
    DecisionConfig, FinalSignal, TechnicalVerdict, PRESSURE_POINTS, QUORUM_POINTS,
    SENTIMENT_POINTS, TECHNICAL_POINTS,
};
use serde::{Deserialize, Serialize};

/// Point tally behind a final signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub buy_points: u32,
    pub sell_points: u32,
    pub signal: FinalSignal,
}

/// Fuse the technical verdict, net pressure and sentiment into a signal.
///
/// A side wins only with at least `QUORUM_POINTS` and strictly more points
/// than the other side, so no single input can produce a trade on its own.
pub fn decide(
    verdict: TechnicalVerdict,
    net_pressure: f64,
    sentiment: f64,
    config: &DecisionConfig,
) -> Decision {
    let mut buy_points = 0;
    let mut sell_points = 0;

    match verdict {
        TechnicalVerdict::Buy => buy_points += TECHNICAL_POINTS,
        TechnicalVerdict::Sell => sell_points += TECHNICAL_POINTS,
        TechnicalVerdict::Neutral => {}
    }

    let deadband = config.pressure_deadband.abs();
    if net_pressure > deadband {
        buy_points += PRESSURE_POINTS;
    } else if net_pressure < -deadband {
        sell_points += PRESSURE_POINTS;
    }

    let threshold = config.sentiment_threshold.abs();
    if sentiment > threshold {
        buy_points += SENTIMENT_POINTS;
    } else if sentiment < -threshold {
        sell_points += SENTIMENT_POINTS;
    }

    let signal = if buy_points >= QUORUM_POINTS && buy_points > sell_points {
        FinalSignal::Buy
    } else if sell_points >= QUORUM_POINTS && sell_points > buy_points {
        FinalSignal::Sell
    } else {
        FinalSignal::Hold
    };

    Decision {
        buy_points,
        sell_points,
        signal,
    }
}
