use analysis_core::{stats, PriceBar};

// Every column returned here is aligned with its input: element `i` is the
// indicator value at bar `i`, `NaN` where the value is not yet defined.

/// Rolling mean over `window` values that starts producing output once
/// `min_periods` values are available.
pub fn rolling_mean(data: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; data.len()];
    }
    let min_periods = min_periods.clamp(1, window);

    (0..data.len())
        .map(|i| {
            let slice = &data[(i + 1).saturating_sub(window)..=i];
            if slice.len() < min_periods {
                f64::NAN
            } else {
                stats::mean(slice)
            }
        })
        .collect()
}

/// Rolling sample standard deviation over full windows only.
pub fn rolling_std(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; data.len()];
    }

    (0..data.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                stats::std_dev(&data[i + 1 - window..=i])
            }
        })
        .collect()
}

/// Simple Moving Average. Leading bars average over whatever history exists,
/// so the first `period - 1` values are partial-window means.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(data, period, 1)
}

/// Exponential Moving Average, recursive form seeded with the first value:
/// `ema[t] = a * x[t] + (1 - a) * ema[t-1]`, `a = 2 / (span + 1)`.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; data.len()];
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(data.len());
    for (i, &x) in data.iter().enumerate() {
        let value = if i == 0 {
            x
        } else {
            alpha * x + (1.0 - alpha) * result[i - 1]
        };
        result.push(value);
    }
    result
}

/// Relative Strength Index from rolling means of gains and losses.
///
/// The first bar has no predecessor and counts as an unchanged bar, so the
/// first value appears at index `period - 1`. A window without losses reads
/// 100 when it has gains and 50 when the price never moved.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; data.len()];
    }

    let mut gains = Vec::with_capacity(data.len());
    let mut losses = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        let change = if i == 0 { 0.0 } else { data[i] - data[i - 1] };
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    let avg_gain = rolling_mean(&gains, period, period);
    let avg_loss = rolling_mean(&losses, period, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            if gain.is_nan() || loss.is_nan() {
                f64::NAN
            } else if loss == 0.0 {
                if gain > 0.0 {
                    100.0
                } else {
                    50.0
                }
            } else {
                let rs = gain / loss;
                100.0 - (100.0 / (1.0 + rs))
            }
        })
        .collect()
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast_span: usize, slow_span: usize, signal_span: usize) -> MacdResult {
    let ema_fast = ema(data, fast_span);
    let ema_slow = ema(data, slow_span);

    let macd_line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal_span);
    let histogram = macd_line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Rolling mean +/- `num_std` rolling sample deviations. Undefined until a
/// full window exists.
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = rolling_mean(data, period, period);
    let std = rolling_std(data, period);

    let upper = middle.iter().zip(&std).map(|(m, s)| m + num_std * s).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - num_std * s).collect();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Volume-weighted buying and selling intensity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pressure {
    pub buy: f64,
    pub sell: f64,
}

impl Pressure {
    pub fn net(&self) -> f64 {
        self.buy - self.sell
    }
}

/// Sum of `volume * |percent change|`, split by the sign of the change.
/// Unchanged bars, and bars following a zero close, count on neither side.
pub fn buy_sell_pressure(bars: &[PriceBar]) -> Pressure {
    let mut pressure = Pressure::default();

    for pair in bars.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);
        if prev.close == 0.0 {
            continue;
        }
        let change_pct = (current.close - prev.close) / prev.close * 100.0;
        let weighted = current.volume * change_pct.abs();
        if !weighted.is_finite() {
            continue;
        }

        if change_pct > 0.0 {
            pressure.buy += weighted;
        } else if change_pct < 0.0 {
            pressure.sell += weighted;
        }
    }

    pressure
}
