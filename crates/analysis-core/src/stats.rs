//! Small numeric helpers shared by the indicator library, the aggregator and
//! the report writer.
//!
//! Undefined statistics are reported as `NaN` (window helpers) or `None`
//! (snapshot helpers) and never panic.

/// Arithmetic mean. `NaN` for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator). `NaN` below two points.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// `Some(value)` when the value is a usable number.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Last element of an indicator column, if it is defined.
pub fn last_finite(column: &[f64]) -> Option<f64> {
    column.last().copied().and_then(finite)
}

/// Round to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
