//! CSV rendering of a ranked result set.
//!
//! One run directory per invocation, holding the overall ranking, one file
//! per final signal and one file per indicator bucket. Every file is
//! written, header only when its bucket is empty.

use analysis_core::{stats, AnalysisResult, IndicatorBucket, ResultSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod labels;

const RESULT_HEADER: [&str; 20] = [
    "Symbol",
    "Final Signal",
    "Technical Signal",
    "Buy Points",
    "Sell Points",
    "Sentiment Score",
    "Buy Pressure",
    "Sell Pressure",
    "Net Pressure",
    "Close",
    "Short MA",
    "Long MA",
    "Bollinger Min",
    "Bollinger Mid",
    "Bollinger Max",
    "MACD",
    "MACD Signal",
    "MACD Histogram",
    "RSI",
    "Bars",
];

const SCORE_COLUMN: &str = "Score";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Refusing to write an empty result set")]
    EmptyResultSet,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Render signal labels in their short form (BY, SL, -, HOLD).
    pub abbreviate: bool,
}

pub struct ReportWriter {
    output_dir: PathBuf,
    options: ReportOptions,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, options: ReportOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
        }
    }

    /// Write the set into a fresh timestamped directory under the output
    /// directory and return that directory.
    pub fn write(&self, set: &ResultSet) -> Result<PathBuf, ReportError> {
        let run_dir = self
            .output_dir
            .join(set.generated_at.format("%Y-%m-%dT%H-%M-%S").to_string());
        self.write_to_dir(set, &run_dir)?;
        Ok(run_dir)
    }

    /// Write every report file into `dir`, creating it if needed.
    pub fn write_to_dir(&self, set: &ResultSet, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        if set.is_empty() {
            return Err(ReportError::EmptyResultSet);
        }
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(4 + set.indicator_buckets.len());
        for (name, results) in [
            ("overall", &set.overall),
            ("buy", &set.buy),
            ("sell", &set.sell),
            ("hold", &set.hold),
        ] {
            let path = dir.join(format!("{}.csv", name));
            self.write_results(&path, results)?;
            written.push(path);
        }

        for bucket in &set.indicator_buckets {
            let path = dir.join(format!("{}.csv", bucket.name()));
            self.write_bucket(&path, bucket)?;
            written.push(path);
        }

        tracing::info!(
            "Wrote {} report files for {} instruments to {}",
            written.len(),
            set.overall.len(),
            dir.display()
        );
        Ok(written)
    }

    fn write_results(&self, path: &Path, results: &[AnalysisResult]) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(RESULT_HEADER)?;
        for result in results {
            writer.write_record(self.row(result))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_bucket(&self, path: &Path, bucket: &IndicatorBucket) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(RESULT_HEADER.iter().chain(std::iter::once(&SCORE_COLUMN)))?;
        for entry in &bucket.entries {
            let mut row = self.row(&entry.result);
            row.push(decimal(entry.score));
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn row(&self, r: &AnalysisResult) -> Vec<String> {
        let abbreviate = self.options.abbreviate;
        let ind = &r.indicators;
        vec![
            r.symbol.clone(),
            labels::final_signal(r.final_signal, abbreviate).to_string(),
            labels::technical_verdict(r.technical_verdict, abbreviate).to_string(),
            r.buy_points.to_string(),
            r.sell_points.to_string(),
            decimal(Some(r.sentiment_score)),
            whole(r.buy_pressure),
            whole(r.sell_pressure),
            whole(r.net_pressure),
            decimal(ind.close),
            decimal(ind.short_ma),
            decimal(ind.long_ma),
            decimal(ind.bollinger_lower),
            decimal(ind.bollinger_middle),
            decimal(ind.bollinger_upper),
            decimal(ind.macd),
            decimal(ind.macd_signal),
            decimal(ind.macd_histogram),
            decimal(ind.rsi),
            ind.bar_count.to_string(),
        ]
    }
}

/// Two decimals; missing or non-finite values are empty cells.
fn decimal(value: Option<f64>) -> String {
    match value.and_then(stats::finite) {
        Some(v) => {
            let rounded = stats::round_to(v, 2);
            // avoid "-0.00"
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{:.2}", rounded)
        }
        None => String::new(),
    }
}

/// Integer part of a pressure value.
fn whole(value: f64) -> String {
    if value.is_finite() {
        format!("{}", value.trunc() as i64)
    } else {
        String::new()
    }
}
