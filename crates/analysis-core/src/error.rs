use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Run options that cannot be turned into a request.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Retrieval could not supply the requested data. Never fatal to a run.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The only run-level abort: no instrument produced a result.
    #[error("No instruments produced a result")]
    NoResults,
}
