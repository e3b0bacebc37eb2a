use isoprint_dom::DomError;

/// Errors raised while setting up an isolated print.
///
/// Only validation and host failures surface here. Resources that fail to
/// load inside the render surface count as ready and never reach the caller.
#[derive(thiserror::Error, Debug)]
pub enum PrintError {
    #[error("Print target not found: {0}")]
    TargetNotFound(String),

    #[error("Print target is not attached to a document")]
    DetachedTarget,

    #[error("Nothing to print: {0}")]
    Unprintable(String),

    #[error("Invalid style exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid print options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// Result type for print operations
pub type PrintResult<T> = Result<T, PrintError>;
