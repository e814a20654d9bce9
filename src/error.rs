use thiserror::Error;

/// Failures of the tolerance-based decimal arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalarError {
    #[error("division by a value indistinguishable from zero: {dividend} / {divisor}")]
    DivisionByZero { dividend: String, divisor: String },
    #[error("cannot represent non-finite value {0}")]
    NonFinite(String),
    #[error("square root of negative value {0}")]
    NegativeSqrt(String),
}

/// Failures of the single-step rendezvous.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("step gate was interrupted while holding")]
    Interrupted,
    #[error("another thread is already holding on the step gate")]
    Busy,
}

/// Everything that can go wrong while building a diagram.
#[derive(Error, Debug)]
pub enum DiagramError {
    #[error(transparent)]
    Numeric(#[from] ScalarError),
    #[error("degenerate geometry during '{operation}': {info}")]
    Degenerate { operation: &'static str, info: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("insertion interrupted while waiting for the next step")]
    Interrupted,
    #[error(transparent)]
    Gate(GateError),
}

impl From<GateError> for DiagramError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Interrupted => DiagramError::Interrupted,
            other => DiagramError::Gate(other),
        }
    }
}

impl DiagramError {
    pub(crate) fn degenerate(operation: &'static str, info: impl Into<String>) -> Self {
        DiagramError::Degenerate {
            operation,
            info: info.into(),
        }
    }
}

pub type DiagramResult<T> = Result<T, DiagramError>;
