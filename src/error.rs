use thiserror::Error;

/// Error taxonomy for the sampling driver and the NRPT engine.
///
/// Non-fatal conditions (single-worker parallel run, `nchains>N`) are not
/// represented here; they are logged via `log::warn!` instead.
#[derive(Debug, Error)]
pub enum McmcError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("sampler failure: {0}")]
    SamplerFailure(#[from] anyhow::Error),

    #[error("numeric failure: {message}")]
    NumericFailure { message: String },

    #[error("worker failure: {message}")]
    WorkerFailure { message: String },
}

impl McmcError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::NumericFailure {
            message: message.into(),
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::WorkerFailure {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, McmcError>;
