//! Error types for the console.

use chanda_core::ChandaError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Chanda(#[from] ChandaError),
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Logging setup failed: {0}")]
    Telemetry(String),
}

impl ConsoleError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}

macro_rules! impl_from_core {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for ConsoleError {
                fn from(err: $err) -> Self {
                    Self::Chanda(err.into())
                }
            }
        )*
    };
}

impl_from_core!(
    chanda_core::AuthError,
    chanda_core::ConfigError,
    chanda_core::MediaError,
    chanda_core::StorageError,
    chanda_core::ValidationError,
);
