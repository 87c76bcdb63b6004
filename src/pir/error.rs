//! Error handling for the PIR protocol layer
//!
//! Every fallible protocol operation returns [`PirError`]. Errors are raised
//! before any reply is produced and are never retried internally.

use std::fmt;

/// PIR operation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PirError {
    /// No parameter configuration satisfies the capacity and noise constraints
    InvalidParameters(String),
    /// Query for an index outside `[0, num_items)`
    IndexOutOfRange { index: u64, num_items: u64 },
    /// Expansion requested for a client without usable Galois keys
    MissingGaloisKey { client_id: u64 },
    /// Byte stream inconsistent with the declared framing or parameters
    DeserializationError(String),
    /// Items do not fit the packed database under the current parameters
    CapacityExceeded(String),
    /// `answer` was called before a database was loaded
    DatabaseNotLoaded,
}

impl fmt::Display for PirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            Self::IndexOutOfRange { index, num_items } => {
                write!(f, "index {} out of range for {} items", index, num_items)
            }
            Self::MissingGaloisKey { client_id } => {
                write!(f, "no Galois keys registered for client {}", client_id)
            }
            Self::DeserializationError(msg) => write!(f, "deserialization failed: {}", msg),
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {}", msg),
            Self::DatabaseNotLoaded => write!(f, "no database loaded"),
        }
    }
}

impl std::error::Error for PirError {}

impl From<std::io::Error> for PirError {
    fn from(err: std::io::Error) -> Self {
        Self::DeserializationError(err.to_string())
    }
}

impl From<bincode::Error> for PirError {
    fn from(err: bincode::Error) -> Self {
        Self::DeserializationError(err.to_string())
    }
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a PirError variant with format string support
macro_rules! pir_err {
    ($kind:ident, $($arg:tt)*) => {
        $crate::pir::error::PirError::$kind(format!($($arg)*))
    };
}

pub(crate) use pir_err;
