use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Everything that can abort a provisioning or ETL run.
///
/// None of these are retried: the first error ends the current phase and is
/// reported by the binary before it exits non-zero.
#[derive(Debug)]
pub enum EtlError {
    /// Settings file missing, unreadable or incomplete.
    Config(String),
    /// Establishing the warehouse connection failed.
    Connection(String),
    /// A DDL/DML statement was rejected by the warehouse.
    Statement { label: String, message: String },
    /// Loading a staging table failed (COPY or client-side insert).
    Load { table: String, message: String },
    /// A local source file could not be read or decoded.
    Source { path: String, message: String },
}

impl Display for EtlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EtlError::Config(msg) => write!(f, "config error: {}", msg),
            EtlError::Connection(msg) => write!(f, "warehouse connection failed: {}", msg),
            EtlError::Statement { label, message } => write!(f, "statement `{}` failed: {}", label, message),
            EtlError::Load { table, message } => write!(f, "loading {} failed: {}", table, message),
            EtlError::Source { path, message } => write!(f, "source {}: {}", path, message),
        }
    }
}

impl Error for EtlError {}

impl From<diesel::ConnectionError> for EtlError {
    fn from(value: diesel::ConnectionError) -> Self {
        EtlError::Connection(value.to_string())
    }
}
