//! Time-series data sources.
//!
//! The resolver only sees the `ObservationSource` trait:
//! - `FredClient` queries the FRED `series/observations` endpoint
//! - `StaticSource` serves literal values from configuration (and tests)

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Observation;

pub mod fred;
pub mod static_source;

pub use fred::FredClient;
pub use static_source::StaticSource;

/// Failure to obtain observations for one query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Transport failure, timeout, non-success status or undecodable body.
    #[error("source unavailable for {key}: {reason}")]
    Unavailable { key: String, reason: String },
    /// The source answered but the payload was unusable.
    #[error("invalid response for {key}: {reason}")]
    InvalidResponse { key: String, reason: String },
}

impl SourceError {
    pub fn unavailable(key: &str, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        SourceError::InvalidResponse {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// A provider of `(key, date range) -> observations`.
///
/// Returned observations must lie in `[start, end]`; order is not required.
pub trait ObservationSource: Send + Sync {
    fn observations(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, SourceError>;

    /// Short label for headers and logs.
    fn name(&self) -> &str;
}

impl<T: ObservationSource + ?Sized> ObservationSource for &T {
    fn observations(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, SourceError> {
        (**self).observations(key, start, end)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: ObservationSource + ?Sized> ObservationSource for Box<T> {
    fn observations(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, SourceError> {
        (**self).observations(key, start, end)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
