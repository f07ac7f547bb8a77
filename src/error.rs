//! Error types shared by the registry adapters and the resolve operation.

/// Failure reported by a [`RegistryAdapter`](crate::registry::RegistryAdapter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The backing source could not be reached or read.
    #[error("registry unavailable ({backend}): {reason}")]
    Unavailable { backend: String, reason: String },

    /// The registry reported that a locality has no streets. Callers treat
    /// this as an empty street list.
    #[error("no streets found for locality {locality}")]
    NoStreetsFound { locality: String },
}

impl RegistryError {
    pub fn unavailable(backend: &str, reason: impl ToString) -> Self {
        RegistryError::Unavailable {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of the `resolve` operation as a whole.
///
/// "Not found" at a resolution stage is never an error; it is recorded on the
/// result instead.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid postal code '{0}', expected DD-DDD")]
    InvalidPostalCode(String),

    #[error("no localities found for postal code {0}")]
    PostalCodeNotFound(String),

    #[error("locality '{locality}' not found for postal code {postal_code}; available: {}", available.join(", "))]
    LocalityNotInPostalCode {
        postal_code: String,
        locality: String,
        available: Vec<String>,
    },

    #[error("postal code {postal_code} covers several localities; pick one of: {}", available.join(", "))]
    AmbiguousLocality {
        postal_code: String,
        available: Vec<String>,
    },

    #[error("reference row for '{locality}' ({postal_code}) is missing: {}", missing.join(", "))]
    IncompleteRecord {
        postal_code: String,
        locality: String,
        missing: Vec<&'static str>,
    },

    #[error(transparent)]
    RegistryUnavailable(#[from] RegistryError),
}
