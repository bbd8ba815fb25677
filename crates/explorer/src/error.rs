/// Failures reported by a [`crate::backend::MapBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The mapping library is not loaded yet (or failed to load).
    Unavailable(String),
    MarkerRejected { country_id: String, reason: String },
    UnknownMarker,
    Disposed,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unavailable(msg) => write!(f, "mapping library unavailable: {msg}"),
            BackendError::MarkerRejected { country_id, reason } => {
                write!(f, "marker for {country_id} rejected: {reason}")
            }
            BackendError::UnknownMarker => write!(f, "marker handle does not exist"),
            BackendError::Disposed => write!(f, "map instance was disposed"),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config read error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
