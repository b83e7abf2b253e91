use std::path::PathBuf;

/// Fatal configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The limits override file could not be read.
    #[error("failed to read limits override file {}: {source}", path.display())]
    LimitsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The limits override document is not valid.
    #[error("malformed limits override from {origin}: {source}")]
    LimitsJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}
