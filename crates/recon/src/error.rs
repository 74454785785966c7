use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty name, zero result limit, etc.).
    ConfigValidation(String),
    /// Special-case registry source is not valid JSON or has the wrong shape.
    RegistryParse(String),
    /// Malformed row in a file listing.
    ListingParse { line: usize, message: String },
    /// Modification timestamp that matches none of the accepted formats.
    DateParse { file: String, value: String },
    /// Snapshot JSON could not be read into entity inputs.
    SnapshotParse(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::RegistryParse(msg) => write!(f, "special-case registry error: {msg}"),
            Self::ListingParse { line, message } => {
                write!(f, "listing line {line}: {message}")
            }
            Self::DateParse { file, value } => {
                write!(f, "file '{file}': cannot parse modification time '{value}'")
            }
            Self::SnapshotParse(msg) => write!(f, "snapshot parse error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
