use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, etc.).
    ConfigValidation(String),
    /// A configured role names a column the dataset does not have.
    MissingColumn { role: String, column: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { role, column } => {
                write!(f, "{role} column '{column}' not found in data")
            }
        }
    }
}

impl std::error::Error for ScanError {}
