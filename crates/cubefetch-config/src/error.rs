//! Errors raised while locating, reading and checking config files.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What the loader was doing with a file when the I/O error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::CreateDir => "create directory",
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot {op} '{path}': {source}")]
    Io {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed TOML in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot render config as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// No home directory, so there is nowhere to put `~/.cubefetch`
    #[error("no home directory for the global .cubefetch config")]
    NoHomeDir,

    /// A setting holds a value the fetch layer cannot use
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// `key` is the dotted TOML path, e.g. `batch.batch_size`.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// The dotted key of an [`InvalidValue`](Self::InvalidValue) error.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_key() {
        let err = ConfigError::invalid_value("batch.batch_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'batch.batch_size': must be at least 1"
        );
        assert_eq!(err.key(), Some("batch.batch_size"));
        assert_eq!(ConfigError::NoHomeDir.key(), None);
    }

    #[test]
    fn test_io_error_names_operation_and_path() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::io(FileOp::CreateDir, "/etc/cubefetch", denied);
        assert_eq!(
            err.to_string(),
            "cannot create directory '/etc/cubefetch': denied"
        );
    }
}
