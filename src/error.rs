//! Error types and handling for ThumbMill

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ThumbMill operations
pub type Result<T> = std::result::Result<T, ThumbError>;

/// Main error type for ThumbMill operations
#[derive(Debug, Error)]
pub enum ThumbError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Run configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Source image could not be decoded
    #[error("Decode error: {message} (file: {file:?})")]
    Decode { message: String, file: PathBuf },

    /// Thumbnail could not be encoded or written
    #[error("Encode error: {message} (file: {file:?})")]
    Encode { message: String, file: PathBuf },

    /// File format not supported
    #[error("Unsupported image format: {format} (file: {file:?})")]
    Unsupported {
        format: String,
        file: Option<PathBuf>,
    },

    /// Source file too large to process
    #[error("File too large: {size} bytes (limit: {limit} bytes, file: {file:?})")]
    FileTooLarge { size: u64, limit: u64, file: PathBuf },

    /// Item skipped because the batch was cancelled before dispatch
    #[error("Cancelled before dispatch (file: {file:?})")]
    Cancelled { file: PathBuf },

    /// Worker pool / scheduler failures
    #[error("Resource error: {message}")]
    Resource { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl ThumbError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S, file: PathBuf) -> Self {
        Self::Decode {
            message: message.into(),
            file,
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(message: S, file: PathBuf) -> Self {
        Self::Encode {
            message: message.into(),
            file,
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::Unsupported {
            format: format.into(),
            file,
        }
    }

    /// Create a new file too large error
    pub fn file_too_large(size: u64, limit: u64, file: PathBuf) -> Self {
        Self::FileTooLarge { size, limit, file }
    }

    /// Create a new cancellation error
    pub fn cancelled(file: PathBuf) -> Self {
        Self::Cancelled { file }
    }

    /// Create a new resource error
    pub fn resource<S: Into<String>>(message: S) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // These errors affect individual items but the batch continues
            Self::Io(_)
            | Self::Decode { .. }
            | Self::Encode { .. }
            | Self::Unsupported { .. }
            | Self::FileTooLarge { .. }
            | Self::Cancelled { .. } => true,

            // These errors stop the run
            Self::Config { .. } | Self::Resource { .. } | Self::Serde(_) => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Decode { file, .. }
            | Self::Encode { file, .. }
            | Self::FileTooLarge { file, .. }
            | Self::Cancelled { file } => Some(file),

            Self::Unsupported { file, .. } => file.as_ref(),

            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Io(e) => format!("File system error: {}", e),
            Self::Decode { message, .. } => format!("Could not decode image: {}", message),
            Self::Encode { message, .. } => format!("Could not write thumbnail: {}", message),
            Self::Unsupported { format, .. } => {
                format!(
                    "Unsupported image format: {}. Supported formats: JPEG, PNG, WebP, TIFF, BMP",
                    format
                )
            }
            Self::FileTooLarge { size, limit, .. } => {
                format!(
                    "File is too large ({:.2} MB). Maximum supported: {:.2} MB",
                    *size as f64 / 1024.0 / 1024.0,
                    *limit as f64 / 1024.0 / 1024.0
                )
            }
            Self::Cancelled { .. } => "Skipped: the batch was cancelled".to_string(),
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for ThumbError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serde(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ThumbError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ThumbError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();

            // Add file context if not already present
            if let ThumbError::Unsupported { file: slot, .. } = &mut error {
                if slot.is_none() {
                    *slot = Some(file);
                }
            }

            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = ThumbError::config("test message");
        assert!(matches!(err, ThumbError::Config { .. }));

        let err = ThumbError::decode("truncated JPEG", Path::new("a.jpg").to_path_buf());
        assert_eq!(err.file_path().unwrap(), Path::new("a.jpg"));
    }

    #[test]
    fn test_recoverable_errors() {
        let per_item = ThumbError::decode("bad", Path::new("x.png").to_path_buf());
        assert!(per_item.is_recoverable());

        assert!(!ThumbError::config("bad width").is_recoverable());
        assert!(!ThumbError::resource("pool down").is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        let err = ThumbError::unsupported("heic", None);
        let msg = err.user_message();
        assert!(msg.contains("Unsupported image format"));
        assert!(msg.contains("JPEG, PNG, WebP"));
    }

    #[test]
    fn test_file_context() {
        let result: Result<()> = Err(ThumbError::unsupported("raw", None));
        let with_context = result.with_file_context(Path::new("shot.raw").to_path_buf());

        let err = with_context.unwrap_err();
        assert_eq!(err.file_path().unwrap(), Path::new("shot.raw"));
    }
}
