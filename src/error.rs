use thiserror::Error;

/// Top-level error type for the server binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Net(#[from] std::io::Error),
}

/// Vehicle configuration errors. All of these are raised once, when a
/// vehicle is built; the per-tick path never fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Vehicle has no wheels")]
    NoWheels,

    #[error("Vehicle has no driven wheels")]
    NoDrivenWheels,

    #[error("Wheel index {index} out of range for {field} ({count} wheels)")]
    WheelIndexOutOfRange {
        field: &'static str,
        index: usize,
        count: usize,
    },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_from_config_error() {
        let err = ConfigError::invalid("wheels[0].radius", "must be > 0");
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Config(_)));
        assert!(server_err.to_string().contains("wheels[0].radius"));
    }

    #[test]
    fn index_error_names_the_field() {
        let err = ConfigError::WheelIndexOutOfRange {
            field: "speed_source_wheel",
            index: 7,
            count: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("speed_source_wheel"));
        assert!(msg.contains('7'));
    }
}
