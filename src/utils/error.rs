use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiError {
    #[error("Module '{module}' dependency '{dependency}' not found")]
    MissingModuleDependency { module: String, dependency: String },

    #[error("Object '{name}' not found")]
    MissingObject { name: String },

    #[error("Cannot find object '{name}' in the module '{module}'")]
    MissingInModule { module: String, name: String },

    #[error("Wrong module separator use in '{name}'")]
    MalformedName { name: String },

    #[error("Circular dependency error! Object name: {name}, parents: {}", chain.join("|"))]
    CircularDependency { name: String, chain: Vec<String> },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Configuration parsing error: {message}")]
    ConfigParse { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Configuration,
}

impl DiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DiError::MissingModuleDependency { .. }
            | DiError::MissingObject { .. }
            | DiError::MissingInModule { .. }
            | DiError::MalformedName { .. }
            | DiError::CircularDependency { .. } => ErrorCategory::Resolution,
            DiError::Io { .. } | DiError::ConfigParse { .. } | DiError::InvalidConfigValue { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DiError::MissingModuleDependency { .. } => {
                "Register the missing module before bootstrapping or remove it from the dependency list"
            }
            DiError::MissingObject { .. } | DiError::MissingInModule { .. } => {
                "Check the injected name for typos and make sure the owning module is registered"
            }
            DiError::MalformedName { .. } => "Use exactly one 'module::object' separator",
            DiError::CircularDependency { .. } => {
                "Break the cycle, e.g. by resolving one side lazily through $di"
            }
            DiError::Io { .. } => "Make sure the configuration file exists and is readable",
            DiError::ConfigParse { .. } | DiError::InvalidConfigValue { .. } => {
                "Fix the configuration file and try again"
            }
        }
    }
}

impl From<std::io::Error> for DiError {
    fn from(err: std::io::Error) -> Self {
        DiError::Io {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_message_lists_chain() {
        let err = DiError::CircularDependency {
            name: "a".to_string(),
            chain: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency error! Object name: a, parents: a|b"
        );
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_io_errors_are_configuration() {
        let err: DiError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
