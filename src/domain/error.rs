//! Domain error types.

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Top-level error type for cointrack.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NegativeHoldings(String),

    #[error("{0}")]
    HoldingsTooLarge(String),

    #[error("{entity} with this {field} already exists.")]
    AlreadyExists {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Unable to authenticate with provided credentials.")]
    InvalidCredentials,

    #[error("password hashing failed: {reason}")]
    PasswordHash { reason: String },

    #[error("import from {file} failed: {reason}")]
    Import { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortfolioError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::DatabaseQuery {
            reason: err.to_string(),
        }
    }

    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database {
            reason: err.to_string(),
        }
    }
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<FieldError> for PortfolioError {
    fn from(err: FieldError) -> Self {
        Self::Validation(vec![err])
    }
}

impl From<&PortfolioError> for std::process::ExitCode {
    fn from(err: &PortfolioError) -> Self {
        let code: u8 = match err {
            PortfolioError::Io(_) | PortfolioError::PasswordHash { .. } => 1,
            PortfolioError::ConfigParse { .. }
            | PortfolioError::ConfigMissing { .. }
            | PortfolioError::ConfigInvalid { .. } => 2,
            PortfolioError::Database { .. } | PortfolioError::DatabaseQuery { .. } => 3,
            PortfolioError::Validation(_)
            | PortfolioError::NegativeHoldings(_)
            | PortfolioError::HoldingsTooLarge(_)
            | PortfolioError::AlreadyExists { .. }
            | PortfolioError::Import { .. } => 4,
            PortfolioError::NotFound { .. } | PortfolioError::InvalidCredentials => 5,
        };
        std::process::ExitCode::from(code)
    }
}
