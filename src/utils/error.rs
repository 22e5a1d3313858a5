use thiserror::Error;

#[derive(Error, Debug)]
pub enum PapError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IED ausente ou inválido: '{value}'")]
    MissingStratum { value: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that stopped with this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl PapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PapError::ApiError(_) => ErrorCategory::Network,
            PapError::IoError(_) | PapError::ZipError(_) => ErrorCategory::Storage,
            PapError::ConfigError { .. }
            | PapError::MissingConfigError { .. }
            | PapError::InvalidConfigValueError { .. }
            | PapError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            PapError::CsvError(_)
            | PapError::SerializationError(_)
            | PapError::MissingStratum { .. }
            | PapError::ProcessingError { .. }
            | PapError::ValidationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PapError::ApiError(_) => ErrorSeverity::Medium,
            PapError::ValidationError { .. } | PapError::MissingStratum { .. } => {
                ErrorSeverity::High
            }
            PapError::CsvError(_)
            | PapError::SerializationError(_)
            | PapError::ProcessingError { .. } => ErrorSeverity::High,
            PapError::ConfigError { .. }
            | PapError::MissingConfigError { .. }
            | PapError::InvalidConfigValueError { .. }
            | PapError::ConfigValidationError { .. } => ErrorSeverity::High,
            PapError::IoError(_) | PapError::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PapError::ApiError(_) => {
                "Verifique a conexão e se o código IBGE e a competência estão corretos, depois consulte novamente"
            }
            PapError::IoError(_) | PapError::ZipError(_) => {
                "Verifique as permissões do diretório de saída e o espaço em disco"
            }
            PapError::SerializationError(_) => {
                "Apague o data.json em cache e consulte a API novamente"
            }
            PapError::CsvError(_) => "Verifique o diretório de saída e tente exportar novamente",
            PapError::MissingStratum { .. } => {
                "Confira o código IBGE e a competência; o relatório consultado não trouxe o IED do município"
            }
            PapError::ConfigError { .. }
            | PapError::MissingConfigError { .. }
            | PapError::InvalidConfigValueError { .. }
            | PapError::ConfigValidationError { .. } => {
                "Revise os argumentos de linha de comando ou o arquivo de configuração"
            }
            PapError::ValidationError { .. } | PapError::ProcessingError { .. } => {
                "Revise as quantidades e valores informados"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PapError::ApiError(e) => format!("Erro na consulta à API: {}", e),
            PapError::MissingStratum { .. } => {
                "IED (dsFaixaIndiceEquidadeEsfEap) ausente ou inválido. Não é possível determinar o estrato."
                    .to_string()
            }
            PapError::ValidationError { message } => format!("Dados inválidos: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_categories() {
        let err = PapError::MissingStratum {
            value: "".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = PapError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().exit_code(), 3);
    }

    #[test]
    fn test_user_friendly_message_for_stratum() {
        let err = PapError::MissingStratum {
            value: "N/A".to_string(),
        };
        assert!(err.user_friendly_message().contains("IED"));
    }
}
