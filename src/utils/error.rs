use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoftLayerError {
    #[error("SoftLayerAPIError({code}): {message}")]
    ApiError { code: String, message: String },

    #[error("TransportError({status}): {message}")]
    TransportError { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("XML-RPC encoding error: {message}")]
    XmlError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    OperationError { message: String },

    #[error("{message}")]
    ArgumentError { message: String },

    #[error("{message}")]
    CliAbort { message: String },
}

/// XML-RPC 標準錯誤碼分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    NotWellFormed,
    UnsupportedEncoding,
    InvalidCharacter,
    SpecViolation,
    MethodNotFound,
    InvalidMethodParameters,
    InternalError,
    ApplicationError,
    RemoteSystemError,
    TransportError,
    Remote,
}

impl FaultKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "-32700" => FaultKind::NotWellFormed,
            "-32701" => FaultKind::UnsupportedEncoding,
            "-32702" => FaultKind::InvalidCharacter,
            "-32600" => FaultKind::SpecViolation,
            "-32601" => FaultKind::MethodNotFound,
            "-32602" => FaultKind::InvalidMethodParameters,
            "-32603" => FaultKind::InternalError,
            "-32500" => FaultKind::ApplicationError,
            "-32400" => FaultKind::RemoteSystemError,
            "-32300" => FaultKind::TransportError,
            _ => FaultKind::Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Api,
    Network,
    Configuration,
    Input,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SoftLayerError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        SoftLayerError::ApiError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        SoftLayerError::TransportError {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SoftLayerError::NotFound {
            message: message.into(),
        }
    }

    /// 資源狀態不允許此操作（例如仍有進行中的交易）
    pub fn operation(message: impl Into<String>) -> Self {
        SoftLayerError::OperationError {
            message: message.into(),
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        SoftLayerError::ArgumentError {
            message: message.into(),
        }
    }

    pub fn abort(message: impl Into<String>) -> Self {
        SoftLayerError::CliAbort {
            message: message.into(),
        }
    }

    /// 遠端回傳的 faultCode（僅 API 錯誤有值）
    pub fn fault_code(&self) -> Option<&str> {
        match self {
            SoftLayerError::ApiError { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        self.fault_code().map(FaultKind::from_code)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SoftLayerError::ApiError { .. } | SoftLayerError::OperationError { .. } => {
                ErrorCategory::Api
            }
            SoftLayerError::TransportError { .. } | SoftLayerError::HttpError(_) => {
                ErrorCategory::Network
            }
            SoftLayerError::ConfigError { .. }
            | SoftLayerError::InvalidConfigValueError { .. }
            | SoftLayerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SoftLayerError::NotFound { .. }
            | SoftLayerError::ArgumentError { .. }
            | SoftLayerError::CliAbort { .. } => ErrorCategory::Input,
            SoftLayerError::XmlError { .. }
            | SoftLayerError::IoError(_)
            | SoftLayerError::SerializationError(_)
            | SoftLayerError::CsvError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Api | ErrorCategory::Network => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// CLI 退出碼：使用者中止或參數錯誤為 2，其餘為 1
    pub fn exit_code(&self) -> i32 {
        match self {
            SoftLayerError::CliAbort { .. } | SoftLayerError::ArgumentError { .. } => 2,
            _ => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SoftLayerError::ApiError { message, .. }
                if message.to_lowercase().contains("invalid api token") =>
            {
                "Authentication Failed: To update your credentials, use 'slcli config setup'"
                    .to_string()
            }
            SoftLayerError::CliAbort { message }
            | SoftLayerError::ArgumentError { message }
            | SoftLayerError::OperationError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Api => "Check the service, method and parameters of the call",
            ErrorCategory::Network => "Check the endpoint URL, proxy settings and connectivity",
            ErrorCategory::Configuration => "Run 'slcli config setup' or check ~/.softlayer",
            ErrorCategory::Input => "Check the command arguments (see --help)",
            ErrorCategory::Internal => "Re-run with -vvv and report the output",
        }
    }
}

pub type Result<T> = std::result::Result<T, SoftLayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_mapping() {
        let err = SoftLayerError::api("-32601", "Method not found");
        assert_eq!(err.fault_kind(), Some(FaultKind::MethodNotFound));

        let err = SoftLayerError::api("SoftLayer_Exception_ObjectNotFound", "Unable to find object");
        assert_eq!(err.fault_kind(), Some(FaultKind::Remote));
        assert_eq!(err.to_string(), "SoftLayerAPIError(SoftLayer_Exception_ObjectNotFound): Unable to find object");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SoftLayerError::abort("Aborted.").exit_code(), 2);
        assert_eq!(SoftLayerError::argument("bad").exit_code(), 2);
        assert_eq!(SoftLayerError::api("500", "boom").exit_code(), 1);
        assert_eq!(SoftLayerError::transport(0, "refused").exit_code(), 1);

        let err = SoftLayerError::operation("A reclaim request has already been made.");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.category(), ErrorCategory::Api);
        assert_eq!(err.user_friendly_message(), "A reclaim request has already been made.");
    }

    #[test]
    fn test_invalid_token_message() {
        let err = SoftLayerError::api(
            "SoftLayer_Exception_InvalidLegacyToken",
            "Invalid API token.",
        );
        assert!(err.user_friendly_message().contains("slcli config setup"));
    }
}
