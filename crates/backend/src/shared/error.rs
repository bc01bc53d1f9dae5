use thiserror::Error;

/// Ошибки выгрузки остатков и цен
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Ошибка обращения к API маркетплейса
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode API response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout(e.to_string())
        } else if e.is_connect() {
            UpstreamError::Connection(e.to_string())
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            UpstreamError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            UpstreamError::Other(e.to_string())
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Upstream(e.into())
    }
}

impl SyncError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Upstream(UpstreamError::Timeout(_)))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, SyncError::Upstream(UpstreamError::Connection(_)))
    }

    /// Сообщение для оператора: таймаут и обрыв соединения выделяются отдельно
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Upstream(UpstreamError::Timeout(_)) => {
                "Превышено время ожидания ответа маркетплейса".to_string()
            }
            SyncError::Upstream(UpstreamError::Connection(e)) => {
                format!("Ошибка соединения с маркетплейсом: {}", e)
            }
            other => format!("Ошибка выгрузки: {}", other),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
