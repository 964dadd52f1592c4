use chrono::{DateTime, Utc};

/// One row per handled HTTP request. Write-only from the logger
/// middleware; bodies are deliberately not captured.
#[derive(Debug, Clone)]
pub struct RequestLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: i32,
    pub user_id: Option<String>,
    pub params: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
}
