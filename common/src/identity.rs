use serde::{Deserialize, Serialize};

/// Validated identity of the caller, produced by the auth middleware
/// after the external identity provider accepted the bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}
