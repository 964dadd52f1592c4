use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use common::{
    error::{AppError, Res},
    identity::Claims,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenValidationRequest {
    pub token: String,
}

/// Profile held by the identity provider for a known uid.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Client for the external identity provider. All identity data consumed
/// by this service (uid, email, display name) comes through here.
pub struct IdentityClient {
    client: Client,
    identity_service_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(identity_service_url: String, api_key: String) -> Self {
        IdentityClient {
            client: Client::new(),
            identity_service_url,
            api_key,
        }
    }

    /// Validates a bearer token and returns the caller's claims.
    pub async fn validate_token(&self, token: &str) -> Res<Claims> {
        let request_body = TokenValidationRequest {
            token: token.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/validate/validate-token",
                self.identity_service_url
            ))
            .json(&request_body)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let error_response = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or(serde_json::json!({"message": "Failed to validate token"}));
            let message = error_response["message"]
                .as_str()
                .unwrap_or("Failed to validate token")
                .to_string();
            warn!("Token validation failed: {}", message);
            return Err(AppError::Unauthenticated(message));
        }

        let claims = response.json::<Claims>().await?;
        info!("Token validated successfully for uid: {}", claims.uid);
        Ok(claims)
    }

    /// Looks up a user by uid. Returns `None` for an unknown uid so callers
    /// can decide between NotFound and other outcomes.
    pub async fn get_user(&self, uid: &str) -> Res<Option<IdentityUser>> {
        let response = self
            .client
            .get(format!("{}/users/{}", self.identity_service_url, uid))
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<IdentityUser>().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                warn!("Identity lookup for {} returned {}", uid, status);
                Err(AppError::Gateway(format!(
                    "identity service returned {}",
                    status
                )))
            }
        }
    }
}
