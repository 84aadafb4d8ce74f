//! Identity service administration (`/auth/v1/admin`).

use crate::client::ApiClient;
use crate::error::{ServiceError, require};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

const PREFIX: &str = "/auth/v1/admin";

/// Largest page the admin API serves.
pub const MAX_PER_PAGE: u32 = 1000;

/// A user to create through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Mark the address confirmed so the user can sign in immediately.
    #[serde(default = "default_email_confirm")]
    pub email_confirm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Value>,
}

fn default_email_confirm() -> bool {
    true
}

/// Client for the identity service's admin user API.
#[derive(Debug, Clone)]
pub struct AuthAdminClient {
    api: ApiClient,
}

impl AuthAdminClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_users(&self, page: u32, per_page: u32) -> Result<Value, ServiceError> {
        if page == 0 {
            return Err(ServiceError::Validation("page starts at 1".to_string()));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(ServiceError::Validation(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        self.api
            .get(&format!("{}/users?page={}&per_page={}", PREFIX, page, per_page))
            .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Value, ServiceError> {
        let id = parse_user_id(user_id)?;
        self.api.get(&format!("{}/users/{}", PREFIX, id)).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<Value, ServiceError> {
        require(&user.email, "email")?;
        if !user.email.contains('@') {
            return Err(ServiceError::Validation(format!(
                "'{}' is not an email address",
                user.email
            )));
        }
        if let Some(metadata) = &user.user_metadata
            && !metadata.is_object()
        {
            return Err(ServiceError::Validation(
                "user_metadata must be an object".to_string(),
            ));
        }

        let mut body = json!({
            "email": user.email,
            "email_confirm": user.email_confirm,
        });
        if let Some(password) = &user.password {
            body["password"] = json!(password);
        }
        if let Some(metadata) = &user.user_metadata {
            body["user_metadata"] = metadata.clone();
        }

        let created = self.api.post(&format!("{}/users", PREFIX), &body).await?;
        info!(email = %user.email, "Created auth user");
        Ok(created)
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<Value, ServiceError> {
        let id = parse_user_id(user_id)?;
        let deleted = self.api.delete(&format!("{}/users/{}", PREFIX, id), None).await?;
        info!(user_id = %id, "Deleted auth user");
        Ok(deleted)
    }
}

fn parse_user_id(user_id: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(user_id.trim())
        .map_err(|_| ServiceError::Validation(format!("user_id '{}' is not a UUID", user_id)))
}
