use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::User;

/// Treats absent and empty strings alike.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub ok: bool,
    pub message: &'static str,
}

impl Acknowledgement {
    pub fn ok(message: &'static str) -> Self {
        Self { ok: true, message }
    }
}
