use crate::{
    dtos::{common::PaginationMeta, media::MediaResponse},
    error::{ApiError, ValidationErrors},
};
use chrono::{DateTime, Utc};
use database::{
    entities::users,
    services::user::{CreateUser, UpdateUser},
};
use models::roles::GlobalRole;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

const PASSWORD_MIN_LENGTH: usize = 8;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    #[schema(value_type = Vec<String>)]
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_model(user: users::Model, roles: Vec<GlobalRole>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            email_verified: user.email_verified_at.is_some(),
            roles: roles.into_iter().map(|role| role.to_value()).collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PaginationMeta,
}

/// The caller's own account, with the avatar attached.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub avatar: Option<MediaResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[schema(value_type = Option<Vec<String>>)]
    pub roles: Option<Vec<GlobalRole>>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        if self.name.trim().is_empty() {
            errors.add("name", "must not be empty");
        }
        validate_email(&mut errors, &self.email);
        validate_password(&mut errors, &self.password);
        errors.finish()
    }

    pub fn into_input(self) -> CreateUser {
        CreateUser {
            name: self.name,
            email: self.email,
            password: self.password,
            roles: self.roles.unwrap_or_default(),
        }
    }
}

/// Partial update; `roles`, when present, replaces the user's role set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub roles: Option<Vec<GlobalRole>>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.add("name", "must not be empty");
        }
        if let Some(email) = &self.email {
            validate_email(&mut errors, email);
        }
        if let Some(password) = &self.password {
            validate_password(&mut errors, password);
        }
        errors.finish()
    }

    pub fn into_input(self) -> UpdateUser {
        UpdateUser {
            name: self.name,
            email: self.email,
            password: self.password,
            roles: self.roles,
        }
    }
}

/// Self-service profile patch. `avatar_media_id` promotes a previously
/// uploaded temporary item to the caller's avatar; `remove_avatar` detaches
/// the current one. The two are mutually exclusive.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_media_id: Option<Uuid>,
    #[serde(default)]
    pub remove_avatar: bool,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.add("name", "must not be empty");
        }
        if self.avatar_media_id.is_some() && self.remove_avatar {
            errors.add(
                "avatar_media_id",
                "cannot be combined with remove_avatar",
            );
        }
        errors.finish()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordResetResponse {
    /// Plaintext reset token, returned exactly once; only its hash is stored.
    pub token: String,
}

fn validate_email(errors: &mut ValidationErrors, email: &str) {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        errors.add("email", "must not be empty");
    } else if !trimmed.contains('@') || trimmed.starts_with('@') || trimmed.ends_with('@') {
        errors.add("email", "must be a valid email address");
    }
}

fn validate_password(errors: &mut ValidationErrors, password: &str) {
    if password.len() < PASSWORD_MIN_LENGTH {
        errors.add(
            "password",
            format!("must be at least {PASSWORD_MIN_LENGTH} characters"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_collects_every_field_error_at_once() {
        let request = CreateUserRequest {
            name: " ".to_string(),
            email: "not-an-address".to_string(),
            password: "short".to_string(),
            roles: None,
        };
        let err = request.validate().unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.0.len(), 3);
    }

    #[test]
    fn update_request_accepts_partial_bodies() {
        let request: UpdateUserRequest =
            serde_json::from_str(r#"{"name":"Sam"}"#).unwrap();
        assert!(request.validate().is_ok());
        let input = request.into_input();
        assert_eq!(input.name.as_deref(), Some("Sam"));
        assert!(input.email.is_none() && input.roles.is_none());
    }
}
