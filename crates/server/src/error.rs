use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::error::ServiceError;
use log::error;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation messages, serialized as
/// `{ "errors": { "field": ["message"] } }`.
#[derive(Debug, Default, Serialize)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finishes a validation pass: rejects the request before any mutation if
    /// anything was recorded.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation(ValidationErrors::single(field, message))
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        error!("database error: {err}");
        ApiError::Internal
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { .. } => ApiError::NotFound,
            ServiceError::Validation { field, message } => {
                ApiError::Validation(ValidationErrors::single(field, message))
            }
            ServiceError::Db(db_err) => {
                error!("database error: {db_err}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors.0 })),
            )
                .into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_accumulate_per_field() {
        let mut errors = ValidationErrors::default();
        errors.add("slug", "must not be empty");
        errors.add("slug", "must be url-safe");
        errors.add("title", "must not be empty");
        assert_eq!(errors.0["slug"].len(), 2);
        assert!(errors.finish().is_err());
    }

    #[test]
    fn empty_validation_passes() {
        assert!(ValidationErrors::default().finish().is_ok());
    }

    #[test]
    fn service_errors_map_onto_the_api_taxonomy() {
        assert!(matches!(
            ApiError::from(ServiceError::not_found("course")),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(ServiceError::validation("slug", "taken")),
            ApiError::Validation(_)
        ));
    }
}
