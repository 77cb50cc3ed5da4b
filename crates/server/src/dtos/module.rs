use crate::{
    dtos::{
        common::{double_option, patch},
        course::validate_slug,
    },
    error::{ApiError, ValidationErrors},
};
use chrono::{DateTime, Utc};
use database::{
    entities::modules,
    services::module::{CreateModule, UpdateModule},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub position: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub unpublish_at: Option<DateTime<Utc>>,
    /// Derived from the publish window at response time.
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleResponse {
    pub fn from_model(module: modules::Model, now: DateTime<Utc>) -> Self {
        let is_published = module.is_published(now);
        Self {
            id: module.id,
            course_id: module.course_id,
            title: module.title,
            slug: module.slug,
            description: module.description,
            position: module.position,
            published_at: module.published_at,
            unpublish_at: module.unpublish_at,
            is_published,
            created_at: module.created_at,
            updated_at: module.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateModuleRequest {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// When omitted the module is appended after the course's last one.
    pub position: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub unpublish_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateModuleRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        validate_slug(&mut errors, &self.slug);
        if self.title.trim().is_empty() {
            errors.add("title", "must not be empty");
        }
        if let (Some(from), Some(until)) = (self.published_at, self.unpublish_at)
            && until <= from
        {
            errors.add("unpublish_at", "must be after published_at");
        }
        errors.finish()
    }

    pub fn into_input(self) -> CreateModule {
        CreateModule {
            title: self.title,
            slug: self.slug,
            description: self.description,
            position: self.position,
            published_at: self.published_at,
            unpublish_at: self.unpublish_at,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateModuleRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub published_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub unpublish_at: Option<Option<DateTime<Utc>>>,
    pub metadata: Option<serde_json::Value>,
}

impl UpdateModuleRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            errors.add("title", "must not be empty");
        }
        if let Some(slug) = &self.slug {
            validate_slug(&mut errors, slug);
        }
        errors.finish()
    }

    pub fn into_input(self) -> UpdateModule {
        UpdateModule {
            title: self.title,
            slug: self.slug,
            description: patch(self.description),
            position: self.position,
            published_at: patch(self.published_at),
            unpublish_at: patch(self.unpublish_at),
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_publish_window_is_rejected() {
        let request: CreateModuleRequest = serde_json::from_str(
            r#"{
                "title": "Week 1",
                "slug": "week-1",
                "published_at": "2025-06-02T00:00:00Z",
                "unpublish_at": "2025-06-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
