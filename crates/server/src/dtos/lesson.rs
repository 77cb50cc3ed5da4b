use crate::{
    dtos::{
        common::{double_option, patch},
        course::validate_slug,
    },
    error::{ApiError, ValidationErrors},
};
use chrono::{DateTime, Utc};
use database::{
    entities::lessons,
    services::lesson::{CreateLesson, UpdateLesson},
};
use models::status::LessonContentType;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: String,
    #[schema(value_type = String)]
    pub content_type: String,
    pub position: i32,
    pub duration_minutes: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LessonResponse {
    pub fn from_model(lesson: lessons::Model) -> Self {
        Self {
            id: lesson.id,
            module_id: lesson.module_id,
            title: lesson.title,
            slug: lesson.slug,
            summary: lesson.summary,
            content: lesson.content,
            content_type: lesson.content_type.to_value(),
            position: lesson.position,
            duration_minutes: lesson.duration_minutes,
            published_at: lesson.published_at,
            created_at: lesson.created_at,
            updated_at: lesson.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: String,
    #[schema(value_type = Option<String>)]
    pub content_type: Option<LessonContentType>,
    pub position: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateLessonRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        validate_slug(&mut errors, &self.slug);
        if self.title.trim().is_empty() {
            errors.add("title", "must not be empty");
        }
        if let Some(minutes) = self.duration_minutes
            && minutes <= 0
        {
            errors.add("duration_minutes", "must be positive");
        }
        errors.finish()
    }

    pub fn into_input(self) -> CreateLesson {
        CreateLesson {
            title: self.title,
            slug: self.slug,
            summary: self.summary,
            content: self.content,
            content_type: self.content_type.unwrap_or_default(),
            position: self.position,
            duration_minutes: self.duration_minutes,
            published_at: self.published_at,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub summary: Option<Option<String>>,
    pub content: Option<String>,
    #[schema(value_type = Option<String>)]
    pub content_type: Option<LessonContentType>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub duration_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub metadata: Option<serde_json::Value>,
}

impl UpdateLessonRequest {
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
        if let Some(Some(minutes)) = self.duration_minutes
            && minutes <= 0
        {
            errors.add("duration_minutes", "must be positive");
        }
        errors.finish()
    }

    pub fn into_input(self) -> UpdateLesson {
        UpdateLesson {
            title: self.title,
            slug: self.slug,
            summary: patch(self.summary),
            content: self.content,
            content_type: self.content_type,
            position: self.position,
            duration_minutes: patch(self.duration_minutes),
            published_at: patch(self.published_at),
            metadata: self.metadata,
        }
    }
}
