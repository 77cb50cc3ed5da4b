use crate::{
    dtos::{
        common::{PaginationMeta, double_option, patch},
        module::ModuleResponse,
    },
    error::{ApiError, ValidationErrors},
};
use chrono::{DateTime, Utc};
use database::{
    entities::{course_users, courses},
    services::course::{CreateCourse, UpdateCourse},
};
use models::status::CourseStatus;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub teacher_id: Option<Uuid>,
    /// Derived from status and published_at at response time, never stored.
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseResponse {
    pub fn from_model(course: courses::Model, now: DateTime<Utc>) -> Self {
        let is_published = course.is_published(now);
        Self {
            id: course.id,
            slug: course.slug,
            title: course.title,
            description: course.description,
            status: course.status.to_value(),
            published_at: course.published_at,
            starts_at: course.starts_at,
            ends_at: course.ends_at,
            metadata: course.metadata,
            teacher_id: course.teacher_id,
            is_published,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Detail view: the course plus its modules and enrollment. `students` is
/// only present for callers allowed to manage the course's content.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub modules: Vec<ModuleResponse>,
    pub enrolled_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<EnrollmentResponse>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub user_id: Uuid,
    #[schema(value_type = String)]
    pub role: String,
    #[schema(value_type = String)]
    pub status: String,
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl EnrollmentResponse {
    pub fn from_model(pivot: course_users::Model) -> Self {
        Self {
            user_id: pivot.user_id,
            role: pivot.role.to_value(),
            status: pivot.status.to_value(),
            enrolled_at: pivot.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedCoursesResponse {
    pub courses: Vec<CourseResponse>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub status: Option<CourseStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub teacher_id: Option<Uuid>,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        validate_slug(&mut errors, &self.slug);
        if self.title.trim().is_empty() {
            errors.add("title", "must not be empty");
        }
        errors.finish()
    }

    pub fn into_input(self) -> CreateCourse {
        CreateCourse {
            slug: self.slug,
            title: self.title,
            description: self.description,
            status: self.status.unwrap_or_default(),
            published_at: self.published_at,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            metadata: self.metadata,
            teacher_id: self.teacher_id,
        }
    }
}

/// Partial update. Nullable columns use the omitted / null / value tri-state;
/// `cover_media_id: null` detaches the cover, an id promotes that temporary
/// upload in its place.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub status: Option<CourseStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub published_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub metadata: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub teacher_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub cover_media_id: Option<Option<Uuid>>,
}

impl UpdateCourseRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::default();
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            errors.add("title", "must not be empty");
        }
        errors.finish()
    }

    pub fn into_input(self) -> UpdateCourse {
        UpdateCourse {
            title: self.title,
            description: patch(self.description),
            status: self.status,
            published_at: patch(self.published_at),
            starts_at: patch(self.starts_at),
            ends_at: patch(self.ends_at),
            metadata: self.metadata,
            teacher_id: patch(self.teacher_id),
            cover: patch(self.cover_media_id),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollStudentsRequest {
    pub student_ids: Vec<Uuid>,
}

pub fn validate_slug(errors: &mut ValidationErrors, slug: &str) {
    if slug.trim().is_empty() {
        errors.add("slug", "must not be empty");
    } else if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        errors.add(
            "slug",
            "may only contain lowercase letters, digits, hyphens and underscores",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::services::FieldPatch;

    #[test]
    fn cover_patch_keeps_clears_and_sets() {
        let omitted: UpdateCourseRequest = serde_json::from_str("{}").unwrap();
        assert!(omitted.into_input().cover.is_keep());

        let cleared: UpdateCourseRequest =
            serde_json::from_str(r#"{"cover_media_id":null}"#).unwrap();
        assert_eq!(cleared.into_input().cover, FieldPatch::Clear);

        let id = Uuid::new_v4();
        let set: UpdateCourseRequest =
            serde_json::from_str(&format!(r#"{{"cover_media_id":"{id}"}}"#)).unwrap();
        assert_eq!(set.into_input().cover, FieldPatch::Set(id));
    }

    #[test]
    fn slugs_are_checked_for_shape() {
        let mut errors = ValidationErrors::default();
        validate_slug(&mut errors, "intro-to-rust_2025");
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::default();
        validate_slug(&mut errors, "Intro To Rust");
        assert!(!errors.is_empty());
    }
}
