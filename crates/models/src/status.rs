use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a course. Draft -> Active -> Archived is the intended
/// path, but no transition guard is enforced: an authorized update may set any
/// value at any time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// Status of a course-user pivot row.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Role a user holds on one specific course, carried on the pivot row.
/// Distinct from the global role system in [`crate::roles`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CourseRole {
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[default]
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "assistant")]
    Assistant,
}

/// How a lesson's `content` column is to be interpreted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum LessonContentType {
    #[default]
    #[sea_orm(string_value = "markdown")]
    Markdown,
    #[sea_orm(string_value = "video_embed")]
    VideoEmbed,
    #[sea_orm(string_value = "document_bundle")]
    DocumentBundle,
}
