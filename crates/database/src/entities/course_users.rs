use models::status::{CourseRole, EnrollmentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course membership pivot row. At most one live (non-deleted) row per
/// (course_id, user_id) pair; historical soft-deleted rows may coexist.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub role: CourseRole,
    pub status: EnrollmentStatus,
    pub enrolled_at: Option<DateTimeUtc>,
    pub invited_at: Option<DateTimeUtc>,
    pub invitation_id: Option<Uuid>,
    pub metadata: Json,
    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active && self.deleted_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
