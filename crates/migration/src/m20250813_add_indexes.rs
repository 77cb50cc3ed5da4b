use crate::m20250812_create_all_tables::{CourseUsers, Lessons, Media, Modules, RoleAssignments};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Display-order lookups within one parent
        manager
            .create_index(
                Index::create()
                    .name("idx_modules_course_id_position")
                    .table(Modules::Table)
                    .col(Modules::CourseId)
                    .col(Modules::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lessons_module_id_position")
                    .table(Lessons::Table)
                    .col(Lessons::ModuleId)
                    .col(Lessons::Position)
                    .to_owned(),
            )
            .await?;

        // Pivot lookups from either side
        manager
            .create_index(
                Index::create()
                    .name("idx_course_users_course_id")
                    .table(CourseUsers::Table)
                    .col(CourseUsers::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_course_users_user_id")
                    .table(CourseUsers::Table)
                    .col(CourseUsers::UserId)
                    .to_owned(),
            )
            .await?;

        // One live pivot row per (course, user); historical soft-deleted rows
        // fall outside the filtered index. sea-query cannot express a partial
        // index, so raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_course_users_course_id_user_id_live
                ON course_users (course_id, user_id)
                WHERE deleted_at IS NULL;",
            )
            .await?;

        // A role can be granted to a user at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_role_assignments_user_id_role")
                    .table(RoleAssignments::Table)
                    .col(RoleAssignments::UserId)
                    .col(RoleAssignments::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Collection lookups per owner
        manager
            .create_index(
                Index::create()
                    .name("idx_media_owner_collection")
                    .table(Media::Table)
                    .col(Media::OwnerType)
                    .col(Media::OwnerId)
                    .col(Media::Collection)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_media_owner_collection")
                    .table(Media::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_role_assignments_user_id_role")
                    .table(RoleAssignments::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX idx_course_users_course_id_user_id_live;")
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_course_users_user_id")
                    .table(CourseUsers::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_course_users_course_id")
                    .table(CourseUsers::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_lessons_module_id_position")
                    .table(Lessons::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_modules_course_id_position")
                    .table(Modules::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
