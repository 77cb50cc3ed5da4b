use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::EmailVerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create role_assignments table
        manager
            .create_table(
                Table::create()
                    .table(RoleAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleAssignments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleAssignments::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(RoleAssignments::Role)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RoleAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-role_assignments-user_id")
                            .from(RoleAssignments::Table, RoleAssignments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create courses table
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Courses::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Courses::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Courses::Title).string().not_null())
                    .col(ColumnDef::new(Courses::Description).text())
                    .col(
                        ColumnDef::new(Courses::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Courses::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Courses::StartsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Courses::EndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Courses::Metadata).json_binary().not_null())
                    .col(ColumnDef::new(Courses::TeacherId).uuid())
                    .col(ColumnDef::new(Courses::CreatedById).uuid())
                    .col(ColumnDef::new(Courses::UpdatedById).uuid())
                    .col(ColumnDef::new(Courses::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Courses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Courses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-courses-teacher_id")
                            .from(Courses::Table, Courses::TeacherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create modules table
        manager
            .create_table(
                Table::create()
                    .table(Modules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Modules::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Modules::CourseId).uuid().not_null())
                    .col(ColumnDef::new(Modules::Title).string().not_null())
                    .col(ColumnDef::new(Modules::Slug).string().not_null())
                    .col(ColumnDef::new(Modules::Description).text())
                    .col(ColumnDef::new(Modules::Position).integer().not_null())
                    .col(ColumnDef::new(Modules::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Modules::UnpublishAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Modules::Metadata).json_binary().not_null())
                    .col(ColumnDef::new(Modules::CreatedById).uuid())
                    .col(ColumnDef::new(Modules::UpdatedById).uuid())
                    .col(ColumnDef::new(Modules::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Modules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Modules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-modules-course_id")
                            .from(Modules::Table, Modules::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create lessons table
        manager
            .create_table(
                Table::create()
                    .table(Lessons::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lessons::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Lessons::ModuleId).uuid().not_null())
                    .col(ColumnDef::new(Lessons::Title).string().not_null())
                    .col(ColumnDef::new(Lessons::Slug).string().not_null())
                    .col(ColumnDef::new(Lessons::Summary).text())
                    .col(ColumnDef::new(Lessons::Content).text().not_null())
                    .col(
                        ColumnDef::new(Lessons::ContentType)
                            .string_len(32)
                            .not_null()
                            .default("markdown"),
                    )
                    .col(ColumnDef::new(Lessons::Position).integer().not_null())
                    .col(ColumnDef::new(Lessons::DurationMinutes).integer())
                    .col(ColumnDef::new(Lessons::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Lessons::Metadata).json_binary().not_null())
                    .col(ColumnDef::new(Lessons::CreatedById).uuid())
                    .col(ColumnDef::new(Lessons::UpdatedById).uuid())
                    .col(ColumnDef::new(Lessons::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Lessons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lessons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-lessons-module_id")
                            .from(Lessons::Table, Lessons::ModuleId)
                            .to(Modules::Table, Modules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create course_users pivot table
        manager
            .create_table(
                Table::create()
                    .table(CourseUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseUsers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CourseUsers::CourseId).uuid().not_null())
                    .col(ColumnDef::new(CourseUsers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(CourseUsers::Role)
                            .string_len(16)
                            .not_null()
                            .default("student"),
                    )
                    .col(
                        ColumnDef::new(CourseUsers::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(CourseUsers::EnrolledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CourseUsers::InvitedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CourseUsers::InvitationId).uuid())
                    .col(
                        ColumnDef::new(CourseUsers::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CourseUsers::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CourseUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-course_users-course_id")
                            .from(CourseUsers::Table, CourseUsers::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-course_users-user_id")
                            .from(CourseUsers::Table, CourseUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create media table
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Media::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Media::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Media::OwnerType).string_len(16).not_null())
                    .col(ColumnDef::new(Media::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Media::Collection).string_len(16).not_null())
                    .col(ColumnDef::new(Media::Name).string().not_null())
                    .col(ColumnDef::new(Media::FileName).string().not_null())
                    .col(ColumnDef::new(Media::Path).string().not_null())
                    .col(ColumnDef::new(Media::MimeType).string().not_null())
                    .col(ColumnDef::new(Media::Extension).string())
                    .col(ColumnDef::new(Media::Size).big_integer().not_null())
                    .col(ColumnDef::new(Media::Disk).string().not_null())
                    .col(ColumnDef::new(Media::UploadedById).uuid())
                    .col(
                        ColumnDef::new(Media::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create password_reset_tokens table
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordResetTokens::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::TokenHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-password_reset_tokens-user_id")
                            .from(PasswordResetTokens::Table, PasswordResetTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordResetTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lessons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Modules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Users {
    Table,
    Id,
    Name,
    Email,
    Password,
    EmailVerifiedAt,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum RoleAssignments {
    Table,
    Id,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Courses {
    Table,
    Id,
    Slug,
    Title,
    Description,
    Status,
    PublishedAt,
    StartsAt,
    EndsAt,
    Metadata,
    TeacherId,
    CreatedById,
    UpdatedById,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Modules {
    Table,
    Id,
    CourseId,
    Title,
    Slug,
    Description,
    Position,
    PublishedAt,
    UnpublishAt,
    Metadata,
    CreatedById,
    UpdatedById,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Lessons {
    Table,
    Id,
    ModuleId,
    Title,
    Slug,
    Summary,
    Content,
    ContentType,
    Position,
    DurationMinutes,
    PublishedAt,
    Metadata,
    CreatedById,
    UpdatedById,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum CourseUsers {
    Table,
    Id,
    CourseId,
    UserId,
    Role,
    Status,
    EnrolledAt,
    InvitedAt,
    InvitationId,
    Metadata,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Media {
    Table,
    Id,
    Uuid,
    OwnerType,
    OwnerId,
    Collection,
    Name,
    FileName,
    Path,
    MimeType,
    Extension,
    Size,
    Disk,
    UploadedById,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum PasswordResetTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}
