use crate::{
    auth::CurrentUser,
    dtos::{
        common::{PageParams, PaginationMeta},
        user::{
            CreateUserRequest, PaginatedUsersResponse, PasswordResetResponse, UpdateUserRequest,
            UserResponse,
        },
    },
    error::ApiError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use database::{policies, services::user::UserService};
use models::roles::Permission;
use sea_orm::prelude::Uuid;

/// Get paginated list of users
#[utoipa::path(
    get,
    path = "/admin/users",
    params(PageParams),
    responses(
        (status = 200, description = "List of users retrieved successfully", body = PaginatedUsersResponse),
        (status = 403, description = "Caller may not manage users"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedUsersResponse>, ApiError> {
    if !current.actor.can(Permission::UsersManage) {
        return Err(ApiError::Forbidden);
    }

    let (users, total_items) = UserService::list(&state.db, params.page, params.per_page).await?;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        let roles = UserService::roles_for(&state.db, user.id).await?;
        responses.push(UserResponse::from_model(user, roles));
    }

    let pagination = PaginationMeta::new(params.page, params.per_page, total_items);
    Ok(Json(PaginatedUsersResponse {
        users: responses,
        pagination,
    }))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Caller may not manage users"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if !current.actor.can(Permission::UsersManage) {
        return Err(ApiError::Forbidden);
    }
    request.validate()?;

    let user = UserService::create(&state.db, request.into_input(), Utc::now()).await?;
    let roles = UserService::roles_for(&state.db, user.id).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from_model(user, roles))))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Unknown caller"),
        (status = 404, description = "User not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserService::require(&state.db, id).await?;
    if !policies::user::view(&current.actor, &user) {
        // a user the caller may not view reads the same as a missing one
        return Err(ApiError::NotFound);
    }

    let roles = UserService::roles_for(&state.db, user.id).await?;
    Ok(Json(UserResponse::from_model(user, roles)))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Caller may not change role grants"),
        (status = 404, description = "User not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserService::require(&state.db, id).await?;
    if !policies::user::update(&current.actor, &user) {
        // whoever may not update a user may not view them either
        return Err(ApiError::NotFound);
    }
    // self-service updates may not touch role grants
    if request.roles.is_some() && !current.actor.can(Permission::UsersManage) {
        return Err(ApiError::Forbidden);
    }
    request.validate()?;

    let user = UserService::update(&state.db, id, request.into_input(), Utc::now()).await?;
    let roles = UserService::roles_for(&state.db, user.id).await?;
    Ok(Json(UserResponse::from_model(user, roles)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admins may not delete their own account"),
        (status = 404, description = "User not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user = UserService::require(&state.db, id).await?;
    if !policies::user::delete(&current.actor, &user) {
        // self-deletion is denied outright; everyone else who may not delete
        // may not view either, and gets 404
        return Err(if policies::user::view(&current.actor, &user) {
            ApiError::Forbidden
        } else {
            ApiError::NotFound
        });
    }

    UserService::delete(&state.db, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue a password-reset token for a user
#[utoipa::path(
    post,
    path = "/admin/users/{id}/password-reset",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Token issued; any previous token is revoked", body = PasswordResetResponse),
        (status = 403, description = "Caller may not manage users"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Admin"
)]
pub async fn issue_password_reset(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PasswordResetResponse>, ApiError> {
    if !current.actor.can(Permission::UsersManage) {
        return Err(ApiError::Forbidden);
    }

    let token = UserService::issue_password_reset(&state.db, id, Utc::now()).await?;
    Ok(Json(PasswordResetResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use models::roles::GlobalRole;

    #[tokio::test]
    async fn foreign_users_read_as_missing_without_manage_permission() {
        let state = test_support::state().await;
        let caller = test_support::caller(&state, "Plain", "plain@example.com", &[]).await;
        let other = test_support::caller(&state, "Other", "other@example.com", &[]).await;

        let err = get_user(State(state.clone()), caller, Path(other.user.id))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn admin_self_delete_is_forbidden_not_missing() {
        let state = test_support::state().await;
        let admin =
            test_support::caller(&state, "Admin", "admin@example.com", &[GlobalRole::Admin]).await;
        let own_id = admin.user.id;

        // the admin can see their own account, so the denial is a plain 403
        let err = delete_user(State(state.clone()), admin, Path(own_id))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }
}
