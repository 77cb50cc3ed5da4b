use crate::{
    auth::CurrentUser,
    dtos::{
        media::{MediaResponse, UploadForm, validate_upload},
        user::{ProfileResponse, UpdateProfileRequest, UserResponse},
    },
    error::ApiError,
    routes::media::{read_upload, store_for_user},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use database::services::{FieldPatch, media::MediaService, user::UserService};
use log::error;
use models::media::{MediaCollection, MediaOwnerType};
use uuid::Uuid;

/// Update the caller's own profile
#[utoipa::path(
    patch,
    path = "/user-profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 403, description = "Unknown caller"),
        (status = 404, description = "Referenced temporary upload not found"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    request.validate()?;
    let user_id = current.user.id;

    let avatar = if request.remove_avatar {
        FieldPatch::Clear
    } else if let Some(media_id) = request.avatar_media_id {
        FieldPatch::Set(media_id)
    } else {
        FieldPatch::Keep
    };

    // rename and avatar commit together; disk follows the database
    let (_, change) =
        UserService::update_profile(&state.db, user_id, request.name, avatar, Utc::now()).await?;

    if let Some((from, to)) = change.moved {
        state.storage.rename(&from, &to).await.map_err(|err| {
            error!("failed to move avatar file into place: {err}");
            ApiError::Internal
        })?;
    }
    for removed in change.removed {
        state.storage.remove(&removed.path).await;
    }

    profile_response(&state, user_id).await.map(Json)
}

/// Upload and attach the caller's avatar in one step
#[utoipa::path(
    post,
    path = "/avatar",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Avatar stored, replacing any previous one", body = MediaResponse),
        (status = 403, description = "Unknown caller"),
        (status = 422, description = "Missing file, oversized upload or non-image mime type"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Profile"
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let (_, file) = read_upload(multipart).await?;
    validate_upload(MediaCollection::Avatar, &file.mime_type, file.bytes.len())?;
    store_for_user(&state, current.user.id, MediaCollection::Avatar, file).await
}

/// Remove the caller's avatar
#[utoipa::path(
    delete,
    path = "/avatar",
    responses(
        (status = 204, description = "Avatar removed, if one existed"),
        (status = 403, description = "Unknown caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Profile"
)]
pub async fn delete_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    for removed in MediaService::remove_avatar(&state.db, current.user.id).await? {
        state.storage.remove(&removed.path).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn profile_response(state: &AppState, user_id: Uuid) -> Result<ProfileResponse, ApiError> {
    let user = UserService::require(&state.db, user_id).await?;
    let roles = UserService::roles_for(&state.db, user_id).await?;
    let avatar = MediaService::find_for_owner(
        &state.db,
        MediaOwnerType::User,
        user_id,
        MediaCollection::Avatar,
    )
    .await?
    .into_iter()
    .next()
    .map(|model| MediaResponse::from_model(model, &state.storage));

    Ok(ProfileResponse {
        user: UserResponse::from_model(user, roles),
        avatar,
    })
}
