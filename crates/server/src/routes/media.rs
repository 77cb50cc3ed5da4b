use crate::{
    auth::CurrentUser,
    dtos::media::{MediaResponse, UploadForm, validate_upload},
    error::ApiError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use database::services::media::{MediaService, RecordUpload};
use log::error;
use models::media::{MediaCollection, MediaOwnerType};
use sea_orm::ActiveEnum;
use uuid::Uuid;

pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: axum::body::Bytes,
}

/// Upload a file
///
/// Accepts a multipart body with a `file` part and an optional `collection`
/// part (`temporary`, the default, or `avatar`). Temporary uploads are parked
/// until a later request promotes them; avatar uploads attach to the caller
/// immediately.
#[utoipa::path(
    post,
    path = "/media/uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Upload stored", body = MediaResponse),
        (status = 403, description = "Unknown caller"),
        (status = 422, description = "Missing file, oversized upload or unsupported mime type"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Media"
)]
pub async fn upload(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let (collection, file) = read_upload(multipart).await?;
    match collection {
        MediaCollection::Temporary | MediaCollection::Avatar => {}
        MediaCollection::Cover => {
            // covers are attached through the course update endpoint
            return Err(ApiError::validation(
                "collection",
                "must be `temporary` or `avatar`",
            ));
        }
    }
    validate_upload(collection, &file.mime_type, file.bytes.len())?;

    store_for_user(&state, current.user.id, collection, file).await
}

/// Reads the multipart body into the optional target collection and the file
/// part. Anything else in the body is ignored.
pub async fn read_upload(
    mut multipart: Multipart,
) -> Result<(MediaCollection, UploadedFile), ApiError> {
    let malformed = |_| ApiError::validation("file", "malformed multipart body");

    let mut collection = MediaCollection::Temporary;
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        match field.name() {
            Some("collection") => {
                let value = field.text().await.map_err(malformed)?;
                collection = match value.as_str() {
                    "temporary" => MediaCollection::Temporary,
                    "avatar" => MediaCollection::Avatar,
                    _ => {
                        return Err(ApiError::validation(
                            "collection",
                            "must be `temporary` or `avatar`",
                        ));
                    }
                };
            }
            Some("file") => {
                let file_name = sanitize_file_name(field.file_name().unwrap_or("upload"));
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("file", "exceeds the request size limit"))?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::validation("file", "is required"))?;
    Ok((collection, file))
}

/// Records the upload against the caller and writes the bytes to disk. Rows
/// replaced by a singular collection are cleaned off the disk afterwards.
pub async fn store_for_user(
    state: &AppState,
    user_id: Uuid,
    collection: MediaCollection,
    file: UploadedFile,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let name = file
        .file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .unwrap_or_else(|| file.file_name.clone());
    let extension = file
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let path = format!(
        "{}/{}/{}",
        collection.to_value(),
        Uuid::new_v4(),
        file.file_name
    );

    let (model, replaced) = MediaService::store(
        &state.db,
        RecordUpload {
            owner_type: MediaOwnerType::User,
            owner_id: user_id,
            collection,
            name,
            file_name: file.file_name,
            path,
            mime_type: file.mime_type,
            extension,
            size: file.bytes.len() as i64,
            disk: "local".to_string(),
            uploaded_by_id: Some(user_id),
        },
        Utc::now(),
    )
    .await?;

    state
        .storage
        .write(&model.path, &file.bytes)
        .await
        .map_err(|err| {
            error!("failed to write uploaded file: {err}");
            ApiError::Internal
        })?;
    for old in replaced {
        state.storage.remove(&old.path).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(MediaResponse::from_model(model, &state.storage)),
    ))
}

/// Keeps file names to a safe single-segment charset.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(['.', '-']);
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_path_segments_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "etc-passwd");
        assert_eq!(sanitize_file_name("photo of me.png"), "photo-of-me.png");
        assert_eq!(sanitize_file_name("///"), "upload");
    }
}
