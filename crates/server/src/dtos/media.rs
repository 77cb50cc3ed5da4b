use crate::{
    error::{ApiError, ValidationErrors},
    storage::MediaStorage,
};
use database::entities::media;
use models::media::MediaCollection;
use sea_orm::ActiveEnum;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub const GENERAL_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const AVATAR_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/svg+xml",
];

const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/csv",
    "text/plain",
];

/// Schema of the multipart upload body, for documentation purposes only; the
/// handlers read the raw multipart stream.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: String,
    /// `temporary` (default) or `avatar`.
    pub collection: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: Uuid,
    pub uuid: Uuid,
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: i64,
    #[schema(value_type = String)]
    pub collection: String,
    pub url: String,
    pub preview_url: Option<String>,
}

impl MediaResponse {
    pub fn from_model(model: media::Model, storage: &MediaStorage) -> Self {
        let url = storage.url_for(&model.path);
        let preview_url = model
            .mime_type
            .starts_with("image/")
            .then(|| url.clone());
        Self {
            id: model.id,
            uuid: model.uuid,
            name: model.name,
            file_name: model.file_name,
            mime_type: model.mime_type,
            size: model.size,
            collection: model.collection.to_value(),
            url,
            preview_url,
        }
    }
}

/// Validates an incoming upload against the per-collection size cap and mime
/// allowlist, before anything touches the database or the disk.
pub fn validate_upload(
    collection: MediaCollection,
    mime_type: &str,
    size: usize,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();

    let (cap, allowed): (usize, bool) = match collection {
        MediaCollection::Avatar => (
            AVATAR_UPLOAD_MAX_BYTES,
            IMAGE_MIME_TYPES.contains(&mime_type),
        ),
        _ => (
            GENERAL_UPLOAD_MAX_BYTES,
            IMAGE_MIME_TYPES.contains(&mime_type) || DOCUMENT_MIME_TYPES.contains(&mime_type),
        ),
    };

    if size == 0 {
        errors.add("file", "must not be empty");
    } else if size > cap {
        errors.add(
            "file",
            format!("must not exceed {} bytes", cap),
        );
    }
    if !allowed {
        errors.add("file", format!("unsupported mime type `{mime_type}`"));
    }

    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_uploads_take_images_and_documents_up_to_the_cap() {
        assert!(validate_upload(MediaCollection::Temporary, "image/png", 1024).is_ok());
        assert!(validate_upload(MediaCollection::Temporary, "application/pdf", 1024).is_ok());
        assert!(
            validate_upload(
                MediaCollection::Temporary,
                "image/png",
                GENERAL_UPLOAD_MAX_BYTES
            )
            .is_ok()
        );
        assert!(
            validate_upload(
                MediaCollection::Temporary,
                "image/png",
                GENERAL_UPLOAD_MAX_BYTES + 1
            )
            .is_err()
        );
    }

    #[test]
    fn avatars_are_images_only_with_a_tighter_cap() {
        assert!(validate_upload(MediaCollection::Avatar, "image/jpeg", 1024).is_ok());
        assert!(validate_upload(MediaCollection::Avatar, "application/pdf", 1024).is_err());
        assert!(
            validate_upload(
                MediaCollection::Avatar,
                "image/jpeg",
                AVATAR_UPLOAD_MAX_BYTES + 1
            )
            .is_err()
        );
    }

    #[test]
    fn executables_and_empty_files_are_rejected() {
        assert!(
            validate_upload(MediaCollection::Temporary, "application/x-msdownload", 10).is_err()
        );
        assert!(validate_upload(MediaCollection::Temporary, "image/png", 0).is_err());
    }
}
