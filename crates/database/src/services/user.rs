use crate::{
    entities::{media, password_reset_tokens, role_assignments, users},
    error::ServiceError,
    services::{FieldPatch, media::MediaService},
};
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use models::{
    media::{MediaCollection, MediaOwnerType},
    roles::{Actor, GlobalRole},
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How long an issued password-reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 2;

pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<GlobalRole>,
}

#[derive(Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// When present, replaces the user's global role set.
    pub roles: Option<Vec<GlobalRole>>,
}

/// Disk work left over from a profile update: an avatar file to move from its
/// temporary path into place, and files whose rows were deleted. Applied by
/// the caller after the transaction commits.
#[derive(Debug, Default)]
pub struct AvatarChange {
    pub moved: Option<(String, String)>,
    pub removed: Vec<media::Model>,
}

pub struct UserService;

impl UserService {
    pub async fn create(
        db: &DatabaseConnection,
        input: CreateUser,
        now: DateTime<Utc>,
    ) -> Result<users::Model, ServiceError> {
        db.transaction::<_, users::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                Self::ensure_email_free(txn, &input.email, None).await?;

                let user = users::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(input.name),
                    email: Set(input.email),
                    password: Set(hash_password(&input.password)?),
                    email_verified_at: Set(None),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                let user = users::Entity::insert(user).exec_with_returning(txn).await?;

                Self::replace_roles(txn, user.id, &input.roles, now).await?;
                Ok(user)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// Changing the email to a different address clears `email_verified_at`
    /// (re-verification required); writing back the same address preserves it.
    pub async fn update(
        db: &DatabaseConnection,
        user_id: Uuid,
        input: UpdateUser,
        now: DateTime<Utc>,
    ) -> Result<users::Model, ServiceError> {
        db.transaction::<_, users::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let current = Self::require(txn, user_id).await?;

                let mut user: users::ActiveModel = current.clone().into();
                if let Some(name) = input.name {
                    user.name = Set(name);
                }
                if let Some(email) = input.email
                    && email != current.email
                {
                    Self::ensure_email_free(txn, &email, Some(user_id)).await?;
                    user.email = Set(email);
                    user.email_verified_at = Set(None);
                }
                if let Some(password) = input.password {
                    user.password = Set(hash_password(&password)?);
                }
                user.updated_at = Set(now);
                let user = users::Entity::update(user).exec(txn).await?;

                if let Some(roles) = input.roles {
                    role_assignments::Entity::delete_many()
                        .filter(role_assignments::Column::UserId.eq(user_id))
                        .exec(txn)
                        .await?;
                    Self::replace_roles(txn, user_id, &roles, now).await?;
                }
                Ok(user)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// Self-service profile update: the rename and the avatar change commit
    /// together, so a failed avatar promotion cannot leave a half-applied
    /// rename behind.
    pub async fn update_profile(
        db: &DatabaseConnection,
        user_id: Uuid,
        name: Option<String>,
        avatar: FieldPatch<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(users::Model, AvatarChange), ServiceError> {
        db.transaction::<_, (users::Model, AvatarChange), ServiceError>(move |txn| {
            Box::pin(async move {
                let current = Self::require(txn, user_id).await?;

                let user = if let Some(name) = name {
                    let mut user: users::ActiveModel = current.into();
                    user.name = Set(name);
                    user.updated_at = Set(now);
                    users::Entity::update(user).exec(txn).await?
                } else {
                    current
                };

                let mut change = AvatarChange::default();
                match avatar {
                    FieldPatch::Keep => {}
                    FieldPatch::Clear => {
                        change.removed = MediaService::remove_for_owner(
                            txn,
                            MediaOwnerType::User,
                            user_id,
                            MediaCollection::Avatar,
                        )
                        .await?;
                    }
                    FieldPatch::Set(media_id) => {
                        let promoted = MediaService::promote(
                            txn,
                            media_id,
                            MediaOwnerType::User,
                            user_id,
                            MediaCollection::Avatar,
                        )
                        .await?;
                        change.moved = Some((promoted.previous_path, promoted.media.path.clone()));
                        change.removed = promoted.replaced;
                    }
                }

                Ok((user, change))
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn delete(
        db: &DatabaseConnection,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let user = Self::require(txn, user_id).await?;
                let mut user: users::ActiveModel = user.into();
                user.deleted_at = Set(Some(now));
                user.updated_at = Set(now);
                users::Entity::update(user).exec(txn).await?;
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// Stores a hashed, expiring single-use token and returns the plaintext
    /// exactly once. Any previous token for the user is revoked in the same
    /// transaction. Delivery is the caller's concern.
    pub async fn issue_password_reset(
        db: &DatabaseConnection,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        db.transaction::<_, String, ServiceError>(move |txn| {
            Box::pin(async move {
                Self::require(txn, user_id).await?;

                password_reset_tokens::Entity::delete_many()
                    .filter(password_reset_tokens::Column::UserId.eq(user_id))
                    .exec(txn)
                    .await?;

                let token = format!(
                    "{}{}",
                    Uuid::new_v4().simple(),
                    Uuid::new_v4().simple()
                );
                let record = password_reset_tokens::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    token_hash: Set(sha256_hex(&token)),
                    expires_at: Set(now + Duration::hours(RESET_TOKEN_TTL_HOURS)),
                    created_at: Set(now),
                };
                password_reset_tokens::Entity::insert(record).exec(txn).await?;
                Ok(token)
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<users::Model>, ServiceError> {
        let user = users::Entity::find_by_id(user_id)
            .filter(users::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        Ok(user)
    }

    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<users::Model, ServiceError> {
        Self::find(conn, user_id)
            .await?
            .ok_or(ServiceError::not_found("user"))
    }

    pub async fn find_by_email<C: ConnectionTrait>(
        conn: &C,
        email: &str,
    ) -> Result<Option<users::Model>, ServiceError> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        Ok(user)
    }

    pub async fn list(
        db: &DatabaseConnection,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<users::Model>, u64), ServiceError> {
        let query = users::Entity::find()
            .filter(users::Column::DeletedAt.is_null())
            .order_by_asc(users::Column::CreatedAt);

        let total_items = query.clone().count(db).await?;
        let users = query.paginate(db, per_page).fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total_items))
    }

    pub async fn roles_for<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<GlobalRole>, ServiceError> {
        let roles = role_assignments::Entity::find()
            .filter(role_assignments::Column::UserId.eq(user_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|assignment| assignment.role)
            .collect();
        Ok(roles)
    }

    /// Resolves a user to an [`Actor`] with their full permission set; done
    /// once per request at the boundary.
    pub async fn actor_for<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Actor, ServiceError> {
        let roles = Self::roles_for(conn, user_id).await?;
        Ok(Actor::from_roles(user_id, &roles))
    }

    async fn replace_roles<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        roles: &[GlobalRole],
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut seen = Vec::new();
        let grants: Vec<role_assignments::ActiveModel> = roles
            .iter()
            .filter(|role| {
                if seen.contains(*role) {
                    false
                } else {
                    seen.push(**role);
                    true
                }
            })
            .map(|role| role_assignments::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                role: Set(*role),
                created_at: Set(now),
            })
            .collect();
        if !grants.is_empty() {
            role_assignments::Entity::insert_many(grants).exec(conn).await?;
        }
        Ok(())
    }

    async fn ensure_email_free<C: ConnectionTrait>(
        conn: &C,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null());
        if let Some(id) = exclude {
            query = query.filter(users::Column::Id.ne(id));
        }
        if query.one(conn).await?.is_some() {
            return Err(ServiceError::validation("email", "email is already in use"));
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::validation("password", err.to_string()))
}

fn sha256_hex(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            name: "Sam".to_string(),
            email: email.to_string(),
            password: "correct horse battery staple".to_string(),
            roles: vec![GlobalRole::Teacher],
        }
    }

    #[tokio::test]
    async fn changing_email_clears_verification() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();
        test_support::mark_email_verified(&db, user.id, ts()).await;

        // same address: verification preserved
        let user = UserService::update(
            &db,
            user.id,
            UpdateUser {
                email: Some("a@example.com".to_string()),
                ..Default::default()
            },
            ts(),
        )
        .await
        .unwrap();
        assert!(user.email_verified_at.is_some());

        // different address: verification reset
        let user = UserService::update(
            &db,
            user.id,
            UpdateUser {
                email: Some("b@example.com".to_string()),
                ..Default::default()
            },
            ts(),
        )
        .await
        .unwrap();
        assert!(user.email_verified_at.is_none());
        assert_eq!(user.email, "b@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = test_support::connect().await;
        UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();
        let err = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation { field: "email", .. }
        ));
    }

    #[tokio::test]
    async fn roles_replace_not_accumulate() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();
        assert_eq!(
            UserService::roles_for(&db, user.id).await.unwrap(),
            vec![GlobalRole::Teacher]
        );

        UserService::update(
            &db,
            user.id,
            UpdateUser {
                roles: Some(vec![GlobalRole::Admin, GlobalRole::Admin]),
                ..Default::default()
            },
            ts(),
        )
        .await
        .unwrap();
        let roles = UserService::roles_for(&db, user.id).await.unwrap();
        assert_eq!(roles, vec![GlobalRole::Admin]);
    }

    #[tokio::test]
    async fn password_reset_tokens_are_hashed_and_revoked_on_reissue() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();

        let first = UserService::issue_password_reset(&db, user.id, ts())
            .await
            .unwrap();
        let second = UserService::issue_password_reset(&db, user.id, ts())
            .await
            .unwrap();
        assert_ne!(first, second);

        let rows = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token_hash, sha256_hex(&second));
        assert_ne!(rows[0].token_hash, second);
    }

    #[tokio::test]
    async fn profile_update_applies_rename_and_avatar_together() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();
        let upload = test_support::insert_temporary_media(&db, user.id).await;

        let (updated, change) = UserService::update_profile(
            &db,
            user.id,
            Some("Samantha".to_string()),
            FieldPatch::Set(upload),
            ts(),
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Samantha");
        let (from, to) = change.moved.unwrap();
        assert_ne!(from, to);
        assert!(to.starts_with("avatar/"));

        let avatars = MediaService::find_for_owner(
            &db,
            MediaOwnerType::User,
            user.id,
            MediaCollection::Avatar,
        )
        .await
        .unwrap();
        assert_eq!(avatars.len(), 1);
        assert_eq!(avatars[0].id, upload);
    }

    #[tokio::test]
    async fn failed_avatar_promotion_rolls_back_the_rename() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();

        let err = UserService::update_profile(
            &db,
            user.id,
            Some("Samantha".to_string()),
            FieldPatch::Set(Uuid::new_v4()),
            ts(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let user = UserService::require(&db, user.id).await.unwrap();
        assert_eq!(user.name, "Sam");
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let db = test_support::connect().await;
        let user = UserService::create(&db, new_user("a@example.com"), ts())
            .await
            .unwrap();
        assert!(user.password.starts_with("$argon2"));
    }
}
