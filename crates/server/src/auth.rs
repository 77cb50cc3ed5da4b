use crate::{error::ApiError, state::AppState};
use axum::{extract::FromRequestParts, http::request::Parts};
use database::{entities::users, services::user::UserService};
use models::roles::Actor;
use tower_oauth2_resource_server::claims::DefaultClaims;

/// The authenticated caller: the local user row matched to the validated JWT,
/// plus the actor (permission set) policies run against. Resolved once per
/// request.
///
/// Token validation itself happens in the resource-server layer; by the time
/// this extractor runs the claims are trustworthy. The token subject carries
/// the user's email address.
pub struct CurrentUser {
    pub user: users::Model,
    pub actor: Actor,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<DefaultClaims>()
            .ok_or(ApiError::Forbidden)?;
        let subject = claims.sub.as_deref().ok_or(ApiError::Forbidden)?;

        let user = UserService::find_by_email(&state.db, subject)
            .await
            .map_err(ApiError::from)?
            .ok_or(ApiError::Forbidden)?;
        let actor = UserService::actor_for(&state.db, user.id)
            .await
            .map_err(ApiError::from)?;

        Ok(CurrentUser { user, actor })
    }
}
