use crate::{
    auth::CurrentUser,
    dtos::module::{CreateModuleRequest, ModuleResponse, UpdateModuleRequest},
    error::ApiError,
    routes::course::course_denial,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use database::{
    policies,
    services::{course::CourseService, module::ModuleService},
};
use sea_orm::prelude::Uuid;

/// Add a module to a course
#[utoipa::path(
    post,
    path = "/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = ModuleResponse),
        (status = 403, description = "Caller may view but not manage this course"),
        (status = 404, description = "Course not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Modules"
)]
pub async fn create_module(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ModuleResponse>), ApiError> {
    let course = CourseService::require(&state.db, course_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }
    request.validate()?;

    let now = Utc::now();
    let module =
        ModuleService::create(&state.db, current.user.id, course_id, request.into_input(), now)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(ModuleResponse::from_model(module, now)),
    ))
}

/// Update a module
#[utoipa::path(
    put,
    path = "/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleRequest,
    responses(
        (status = 200, description = "Module updated", body = ModuleResponse),
        (status = 403, description = "Caller may view but not manage the owning course"),
        (status = 404, description = "Module not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Modules"
)]
pub async fn update_module(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateModuleRequest>,
) -> Result<Json<ModuleResponse>, ApiError> {
    let module = ModuleService::require(&state.db, id).await?;
    let course = CourseService::require(&state.db, module.course_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }
    request.validate()?;

    let now = Utc::now();
    let module =
        ModuleService::update(&state.db, current.user.id, id, request.into_input(), now).await?;
    Ok(Json(ModuleResponse::from_model(module, now)))
}

/// Delete a module and its lessons
#[utoipa::path(
    delete,
    path = "/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 204, description = "Module and its lessons deleted"),
        (status = 403, description = "Caller may view but not manage the owning course"),
        (status = 404, description = "Module not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Modules"
)]
pub async fn delete_module(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let module = ModuleService::require(&state.db, id).await?;
    let course = CourseService::require(&state.db, module.course_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }

    ModuleService::delete(&state.db, current.user.id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
