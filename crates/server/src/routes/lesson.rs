use crate::{
    auth::CurrentUser,
    dtos::lesson::{CreateLessonRequest, LessonResponse, UpdateLessonRequest},
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
    entities::{courses, modules},
    policies,
    services::{course::CourseService, lesson::LessonService, module::ModuleService},
};
use sea_orm::prelude::Uuid;

/// Add a lesson to a module
#[utoipa::path(
    post,
    path = "/modules/{id}/lessons",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 403, description = "Caller may view but not manage the owning course"),
        (status = 404, description = "Module not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Lessons"
)]
pub async fn create_lesson(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(module_id): Path<Uuid>,
    Json(request): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<LessonResponse>), ApiError> {
    let (module, course) = owning_course(&state, module_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }
    request.validate()?;

    let lesson = LessonService::create(
        &state.db,
        current.user.id,
        module.id,
        request.into_input(),
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(LessonResponse::from_model(lesson))))
}

/// Update a lesson
#[utoipa::path(
    put,
    path = "/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = LessonResponse),
        (status = 403, description = "Caller may view but not manage the owning course"),
        (status = 404, description = "Lesson not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Lessons"
)]
pub async fn update_lesson(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLessonRequest>,
) -> Result<Json<LessonResponse>, ApiError> {
    let lesson = LessonService::require(&state.db, id).await?;
    let (_, course) = owning_course(&state, lesson.module_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }
    request.validate()?;

    let lesson =
        LessonService::update(&state.db, current.user.id, id, request.into_input(), Utc::now())
            .await?;
    Ok(Json(LessonResponse::from_model(lesson)))
}

/// Delete a lesson
#[utoipa::path(
    delete,
    path = "/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 403, description = "Caller may view but not manage the owning course"),
        (status = 404, description = "Lesson not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Lessons"
)]
pub async fn delete_lesson(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let lesson = LessonService::require(&state.db, id).await?;
    let (_, course) = owning_course(&state, lesson.module_id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }

    LessonService::delete(&state.db, current.user.id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn owning_course(
    state: &AppState,
    module_id: Uuid,
) -> Result<(modules::Model, courses::Model), ApiError> {
    let module = ModuleService::require(&state.db, module_id).await?;
    let course = CourseService::require(&state.db, module.course_id).await?;
    Ok((module, course))
}
