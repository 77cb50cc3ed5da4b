use crate::{
    auth::CurrentUser,
    dtos::{
        common::{PageParams, PaginationMeta},
        course::{
            CourseDetailResponse, CourseResponse, CreateCourseRequest, EnrollStudentsRequest,
            EnrollmentResponse, PaginatedCoursesResponse, UpdateCourseRequest,
        },
        module::ModuleResponse,
    },
    error::ApiError,
    state::AppState,
    storage::MediaStorage,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use database::{
    entities::{course_users, courses},
    policies,
    services::{
        course::{CourseService, CoverChange},
        enrollment::EnrollmentService,
        module::ModuleService,
    },
};
use log::error;
use models::{roles::Permission, status::EnrollmentStatus};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, prelude::Uuid,
};

/// Get paginated list of courses visible to the caller
#[utoipa::path(
    get,
    path = "/courses",
    params(PageParams),
    responses(
        (status = 200, description = "List of courses retrieved successfully", body = PaginatedCoursesResponse),
        (status = 403, description = "Unknown caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedCoursesResponse>, ApiError> {
    let now = Utc::now();

    let (courses, total_items) = if current.actor.can(Permission::CoursesViewAny) {
        CourseService::list(&state.db, params.page, params.per_page).await?
    } else {
        // everyone else sees the courses they teach or are actively enrolled in
        let enrolled_ids: Vec<Uuid> = course_users::Entity::find()
            .filter(course_users::Column::UserId.eq(current.user.id))
            .filter(course_users::Column::Status.eq(EnrollmentStatus::Active))
            .filter(course_users::Column::DeletedAt.is_null())
            .all(&state.db)
            .await?
            .into_iter()
            .map(|pivot| pivot.course_id)
            .collect();

        let query = courses::Entity::find()
            .filter(courses::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(courses::Column::TeacherId.eq(current.user.id))
                    .add(courses::Column::Id.is_in(enrolled_ids)),
            )
            .order_by_desc(courses::Column::CreatedAt);

        let total_items = query.clone().count(&state.db).await?;
        let page = query
            .paginate(&state.db, params.per_page)
            .fetch_page(params.page.saturating_sub(1))
            .await?;
        (page, total_items)
    };

    let pagination = PaginationMeta::new(params.page, params.per_page, total_items);
    Ok(Json(PaginatedCoursesResponse {
        courses: courses
            .into_iter()
            .map(|course| CourseResponse::from_model(course, now))
            .collect(),
        pagination,
    }))
}

/// Create a course
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 403, description = "Caller may not create courses"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    if !policies::course::create(&current.actor) {
        return Err(ApiError::Forbidden);
    }
    request.validate()?;

    let now = Utc::now();
    let course =
        CourseService::create(&state.db, current.user.id, request.into_input(), now).await?;
    Ok((
        StatusCode::CREATED,
        Json(CourseResponse::from_model(course, now)),
    ))
}

/// Get a course with its modules and enrollment
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course found", body = CourseDetailResponse),
        (status = 403, description = "Unknown caller"),
        (status = 404, description = "Course not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let now = Utc::now();
    let course = CourseService::require(&state.db, id).await?;
    let pivot = EnrollmentService::pivot_for_user(&state.db, id, current.user.id).await?;
    if !policies::course::view(&current.actor, &course, pivot.as_ref()) {
        // a course the caller may not view reads the same as a missing one
        return Err(ApiError::NotFound);
    }

    let manages = policies::course::manage_content(&current.actor, &course);
    let modules = ModuleService::list_for_course(&state.db, id)
        .await?
        .into_iter()
        // non-managing viewers only see modules inside their publish window
        .filter(|module| manages || module.is_published(now))
        .map(|module| ModuleResponse::from_model(module, now))
        .collect();

    let enrollment = EnrollmentService::enrollment_for_course(&state.db, id).await?;
    let enrolled_count = enrollment.len() as u64;
    let students = manages.then(|| {
        enrollment
            .into_iter()
            .map(EnrollmentResponse::from_model)
            .collect()
    });

    Ok(Json(CourseDetailResponse {
        course: CourseResponse::from_model(course, now),
        modules,
        enrolled_count,
        students,
    }))
}

/// Update a course
#[utoipa::path(
    put,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 403, description = "Caller may view but not update this course"),
        (status = 404, description = "Course not found or not visible to the caller"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn update_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCourseRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = CourseService::require(&state.db, id).await?;
    if !policies::course::update(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }
    request.validate()?;

    let now = Utc::now();
    let (course, cover_change) =
        CourseService::update(&state.db, current.user.id, id, request.into_input(), now).await?;
    apply_cover_change(&state.storage, cover_change).await?;

    Ok(Json(CourseResponse::from_model(course, now)))
}

/// Delete a course
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Caller may view but not delete this course"),
        (status = 404, description = "Course not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let course = CourseService::require(&state.db, id).await?;
    if !policies::course::delete(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }

    CourseService::delete(&state.db, current.user.id, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Enroll a batch of students into a course
#[utoipa::path(
    post,
    path = "/courses/{id}/students",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = EnrollStudentsRequest,
    responses(
        (status = 204, description = "Enrollment synchronized; unresolvable ids are skipped"),
        (status = 403, description = "Caller may view but not manage this course"),
        (status = 404, description = "Course not found or not visible to the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("jwt" = [])),
    tag = "Courses"
)]
pub async fn enroll_students(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<EnrollStudentsRequest>,
) -> Result<StatusCode, ApiError> {
    let course = CourseService::require(&state.db, id).await?;
    if !policies::course::manage_content(&current.actor, &course) {
        return Err(course_denial(&state, &current, &course).await);
    }

    EnrollmentService::enroll_students(&state.db, id, request.student_ids, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Maps a denied course action to a response: a caller who may not even view
/// the course gets 404, so denied ids read the same as missing ones; a viewer
/// lacking the permission gets a plain 403.
pub async fn course_denial(
    state: &AppState,
    current: &CurrentUser,
    course: &courses::Model,
) -> ApiError {
    let pivot =
        match EnrollmentService::pivot_for_user(&state.db, course.id, current.user.id).await {
            Ok(pivot) => pivot,
            Err(err) => return err.into(),
        };
    if policies::course::view(&current.actor, course, pivot.as_ref()) {
        ApiError::Forbidden
    } else {
        ApiError::NotFound
    }
}

/// Applies the disk side of a committed cover change: moves the promoted file
/// into place and drops the files whose rows were deleted.
pub async fn apply_cover_change(
    storage: &MediaStorage,
    change: CoverChange,
) -> Result<(), ApiError> {
    if let Some((from, to)) = change.moved {
        storage.rename(&from, &to).await.map_err(|err| {
            error!("failed to move cover file into place: {err}");
            ApiError::Internal
        })?;
    }
    for removed in change.removed {
        storage.remove(&removed.path).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use models::roles::GlobalRole;

    #[tokio::test]
    async fn unviewable_courses_read_as_missing() {
        let state = test_support::state().await;
        let teacher =
            test_support::caller(&state, "Teacher", "t@example.com", &[GlobalRole::Teacher]).await;
        let course_id = test_support::insert_course(&state, Some(teacher.user.id)).await;
        let stranger =
            test_support::caller(&state, "Student", "s@example.com", &[GlobalRole::Student]).await;

        let err = get_course(State(state.clone()), stranger, Path(course_id))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn update_denial_depends_on_visibility() {
        let state = test_support::state().await;
        let teacher =
            test_support::caller(&state, "Teacher", "t@example.com", &[GlobalRole::Teacher]).await;
        let course_id = test_support::insert_course(&state, Some(teacher.user.id)).await;

        // another teacher cannot even tell the course exists
        let rival =
            test_support::caller(&state, "Rival", "r@example.com", &[GlobalRole::Teacher]).await;
        let err = update_course(
            State(state.clone()),
            rival,
            Path(course_id),
            Json(UpdateCourseRequest::default()),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        // an enrolled student can, and gets a plain denial
        let student =
            test_support::caller(&state, "Student", "s@example.com", &[GlobalRole::Student]).await;
        EnrollmentService::enroll_students(&state.db, course_id, vec![student.user.id], Utc::now())
            .await
            .unwrap();
        let err = update_course(
            State(state.clone()),
            student,
            Path(course_id),
            Json(UpdateCourseRequest::default()),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }
}
