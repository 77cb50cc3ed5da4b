use crate::{
    entities::{course_users, role_assignments, users},
    error::ServiceError,
    services::course::CourseService,
};
use chrono::{DateTime, Utc};
use models::{
    roles::GlobalRole,
    status::{CourseRole, EnrollmentStatus},
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
    sea_query::Expr,
};
use std::collections::HashSet;
use uuid::Uuid;

pub struct EnrollmentService;

impl EnrollmentService {
    /// Synchronizes a course's student enrollment with `student_ids`, in one
    /// transaction.
    ///
    /// Net effect: every resolvable id in the batch ends up with the global
    /// Student role and an active pivot row. Users already on the course keep
    /// their original `enrolled_at`; naming them again flips a dormant row
    /// back to Active. Users absent from the batch are untouched, so a call
    /// can never silently unenroll anyone. Ids that resolve to no user are
    /// skipped without error. The whole batch of new rows shares one
    /// `enrolled_at` timestamp.
    ///
    /// The read-merge-write sequence takes no row lock; two concurrent calls
    /// for the same course can race.
    pub async fn enroll_students(
        db: &DatabaseConnection,
        course_id: Uuid,
        student_ids: Vec<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                CourseService::require(txn, course_id).await?;

                let resolved: Vec<users::Model> = if student_ids.is_empty() {
                    Vec::new()
                } else {
                    users::Entity::find()
                        .filter(users::Column::Id.is_in(student_ids))
                        .filter(users::Column::DeletedAt.is_null())
                        .all(txn)
                        .await?
                };
                let resolved_ids: Vec<Uuid> = resolved.iter().map(|user| user.id).collect();

                // grant the global Student role where missing
                if !resolved_ids.is_empty() {
                    let already_student: HashSet<Uuid> = role_assignments::Entity::find()
                        .filter(role_assignments::Column::UserId.is_in(resolved_ids.clone()))
                        .filter(role_assignments::Column::Role.eq(GlobalRole::Student))
                        .all(txn)
                        .await?
                        .into_iter()
                        .map(|assignment| assignment.user_id)
                        .collect();

                    let grants: Vec<role_assignments::ActiveModel> = resolved_ids
                        .iter()
                        .filter(|user_id| !already_student.contains(user_id))
                        .map(|user_id| role_assignments::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            user_id: Set(*user_id),
                            role: Set(GlobalRole::Student),
                            created_at: Set(now),
                        })
                        .collect();
                    if !grants.is_empty() {
                        role_assignments::Entity::insert_many(grants).exec(txn).await?;
                    }
                }

                // an explicit re-enroll reactivates a dormant row without
                // touching its enrolled_at
                if !resolved_ids.is_empty() {
                    course_users::Entity::update_many()
                        .col_expr(course_users::Column::Status, Expr::value(EnrollmentStatus::Active))
                        .col_expr(course_users::Column::UpdatedAt, Expr::value(now))
                        .filter(course_users::Column::CourseId.eq(course_id))
                        .filter(course_users::Column::UserId.is_in(resolved_ids.clone()))
                        .filter(course_users::Column::DeletedAt.is_null())
                        .filter(course_users::Column::Status.ne(EnrollmentStatus::Active))
                        .exec(txn)
                        .await?;
                }

                // merge: rows already on the course are carried forward with
                // their enrolled_at; only users new to the course get fresh
                // pivots
                let enrolled: HashSet<Uuid> = course_users::Entity::find()
                    .filter(course_users::Column::CourseId.eq(course_id))
                    .filter(course_users::Column::DeletedAt.is_null())
                    .all(txn)
                    .await?
                    .into_iter()
                    .map(|pivot| pivot.user_id)
                    .collect();

                let new_pivots: Vec<course_users::ActiveModel> = resolved_ids
                    .iter()
                    .filter(|user_id| !enrolled.contains(user_id))
                    .map(|user_id| course_users::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        course_id: Set(course_id),
                        user_id: Set(*user_id),
                        role: Set(CourseRole::Student),
                        status: Set(EnrollmentStatus::Active),
                        enrolled_at: Set(Some(now)),
                        invited_at: Set(None),
                        invitation_id: Set(None),
                        metadata: Set(serde_json::json!({})),
                        deleted_at: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                    })
                    .collect();
                if !new_pivots.is_empty() {
                    course_users::Entity::insert_many(new_pivots).exec(txn).await?;
                }

                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)
    }

    /// The course's live pivot rows.
    pub async fn enrollment_for_course(
        db: &DatabaseConnection,
        course_id: Uuid,
    ) -> Result<Vec<course_users::Model>, ServiceError> {
        let rows = course_users::Entity::find()
            .filter(course_users::Column::CourseId.eq(course_id))
            .filter(course_users::Column::DeletedAt.is_null())
            .all(db)
            .await?;
        Ok(rows)
    }

    /// The actor's live pivot row for a course, if any; input to the course
    /// view policy.
    pub async fn pivot_for_user(
        db: &DatabaseConnection,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<course_users::Model>, ServiceError> {
        let row = course_users::Entity::find()
            .filter(course_users::Column::CourseId.eq(course_id))
            .filter(course_users::Column::UserId.eq(user_id))
            .filter(course_users::Column::DeletedAt.is_null())
            .one(db)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::{Duration, TimeZone};

    async fn student(db: &DatabaseConnection, email: &str) -> Uuid {
        test_support::insert_user(db, "Student", email).await
    }

    // whole-second timestamp so equality survives the round trip through the
    // test database
    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn successive_batches_accumulate() {
        let db = test_support::connect().await;
        let admin = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let course = test_support::insert_course(&db, admin, "intro").await;
        let (a, b, c) = (
            student(&db, "a@example.com").await,
            student(&db, "b@example.com").await,
            student(&db, "c@example.com").await,
        );
        let now = ts();

        EnrollmentService::enroll_students(&db, course, vec![a, b], now)
            .await
            .unwrap();
        EnrollmentService::enroll_students(&db, course, vec![c], now + Duration::hours(1))
            .await
            .unwrap();

        let rows = EnrollmentService::enrollment_for_course(&db, course)
            .await
            .unwrap();
        let enrolled: HashSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(enrolled, HashSet::from([a, b, c]));
    }

    #[tokio::test]
    async fn re_enrolling_is_idempotent_and_preserves_enrolled_at() {
        let db = test_support::connect().await;
        let admin = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let course = test_support::insert_course(&db, admin, "intro").await;
        let a = student(&db, "a@example.com").await;

        let first = ts();
        EnrollmentService::enroll_students(&db, course, vec![a], first)
            .await
            .unwrap();
        EnrollmentService::enroll_students(&db, course, vec![a], first + Duration::days(1))
            .await
            .unwrap();

        let rows = EnrollmentService::enrollment_for_course(&db, course)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].enrolled_at, Some(first));

        // the Student role was granted exactly once
        let grants = role_assignments::Entity::find()
            .filter(role_assignments::Column::UserId.eq(a))
            .filter(role_assignments::Column::Role.eq(GlobalRole::Student))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
    }

    #[tokio::test]
    async fn re_enrolling_reactivates_a_dormant_row() {
        let db = test_support::connect().await;
        let admin = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let course = test_support::insert_course(&db, admin, "intro").await;
        let a = student(&db, "a@example.com").await;

        let first = ts();
        EnrollmentService::enroll_students(&db, course, vec![a], first)
            .await
            .unwrap();

        // the student drops the course
        let pivot = EnrollmentService::pivot_for_user(&db, course, a)
            .await
            .unwrap()
            .unwrap();
        let mut dormant: course_users::ActiveModel = pivot.into();
        dormant.status = Set(EnrollmentStatus::Inactive);
        course_users::Entity::update(dormant).exec(&db).await.unwrap();

        EnrollmentService::enroll_students(&db, course, vec![a], first + Duration::days(1))
            .await
            .unwrap();

        let pivot = EnrollmentService::pivot_for_user(&db, course, a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pivot.status, EnrollmentStatus::Active);
        assert_eq!(pivot.enrolled_at, Some(first));
    }

    #[tokio::test]
    async fn unresolvable_ids_are_silently_ignored() {
        let db = test_support::connect().await;
        let admin = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let course = test_support::insert_course(&db, admin, "intro").await;
        let a = student(&db, "a@example.com").await;

        EnrollmentService::enroll_students(&db, course, vec![a, Uuid::new_v4(), Uuid::new_v4()], ts())
            .await
            .unwrap();

        let rows = EnrollmentService::enrollment_for_course(&db, course)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, a);
    }

    #[tokio::test]
    async fn empty_batch_leaves_enrollment_unchanged() {
        let db = test_support::connect().await;
        let admin = test_support::insert_user(&db, "Admin", "admin@example.com").await;
        let course = test_support::insert_course(&db, admin, "intro").await;
        let a = student(&db, "a@example.com").await;
        let now = ts();

        EnrollmentService::enroll_students(&db, course, vec![a], now)
            .await
            .unwrap();
        EnrollmentService::enroll_students(&db, course, vec![], now + Duration::hours(1))
            .await
            .unwrap();

        let rows = EnrollmentService::enrollment_for_course(&db, course)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].enrolled_at, Some(now));
    }

    #[tokio::test]
    async fn enrolling_into_a_missing_course_fails() {
        let db = test_support::connect().await;
        let a = student(&db, "a@example.com").await;
        let err = EnrollmentService::enroll_students(&db, Uuid::new_v4(), vec![a], ts())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
