use crate::entities::{course_users, courses};
use models::roles::{Actor, Permission};

/// View: admins (or anyone with `CoursesViewAny`), the course's teacher, or a
/// user holding an active enrollment pivot row for this course.
pub fn view(
    actor: &Actor,
    course: &courses::Model,
    enrollment: Option<&course_users::Model>,
) -> bool {
    actor.can(Permission::CoursesViewAny)
        || course.teacher_id == Some(actor.user_id)
        || enrollment.is_some_and(|pivot| {
            pivot.course_id == course.id && pivot.user_id == actor.user_id && pivot.is_active()
        })
}

pub fn create(actor: &Actor) -> bool {
    actor.can(Permission::CoursesManage)
}

/// Update: admins or the course's own teacher.
pub fn update(actor: &Actor, course: &courses::Model) -> bool {
    actor.can(Permission::CoursesManage) || course.teacher_id == Some(actor.user_id)
}

pub fn delete(actor: &Actor, _course: &courses::Model) -> bool {
    actor.can(Permission::CoursesManage)
}

/// Module/lesson CRUD and student enrollment: admins or the course's own
/// teacher, never another teacher.
pub fn manage_content(actor: &Actor, course: &courses::Model) -> bool {
    update(actor, course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::{
        roles::GlobalRole,
        status::{CourseRole, CourseStatus, EnrollmentStatus},
    };
    use sea_orm::prelude::Uuid;

    fn course(teacher_id: Option<Uuid>) -> courses::Model {
        let now = Utc::now();
        courses::Model {
            id: Uuid::new_v4(),
            slug: "intro".to_string(),
            title: "Intro".to_string(),
            description: None,
            status: CourseStatus::Active,
            published_at: None,
            starts_at: None,
            ends_at: None,
            metadata: serde_json::json!({}),
            teacher_id,
            created_by_id: None,
            updated_by_id: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn pivot(course_id: Uuid, user_id: Uuid, status: EnrollmentStatus) -> course_users::Model {
        let now = Utc::now();
        course_users::Model {
            id: Uuid::new_v4(),
            course_id,
            user_id,
            role: CourseRole::Student,
            status,
            enrolled_at: Some(now),
            invited_at: None,
            invitation_id: None,
            metadata: serde_json::json!({}),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stranger_cannot_view_and_enrollment_grants_view() {
        let user = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Student]);
        let course = course(None);
        assert!(!view(&user, &course, None));

        let enrollment = pivot(course.id, user.user_id, EnrollmentStatus::Active);
        assert!(view(&user, &course, Some(&enrollment)));
    }

    #[test]
    fn inactive_enrollment_does_not_grant_view() {
        let user = Actor::from_roles(Uuid::new_v4(), &[]);
        let course = course(None);
        let enrollment = pivot(course.id, user.user_id, EnrollmentStatus::Inactive);
        assert!(!view(&user, &course, Some(&enrollment)));
    }

    #[test]
    fn own_teacher_can_update_other_teacher_cannot() {
        let teacher = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Teacher]);
        let other = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Teacher]);
        let course = course(Some(teacher.user_id));
        assert!(update(&teacher, &course));
        assert!(manage_content(&teacher, &course));
        assert!(!update(&other, &course));
        assert!(!manage_content(&other, &course));
    }

    #[test]
    fn only_admins_create_and_delete() {
        let admin = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Admin]);
        let teacher = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Teacher]);
        let course = course(Some(teacher.user_id));
        assert!(create(&admin));
        assert!(!create(&teacher));
        assert!(delete(&admin, &course));
        // even the course's own teacher may not delete it
        assert!(!delete(&teacher, &course));
    }
}
