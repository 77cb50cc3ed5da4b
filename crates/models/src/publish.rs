use crate::status::CourseStatus;
use chrono::{DateTime, Utc};

/// Whether a module is visible at `now`.
///
/// True iff `published_at` is set and has passed, and `unpublish_at` is either
/// unset or still in the future. A null `published_at` is always unpublished.
///
/// Callers evaluating several entities in one request must pass a single `now`
/// snapshot so the whole batch sees a consistent boundary.
pub fn module_is_published(
    published_at: Option<DateTime<Utc>>,
    unpublish_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match published_at {
        None => false,
        Some(published_at) => {
            published_at <= now && unpublish_at.is_none_or(|unpublish_at| unpublish_at > now)
        }
    }
}

/// Whether a course is visible at `now`.
///
/// Courses have no `unpublish_at`; archiving via status is the off-switch.
pub fn course_is_published(
    status: CourseStatus,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status == CourseStatus::Active && published_at.is_some_and(|published_at| published_at <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn module_without_published_at_is_never_published() {
        assert!(!module_is_published(None, None, now()));
        assert!(!module_is_published(
            None,
            Some(now() + Duration::days(1)),
            now()
        ));
        assert!(!module_is_published(
            None,
            Some(now() - Duration::days(1)),
            now()
        ));
    }

    #[test]
    fn module_inside_window_is_published() {
        let published_at = Some(now() - Duration::days(1));
        let unpublish_at = Some(now() + Duration::days(1));
        assert!(module_is_published(published_at, unpublish_at, now()));
        assert!(module_is_published(published_at, None, now()));
    }

    #[test]
    fn module_past_unpublish_at_is_hidden() {
        let published_at = Some(now() - Duration::days(1));
        let unpublish_at = Some(now() - Duration::hours(1));
        assert!(!module_is_published(published_at, unpublish_at, now()));
    }

    #[test]
    fn module_window_boundaries() {
        // published_at == now counts as published, unpublish_at == now does not
        assert!(module_is_published(Some(now()), None, now()));
        assert!(!module_is_published(
            Some(now() - Duration::days(1)),
            Some(now()),
            now()
        ));
    }

    #[test]
    fn course_requires_active_status_and_past_published_at() {
        let yesterday = Some(now() - Duration::days(1));
        assert!(course_is_published(CourseStatus::Active, yesterday, now()));
        assert!(!course_is_published(CourseStatus::Draft, yesterday, now()));
        assert!(!course_is_published(CourseStatus::Archived, yesterday, now()));
        assert!(!course_is_published(CourseStatus::Active, None, now()));
        assert!(!course_is_published(
            CourseStatus::Active,
            Some(now() + Duration::hours(1)),
            now()
        ));
    }
}
