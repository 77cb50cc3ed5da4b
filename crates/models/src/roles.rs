use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Global (site-wide) role, assigned through `role_assignments` rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "content_manager")]
    ContentManager,
    #[sea_orm(string_value = "student")]
    Student,
}

/// Capability tokens a role grants. Policies check membership in the actor's
/// resolved set instead of comparing role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CoursesViewAny,
    CoursesManage,
    UsersManage,
}

impl GlobalRole {
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            GlobalRole::Admin => &[
                Permission::CoursesViewAny,
                Permission::CoursesManage,
                Permission::UsersManage,
            ],
            GlobalRole::ContentManager => &[Permission::CoursesViewAny],
            GlobalRole::Teacher | GlobalRole::Student => &[],
        }
    }
}

/// An authenticated caller, resolved once per request: the user id plus the
/// permission set derived from their global roles.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    permissions: HashSet<Permission>,
}

impl Actor {
    pub fn from_roles(user_id: Uuid, roles: &[GlobalRole]) -> Self {
        let permissions = roles
            .iter()
            .flat_map(|role| role.permissions().iter().copied())
            .collect();
        Self {
            user_id,
            permissions,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_resolves_to_every_permission() {
        let actor = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Admin]);
        assert!(actor.can(Permission::CoursesViewAny));
        assert!(actor.can(Permission::CoursesManage));
        assert!(actor.can(Permission::UsersManage));
    }

    #[test]
    fn teacher_and_student_grant_nothing_globally() {
        let actor = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Teacher, GlobalRole::Student]);
        assert!(!actor.can(Permission::CoursesViewAny));
        assert!(!actor.can(Permission::CoursesManage));
        assert!(!actor.can(Permission::UsersManage));
    }

    #[test]
    fn content_manager_can_view_but_not_manage() {
        let actor = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::ContentManager]);
        assert!(actor.can(Permission::CoursesViewAny));
        assert!(!actor.can(Permission::CoursesManage));
    }
}
