use crate::entities::users;
use models::roles::{Actor, Permission};

/// View: admins or the user themself.
pub fn view(actor: &Actor, subject: &users::Model) -> bool {
    actor.can(Permission::UsersManage) || actor.is(subject.id)
}

/// Update: admins or the user themself.
pub fn update(actor: &Actor, subject: &users::Model) -> bool {
    actor.can(Permission::UsersManage) || actor.is(subject.id)
}

/// Delete: admins only, and never their own account.
pub fn delete(actor: &Actor, subject: &users::Model) -> bool {
    actor.can(Permission::UsersManage) && !actor.is(subject.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::roles::GlobalRole;
    use sea_orm::prelude::Uuid;

    fn user(id: Uuid) -> users::Model {
        let now = Utc::now();
        users::Model {
            id,
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            password: String::new(),
            email_verified_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn self_service_view_and_update() {
        let actor = Actor::from_roles(Uuid::new_v4(), &[]);
        let own = user(actor.user_id);
        let other = user(Uuid::new_v4());
        assert!(view(&actor, &own));
        assert!(update(&actor, &own));
        assert!(!view(&actor, &other));
        assert!(!update(&actor, &other));
    }

    #[test]
    fn self_delete_always_denied() {
        let admin = Actor::from_roles(Uuid::new_v4(), &[GlobalRole::Admin]);
        let own = user(admin.user_id);
        let other = user(Uuid::new_v4());
        assert!(delete(&admin, &other));
        assert!(!delete(&admin, &own));

        let plain = Actor::from_roles(Uuid::new_v4(), &[]);
        assert!(!delete(&plain, &user(plain.user_id)));
    }
}
