use crate::{error::Error, jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageCatalog,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnLists,
    ManageSubscriptions,

    ManageAllRecipes,
    ManageCatalog,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    /// Owners may manage their own objects, admins everything.
    pub fn authenticate_owner(&self, owner_id: i64, all: ActionType) -> Result<(), Error> {
        if owner_id == self.user_id || all.authenticate(self) {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: "cook".to_string(),
            is_admin: role == UserRole::Admin,
            role,
        }
    }

    #[test]
    fn users_cannot_touch_the_catalog() {
        assert!(session(UserRole::User)
            .authenticate(ActionType::ManageCatalog)
            .is_err());
        assert!(session(UserRole::Admin)
            .authenticate(ActionType::ManageCatalog)
            .is_ok());
    }

    #[test]
    fn ownership() {
        let user = session(UserRole::User);
        assert!(user
            .authenticate_owner(1, ActionType::ManageAllRecipes)
            .is_ok());
        assert!(matches!(
            user.authenticate_owner(2, ActionType::ManageAllRecipes),
            Err(Error::Forbidden)
        ));
        assert!(session(UserRole::Admin)
            .authenticate_owner(2, ActionType::ManageAllRecipes)
            .is_ok());
    }
}
