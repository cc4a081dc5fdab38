//! User directory slice. Client-owned, never sent to a server.

use serde::{Deserialize, Serialize};

use crate::model::{new_id, NewUser, User, UserPatch, ValidationError};
use crate::store::normalized::{Entity, NormalizedCollection};

impl Entity for User {
    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersState {
    pub users: NormalizedCollection<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsersAction {
    AddUser(User),
    UpdateUser { id: String, patch: UserPatch },
    DeleteUser { id: String },
    ReplaceAll(UsersState),
}

impl UsersAction {
    /// Validate the input and assign a fresh id.
    pub fn add_user(input: NewUser) -> Result<Self, ValidationError> {
        input.validate()?;
        Ok(Self::AddUser(input.into_user(new_id())))
    }

    pub fn update_user(id: impl Into<String>, patch: UserPatch) -> Result<Self, ValidationError> {
        patch.validate()?;
        Ok(Self::UpdateUser {
            id: id.into(),
            patch,
        })
    }
}

impl UsersState {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: NormalizedCollection::from_vec(users),
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn reduce(&mut self, action: UsersAction) -> bool {
        match action {
            UsersAction::AddUser(user) => {
                self.users.insert_front(user);
                true
            }
            UsersAction::UpdateUser { id, patch } => {
                self.users.update(&id, |u| patch.apply(u))
            }
            UsersAction::DeleteUser { id } => self.users.remove(&id).is_some(),
            UsersAction::ReplaceAll(state) => {
                *self = state;
                true
            }
        }
    }
}
