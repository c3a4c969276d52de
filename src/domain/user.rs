use super::ids::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

/// The identity an operation runs on behalf of, as asserted by the
/// authentication layer. Every engine operation takes one explicitly.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Profile data the engine needs about a registered user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    pub role: Role,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            phone: None,
            room: None,
            role,
        }
    }

    pub fn with_contact(mut self, phone: impl Into<String>, room: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self.room = Some(room.into());
        self
    }

    pub fn contact(&self) -> ContactSnapshot {
        ContactSnapshot {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            room: self.room.clone(),
        }
    }
}

/// Contact fields copied onto a rental at checkout. Later profile edits do
/// not reach it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ContactSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub room: Option<String>,
}

/// Editable contact fields of a profile.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub room: Option<String>,
}

impl UserProfile {
    pub fn apply_contact(&mut self, update: ContactUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.room.is_some() {
            self.room = update.room;
        }
    }
}
