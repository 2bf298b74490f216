use crate::types::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn salesperson(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, Role::Salesperson)
    }

    pub fn manager(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, Role::Manager)
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Whether a record owned by `owner` is visible to this user.
    pub fn sees(&self, owner: &str) -> bool {
        self.role.sees_everything() || self.name == owner
    }
}
