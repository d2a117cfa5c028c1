use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Manager,
    Worker,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Manager => "MANAGER",
            Role::Worker => "WORKER",
            Role::Admin => "ADMIN",
        }
    }

    /// Case-insensitive, since gateways are not consistent about it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "MANAGER" => Some(Role::Manager),
            "WORKER" => Some(Role::Worker),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated principal performing an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
