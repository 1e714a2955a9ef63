//! Core types used throughout the account service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Username
pub type Username = String;

/// A stored user account.
///
/// `password_record` holds `salt:hash` — never the plaintext password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Username,
    pub password_record: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request action parsed from client input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    Login,
    GetUserList,
    DeleteUser,
    GetUserByUsername,
    UpdateUser,
    Unknown,
}

impl Action {
    /// The action name as it appears on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Login => "login",
            Action::GetUserList => "getUserList",
            Action::DeleteUser => "deleteUser",
            Action::GetUserByUsername => "getUserByUsername",
            Action::UpdateUser => "updateUser",
            Action::Unknown => "unknown",
        }
    }
}

/// A decoded request: an action plus whichever named fields were present.
///
/// Fields the decoder did not find are simply absent; validation of
/// required fields happens per action in the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    pub action: Action,
    pub fields: HashMap<String, String>,
}

impl Request {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    /// The field value, unless it is absent or blank.
    pub fn non_empty_field(&self, key: &str) -> Option<&str> {
        self.field(key).filter(|v| !v.trim().is_empty())
    }
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

/// Payload attached to a response.
#[derive(Debug, Clone)]
pub enum Data {
    /// Full account object, stored password record included.
    Account(User),
    /// Ordered list of full account objects.
    AccountList(Vec<User>),
    /// id, username and email only (login).
    Profile(User),
}

/// Response sent back to the client.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub message: Option<String>,
    pub data: Option<Data>,
}

impl Response {
    /// Success with no message (list and detail responses).
    pub fn ok() -> Self {
        Self {
            status: Status::Success,
            message: None,
            data: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// A user object as decoded from a response line.
///
/// Fields missing on the wire decode to their defaults, so the same type
/// covers both full account objects and the shorter login profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub created_at: String,
}
