//! UserStore trait and implementations
//!
//! The UserStore is responsible for persisting user accounts and verifying
//! credentials.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::*;

pub mod r#impl;

/// Trait for storing user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user with a freshly salted password record.
    async fn register(&self, username: &str, password: &str, email: Option<&str>) -> Result<()>;

    /// Verify credentials and return the matching user.
    async fn login(&self, username: &str, password: &str) -> Result<User>;

    /// Update password and/or email. At least one field must be provided;
    /// omitted fields are left untouched.
    async fn update_info(
        &self,
        username: &str,
        new_password: Option<&str>,
        new_email: Option<&str>,
    ) -> Result<()>;

    /// List all users, most recently created first.
    async fn get_all(&self) -> Result<Vec<User>>;

    /// Look up a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Delete a user by username.
    async fn delete_by_username(&self, username: &str) -> Result<()>;

    /// Delete a user by id.
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}
