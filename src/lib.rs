//! accountd - a TCP account-management service
//!
//! This library provides the building blocks of a small client/server
//! account service: a line-delimited wire codec, a SQLite-backed user
//! store with salted password hashing, a request dispatcher, and the TCP
//! server and client that tie them together.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod password;
pub mod protocol;
pub mod server;
pub mod types;
pub mod userstore;

pub use client::AccountClient;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use server::AccountServer;
pub use types::*;
pub use userstore::UserStore;
