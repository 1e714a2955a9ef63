//! SQLite-based user store implementation

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::password;
use crate::types::User;
use crate::userstore::UserStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    email TEXT,
    created_at TEXT NOT NULL
)";

/// SQLite-backed user store.
///
/// A single connection is owned behind a mutex and every operation locks
/// it inside `spawn_blocking`, so database access is serialized across
/// workers rather than shared mutably.
pub struct SQLiteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SQLiteUserStore {
    /// Open (or create) a user store at the given path.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(SCHEMA, [])?;
            Ok::<_, Error>(conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("store task failed: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory user store for testing.
    pub async fn in_memory() -> Result<Self> {
        let conn = tokio::task::spawn_blocking(|| {
            let conn = Connection::open_in_memory()?;
            conn.execute(SCHEMA, [])?;
            Ok::<_, Error>(conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("store task failed: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Internal("store mutex poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::Internal(format!("store task failed: {}", e)))?
    }
}

fn build_user(
    id: i64,
    username: String,
    password_record: String,
    email: Option<String>,
    created_at: String,
) -> Result<User> {
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(User {
        id,
        username,
        password_record,
        email,
        created_at,
    })
}

#[async_trait]
impl UserStore for SQLiteUserStore {
    async fn register(&self, username: &str, password: &str, email: Option<&str>) -> Result<()> {
        let username = username.to_string();
        let record = password::seal(password);
        let email = email.map(|e| e.to_string());

        self.with_conn(move |conn| {
            let created_at = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO users (username, password, email, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![username, record, email, created_at],
            )
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    Error::AlreadyExists(format!("username already exists: {}", username))
                } else {
                    Error::from(e)
                }
            })?;

            Ok(())
        })
        .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user not found: {}", username)))?;

        // A malformed stored record propagates as an error here, never as
        // a match.
        if password::verify(password, &user.password_record)? {
            Ok(user)
        } else {
            Err(Error::AuthenticationFailed(format!(
                "bad credentials for {}",
                username
            )))
        }
    }

    async fn update_info(
        &self,
        username: &str,
        new_password: Option<&str>,
        new_email: Option<&str>,
    ) -> Result<()> {
        // A password update gets a fresh salt, never the old one.
        let record = match new_password {
            Some(p) if !p.is_empty() => Some(password::seal(p)),
            _ => None,
        };
        let email = match new_email {
            Some(e) if !e.is_empty() => Some(e.to_string()),
            _ => None,
        };

        if record.is_none() && email.is_none() {
            return Err(Error::InvalidRequest("no fields to update".to_string()));
        }

        let username = username.to_string();
        self.with_conn(move |conn| {
            let mut assignments = Vec::new();
            let mut values: Vec<String> = Vec::new();

            if let Some(record) = record {
                assignments.push("password = ?");
                values.push(record);
            }
            if let Some(email) = email {
                assignments.push("email = ?");
                values.push(email);
            }
            values.push(username.clone());

            let sql = format!(
                "UPDATE users SET {} WHERE username = ?",
                assignments.join(", ")
            );
            let affected = conn.execute(&sql, params_from_iter(values.iter()))?;

            if affected == 0 {
                return Err(Error::NotFound(format!("user not found: {}", username)));
            }

            Ok(())
        })
        .await
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, email, created_at FROM users
                 ORDER BY created_at DESC, id DESC",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut users = Vec::new();
            for row in rows {
                let (id, username, record, email, created_at) = row?;
                users.push(build_user(id, username, record, email, created_at)?);
            }

            Ok(users)
        })
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, email, created_at FROM users WHERE username = ?1",
            )?;

            let mut rows = stmt.query(params![username])?;

            if let Some(row) = rows.next()? {
                let id: i64 = row.get(0)?;
                let username: String = row.get(1)?;
                let record: String = row.get(2)?;
                let email: Option<String> = row.get(3)?;
                let created_at: String = row.get(4)?;

                Ok(Some(build_user(id, username, record, email, created_at)?))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn delete_by_username(&self, username: &str) -> Result<()> {
        let username = username.to_string();

        self.with_conn(move |conn| {
            let affected =
                conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;

            if affected == 0 {
                return Err(Error::NotFound(format!("user not found: {}", username)));
            }

            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;

            if affected == 0 {
                return Err(Error::NotFound(format!("user id not found: {}", id)));
            }

            Ok(())
        })
        .await
    }
}
