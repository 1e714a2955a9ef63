//! Socket client for the account service.
//!
//! Connects to a running server and exposes one method per action. Each
//! method returns the raw response line; the codec helpers in
//! [`crate::protocol`] pick it apart.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::encode_request;
use crate::types::Action;

/// Client side of one persistent connection to the server.
pub struct AccountClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl AccountClient {
    /// Connect to a server.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one request line and read the response line.
    pub async fn send(&mut self, line: &str) -> Result<String> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.flush().await?;

        let mut response = String::new();
        let bytes = self.reader.read_line(&mut response).await?;
        if bytes == 0 {
            return Err(Error::Protocol(
                "server closed the connection".to_string(),
            ));
        }

        Ok(response.trim_end_matches(['\r', '\n']).to_string())
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<String> {
        let request = encode_request(
            Action::Register,
            &[
                ("username", username),
                ("password", password),
                ("email", email),
            ],
        );
        self.send(&request).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let request = encode_request(
            Action::Login,
            &[("username", username), ("password", password)],
        );
        self.send(&request).await
    }

    pub async fn get_user_list(&mut self) -> Result<String> {
        self.send(&encode_request(Action::GetUserList, &[])).await
    }

    pub async fn delete_user(&mut self, username: &str) -> Result<String> {
        self.send(&encode_request(Action::DeleteUser, &[("username", username)]))
            .await
    }

    pub async fn delete_user_by_id(&mut self, id: i64) -> Result<String> {
        let id = id.to_string();
        self.send(&encode_request(Action::DeleteUser, &[("userId", &id)]))
            .await
    }

    pub async fn get_user_by_username(&mut self, username: &str) -> Result<String> {
        self.send(&encode_request(
            Action::GetUserByUsername,
            &[("username", username)],
        ))
        .await
    }

    /// Update password and/or email; blank fields are left out of the
    /// request entirely.
    pub async fn update_user(
        &mut self,
        username: &str,
        new_password: Option<&str>,
        new_email: Option<&str>,
    ) -> Result<String> {
        let mut fields = vec![("username", username)];
        if let Some(password) = new_password {
            if !password.trim().is_empty() {
                fields.push(("password", password));
            }
        }
        if let Some(email) = new_email {
            if !email.trim().is_empty() {
                fields.push(("email", email));
            }
        }
        self.send(&encode_request(Action::UpdateUser, &fields)).await
    }
}
