//! TCP server for the account service.
//!
//! Accepts connections and serves each one with a half-duplex
//! read/decode/dispatch/encode/write loop. Concurrency is bounded by a
//! pool of connection permits; excess connections wait in the listen
//! backlog until a worker frees up.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, Semaphore};

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::protocol::{decode_request, encode_response};
use crate::userstore::UserStore;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8888;

/// Maximum number of concurrently served connections.
pub const MAX_CLIENTS: usize = 10;

/// Account server with a bounded connection pool
pub struct AccountServer {
    dispatcher: Arc<Dispatcher>,
    connection_limit: Arc<Semaphore>,
    shutdown: Arc<Notify>,
}

impl AccountServer {
    /// Create a new server around the given user store
    pub fn new<U>(user_store: U) -> Self
    where
        U: UserStore + 'static,
    {
        Self::with_store(Arc::new(user_store))
    }

    /// Create a new server around an already shared user store
    pub fn with_store(user_store: Arc<dyn UserStore>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(user_store)),
            connection_limit: Arc::new(Semaphore::new(MAX_CLIENTS)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle used to request a graceful shutdown from another task.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Start the server on the specified address
    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("account server listening on {}", addr);
        self.listen_on(listener).await
    }

    /// Listen on an existing TcpListener (useful for testing)
    ///
    /// Accepts until a shutdown is requested, then drops the listener and
    /// waits for in-flight connections to drain.
    pub async fn listen_on(&self, listener: TcpListener) -> Result<()> {
        loop {
            // Take a worker slot before accepting, so excess connections
            // queue in the backlog instead of being turned away.
            let permit = tokio::select! {
                permit = Arc::clone(&self.connection_limit).acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                _ = self.shutdown.notified() => break,
            };

            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            log::error!("failed to accept connection: {}", e);
                            continue;
                        }
                    }
                }
                _ = self.shutdown.notified() => break,
            };

            log::debug!("new connection from {}", peer_addr);
            let dispatcher = Arc::clone(&self.dispatcher);

            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, dispatcher).await {
                    log::debug!("connection from {} ended with error: {}", peer_addr, e);
                }
                drop(permit);
            });
        }

        drop(listener);
        log::info!("no longer accepting connections, draining workers");

        // Every permit back means every worker has finished its loop.
        let _ = self
            .connection_limit
            .acquire_many(MAX_CLIENTS as u32)
            .await;
        log::info!("shutdown complete");

        Ok(())
    }
}

/// Serve one client connection until EOF or an I/O error.
///
/// One request at a time: read a line, dispatch it, write the response,
/// repeat. Request lines are not logged because they carry plaintext
/// passwords; only the decoded action is.
async fn serve_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            log::debug!("connection closed by client");
            return Ok(());
        }

        let request = decode_request(line.trim_end_matches(['\r', '\n']));
        log::debug!("request action: {:?}", request.action);

        let response = dispatcher.dispatch(&request).await;
        writer.write_all(encode_response(&response).as_bytes()).await?;
        writer.flush().await?;
    }
}
