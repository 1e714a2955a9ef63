//! accountd server binary

use accountd::server::{AccountServer, DEFAULT_PORT};
use accountd::userstore::r#impl::SQLiteUserStore;
use futures::prelude::*;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let data_dir = PathBuf::from("./data");
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("users.db");

    log::info!("opening user store at {}", db_path.display());
    let user_store = Arc::new(SQLiteUserStore::new(&db_path).await?);

    let server = AccountServer::with_store(user_store);
    let shutdown = server.shutdown_handle();

    // Set up signal handling for graceful shutdown
    let signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;
    let handle = signals.handle();

    tokio::spawn(async move {
        let mut signals = signals.fuse();
        if let Some(signal) = signals.next().await {
            let signal_name = match signal {
                SIGTERM => "SIGTERM",
                SIGINT => "SIGINT",
                SIGHUP => "SIGHUP",
                _ => "unknown signal",
            };
            log::info!("received {}, initiating graceful shutdown", signal_name);
            shutdown.notify_one();
        }
    });

    let addr = format!("127.0.0.1:{}", DEFAULT_PORT);
    server.listen(&addr).await?;

    handle.close();
    log::info!("server stopped");
    Ok(())
}
