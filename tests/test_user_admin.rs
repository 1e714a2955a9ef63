//! Integration tests for user listing, lookup, update and deletion

use accountd::protocol::{decode_object_array, decode_user, is_success};
use accountd::server::AccountServer;
use accountd::userstore::r#impl::SQLiteUserStore;
use accountd::AccountClient;
use std::sync::Arc;
use tempfile::TempDir;

/// Set up a test server and return the temp directory and address
async fn setup_test_server() -> (TempDir, String) {
    let tmp_dir = TempDir::new().unwrap();
    let db_path = tmp_dir.path().join("users.db");

    let user_store = Arc::new(SQLiteUserStore::new(&db_path).await.unwrap());
    let server = AccountServer::with_store(user_store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        if let Err(e) = server.listen_on(listener).await {
            eprintln!("server error: {}", e);
        }
    });

    (tmp_dir, addr)
}

#[tokio::test]
async fn test_get_user_by_username_returns_full_record() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "a@x.com").await.unwrap();

    let response = client.get_user_by_username("alice").await.unwrap();
    assert!(is_success(&response));

    let user = decode_user(&response);
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "a@x.com");
    assert!(user.id > 0);
    assert!(!user.created_at.is_empty());
    // The stored salt:hash record travels with the full user object.
    let (salt, hash) = user.password.split_once(':').unwrap();
    assert!(!salt.is_empty());
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_get_user_requires_username() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    let response = client
        .send(r#"{"action":"getUserByUsername"}"#)
        .await
        .unwrap();
    assert!(!is_success(&response));
    assert!(response.contains("username required"));
}

#[tokio::test]
async fn test_user_list_most_recent_first() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    for name in ["first", "second", "third"] {
        let response = client.register(name, "pw", "").await.unwrap();
        assert!(is_success(&response));
    }

    let response = client.get_user_list().await.unwrap();
    let names: Vec<String> = decode_object_array(&response)
        .iter()
        .map(|obj| decode_user(obj).username)
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_delete_idempotence() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "").await.unwrap();

    let response = client.delete_user("alice").await.unwrap();
    assert!(is_success(&response));

    let response = client.delete_user("alice").await.unwrap();
    assert!(!is_success(&response));
    assert!(response.contains("delete failed"));
}

#[tokio::test]
async fn test_delete_by_id() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "").await.unwrap();

    let response = client.get_user_by_username("alice").await.unwrap();
    let id = decode_user(&response).id;
    assert!(id > 0);

    let response = client.delete_user_by_id(id).await.unwrap();
    assert!(is_success(&response));

    let response = client.get_user_by_username("alice").await.unwrap();
    assert!(response.contains("user not found"));
}

#[tokio::test]
async fn test_delete_requires_identifier() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    let response = client.send(r#"{"action":"deleteUser"}"#).await.unwrap();
    assert!(!is_success(&response));
    assert!(response.contains("must provide username or id"));

    let response = client
        .send(r#"{"action":"deleteUser","data":{"userId":"not-a-number"}}"#)
        .await
        .unwrap();
    assert!(response.contains("invalid user id"));
}

#[tokio::test]
async fn test_update_email_keeps_password() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "old@x.com").await.unwrap();
    let before = client.get_user_by_username("alice").await.unwrap();
    let record_before = decode_user(&before).password;

    let response = client
        .update_user("alice", None, Some("new@x.com"))
        .await
        .unwrap();
    assert!(is_success(&response));

    let after = client.get_user_by_username("alice").await.unwrap();
    let user = decode_user(&after);
    assert_eq!(user.email, "new@x.com");
    assert_eq!(user.password, record_before);

    // The untouched password still logs in.
    let response = client.login("alice", "pw1").await.unwrap();
    assert!(is_success(&response));
}

#[tokio::test]
async fn test_update_password() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "a@x.com").await.unwrap();

    let response = client.update_user("alice", Some("pw2"), None).await.unwrap();
    assert!(is_success(&response));

    let response = client.login("alice", "pw1").await.unwrap();
    assert!(!is_success(&response));

    let response = client.login("alice", "pw2").await.unwrap();
    assert!(is_success(&response));

    // The email was not part of the update.
    let response = client.get_user_by_username("alice").await.unwrap();
    assert_eq!(decode_user(&response).email, "a@x.com");
}

#[tokio::test]
async fn test_update_validation() {
    let (_tmp_dir, addr) = setup_test_server().await;
    let mut client = AccountClient::connect(&addr).await.unwrap();

    client.register("alice", "pw1", "").await.unwrap();

    let response = client.update_user("alice", None, None).await.unwrap();
    assert!(!is_success(&response));
    assert!(response.contains("no fields to update"));

    let response = client.send(r#"{"action":"updateUser"}"#).await.unwrap();
    assert!(response.contains("username required"));

    let response = client
        .update_user("ghost", None, Some("g@x.com"))
        .await
        .unwrap();
    assert!(!is_success(&response));
    assert!(response.contains("update failed"));
}
