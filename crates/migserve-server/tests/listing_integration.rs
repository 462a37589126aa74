use std::net::SocketAddr;

use migserve_common::LocationField;
use migserve_config::ServerConfig;
use migserve_server::ListingServer;
use serde_json::Value;

const EXPECTED: [(&str, &str, &str); 5] = [
    ("001", "Initial schema", "migrations/001_initial_schema.sql"),
    ("002", "Add users table", "migrations/002_add_users_table.sql"),
    ("003", "Add products table", "migrations/003_add_products_table.sql"),
    ("004", "Create indexes", "migrations/004_create_indexes.sql"),
    ("005", "Seed data", "migrations/005_seed_data.sql"),
];

/// Build a config listening on an OS-assigned loopback port.
fn test_config(location_field: LocationField) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        location_field,
        ..ServerConfig::default()
    }
}

/// Start the listing service in the background and return its address.
async fn start_test_server(config: ServerConfig) -> SocketAddr {
    let bound = ListingServer::new(config)
        .bind()
        .await
        .expect("bind listing server");
    let addr = bound.local_addr();
    tokio::spawn(async move {
        let _ = bound.serve().await;
    });
    addr
}

fn assert_listing(body: &Value, location_key: &str) {
    let items = body.as_array().expect("body is a JSON array");
    assert_eq!(items.len(), 5);

    for (item, (id, name, location)) in items.iter().zip(EXPECTED) {
        let obj = item.as_object().expect("each item is an object");
        assert_eq!(obj.len(), 3, "unexpected fields in {obj:?}");
        assert_eq!(obj["id"], id);
        assert_eq!(obj["name"], name);
        assert_eq!(obj[location_key], location);
    }
}

#[tokio::test]
async fn root_returns_accepted_with_json_listing() {
    let addr = start_test_server(test_config(LocationField::File)).await;

    let resp = reqwest::get(format!("http://{addr}/"))
        .await
        .expect("listing request failed");

    assert_eq!(resp.status().as_u16(), 202);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        "application/json"
    );
    let body: Value = resp.json().await.unwrap();
    assert_listing(&body, "file");
}

#[tokio::test]
async fn url_variant_serves_url_field() {
    let addr = start_test_server(test_config(LocationField::Url)).await;

    let body: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_listing(&body, "url");
}

#[tokio::test]
async fn any_method_and_body_gets_same_listing() {
    let addr = start_test_server(test_config(LocationField::File)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/?limit=1"))
        .body(r#"{"id":"999"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_listing(&body, "file");
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let addr = start_test_server(test_config(LocationField::File)).await;
    let client = reqwest::Client::new();

    let first = client
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    for _ in 0..5 {
        let next = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(first, next);
    }
}

#[tokio::test]
async fn second_instance_on_bound_port_fails() {
    let addr = start_test_server(test_config(LocationField::File)).await;

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        ..ServerConfig::default()
    };
    let err = ListingServer::new(config)
        .bind()
        .await
        .err()
        .expect("second bind should fail");
    assert!(err.to_string().contains("failed to bind"));
}

#[tokio::test]
async fn shutdown_signal_stops_server_and_releases_port() {
    let bound = ListingServer::new(test_config(LocationField::File))
        .bind()
        .await
        .expect("bind listing server");
    let addr = bound.local_addr();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(bound.serve_with_shutdown(async move {
        let _ = stop_rx.await;
    }));

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 202);
    drop(resp);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("server did not stop after shutdown signal")
        .expect("server task panicked");
    assert!(result.is_ok());

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
