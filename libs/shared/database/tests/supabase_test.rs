use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::StoreError;

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_select_sends_api_key_and_decodes_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", "eq.42"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 42 }])))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let rows: Vec<Value> = client.select("doctors", "id=eq.42").await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], 42);
}

#[tokio::test]
async fn test_conflict_status_maps_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reserve_slot"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "slot already booked"
        })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result: Result<Value, StoreError> = client.rpc("reserve_slot", json!({})).await;

    assert_matches!(result, Err(StoreError::Conflict(msg)) if msg.contains("23505"));
}

#[tokio::test]
async fn test_server_error_maps_to_backend() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result: Result<Vec<Value>, StoreError> = client.select("appointments", "select=*").await;

    assert_matches!(result, Err(StoreError::Backend(_)));
}

#[tokio::test]
async fn test_empty_rpc_response_decodes_as_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/release_slot"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&config_for(&mock_server));
    let result: Value = client.rpc("release_slot", json!({})).await.unwrap();

    assert!(result.is_null());
}

#[tokio::test]
async fn test_slow_response_times_out_as_backend_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = AppConfig {
        storage_timeout_seconds: 1,
        ..config_for(&mock_server)
    };
    let client = SupabaseClient::new(&config);
    let result: Result<Vec<Value>, StoreError> = client.select("doctors", "select=id").await;

    assert_matches!(result, Err(StoreError::Backend(reason)) if reason.contains("timed out"));
}
