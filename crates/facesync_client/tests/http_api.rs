use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use facesync_client::{FaceClientError, FaceOps, HttpFaceClient, RemoteEndpoint};
use facesync_contract::OperationStatus;
use serde_json::{json, Value};

const TEST_KEY: &str = "test-key";

async fn spawn_service(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock");
    });
    addr
}

fn client_for(addr: SocketAddr) -> HttpFaceClient {
    let endpoint =
        RemoteEndpoint::new(&format!("http://{addr}"), TEST_KEY).expect("endpoint");
    HttpFaceClient::new(endpoint).expect("client")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("Ocp-Apim-Subscription-Key")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == TEST_KEY)
        .unwrap_or(false)
}

async fn list_groups(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "Unauthorized", "message": "invalid subscription key"}})),
        )
            .into_response();
    }
    Json(json!([
        {"personGroupId": "crew", "name": "Crew", "userData": "fixtures"},
        {"personGroupId": "visitors", "name": "Visitors"}
    ]))
    .into_response()
}

async fn delete_group(Path(group_id): Path<String>) -> impl IntoResponse {
    if group_id == "crew" {
        StatusCode::OK.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "PersonGroupNotFound", "message": "group missing"}})),
        )
            .into_response()
    }
}

async fn take_snapshot(Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(body["type"], "PersonGroup");
    assert_eq!(body["objectId"], "crew");
    assert!(body["applyScope"].is_array());
    (
        StatusCode::ACCEPTED,
        [("operation-location", "/operations/snapshot-take-1")],
        (),
    )
        .into_response()
}

async fn take_snapshot_headerless() -> impl IntoResponse {
    StatusCode::ACCEPTED
}

async fn operation_status(Path(operation_id): Path<String>) -> impl IntoResponse {
    assert_eq!(operation_id, "snapshot-take-1");
    // The snapshot operations endpoint answers with PascalCase keys.
    Json(json!({
        "Status": "Succeeded",
        "CreatedTime": "2019-05-07T18:42:54.9835478Z",
        "LastActionTime": "2019-05-07T18:42:58.0682132Z",
        "ResourceLocation": "/snapshots/abc-123",
        "Message": null
    }))
}

async fn throttled() -> impl IntoResponse {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({"error": {"code": "RateLimitExceeded", "message": "slow down"}})),
    )
}

#[tokio::test]
async fn lists_person_groups_with_subscription_key() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/persongroups", get(list_groups)),
    )
    .await;

    let groups = client_for(addr).list_person_groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].person_group_id, "crew");
    assert_eq!(groups[0].user_data.as_deref(), Some("fixtures"));
    assert_eq!(groups[1].user_data, None);
}

#[tokio::test]
async fn wrong_subscription_key_surfaces_service_error() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/persongroups", get(list_groups)),
    )
    .await;

    let endpoint = RemoteEndpoint::new(&format!("http://{addr}"), "wrong-key").unwrap();
    let client = HttpFaceClient::new(endpoint).unwrap();
    let err = client.list_person_groups().await.unwrap_err();
    match err {
        FaceClientError::Service { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "Unauthorized");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_of_missing_group_maps_to_not_found() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/persongroups/{group_id}", delete(delete_group)),
    )
    .await;

    let client = client_for(addr);
    client.delete_person_group("crew").await.unwrap();
    let err = client.delete_person_group("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn take_snapshot_extracts_operation_id_from_header() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/snapshots", post(take_snapshot)),
    )
    .await;

    let operation_id = client_for(addr)
        .take_snapshot("crew", &["sub-a".to_string(), "sub-b".to_string()])
        .await
        .unwrap();
    assert_eq!(operation_id, "snapshot-take-1");
}

#[tokio::test]
async fn take_without_operation_location_fails_before_polling() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/snapshots", post(take_snapshot_headerless)),
    )
    .await;

    let err = client_for(addr)
        .take_snapshot("crew", &["sub-a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, FaceClientError::MissingOperationLocation));
}

#[tokio::test]
async fn operation_status_parses_pascal_case_wire_body() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/operations/{operation_id}", get(operation_status)),
    )
    .await;

    let report = client_for(addr)
        .operation_status("snapshot-take-1")
        .await
        .unwrap();
    assert_eq!(report.operation_id, "snapshot-take-1");
    assert_eq!(report.status, OperationStatus::Succeeded);
    assert_eq!(report.resource_location.as_deref(), Some("/snapshots/abc-123"));
    assert!(report.message.is_none());
    assert!(report.created_time.is_some());
}

#[tokio::test]
async fn service_error_body_is_decoded() {
    let addr = spawn_service(
        Router::new().route("/face/v1.0/detect", post(throttled)),
    )
    .await;

    let err = client_for(addr)
        .detect_faces("https://example.com/photo.jpg")
        .await
        .unwrap_err();
    match err {
        FaceClientError::Service {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 429);
            assert_eq!(code, "RateLimitExceeded");
            assert_eq!(message, "slow down");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}
