// HTTP-level tests for the panel API, driving the axum router directly
// with tower's oneshot.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use plemiona_backend::api::{router, AppState};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn test_villages() -> Value {
    json!([
        {
            "villageId": "10001",
            "villageName": "0001",
            "coordinates": "512|489",
            "spearAvailable": 250,
            "swordAvailable": 300
        },
        {
            "villageId": "10002",
            "villageName": "0002",
            "coordinates": "513|490",
            "spearAvailable": 1000,
            "swordAvailable": 1000
        }
    ])
}

#[tokio::test]
async fn test_health() {
    let app = router(AppState::new());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "plemiona-backend");
}

#[tokio::test]
async fn test_metrics_endpoint_responds() {
    let app = router(AppState::new());
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_plan_with_inline_villages() {
    let app = router(AppState::new());
    let response = app
        .oneshot(post_json(
            "/api/support/plan",
            json!({
                "villages": test_villages(),
                "packageCount": 7,
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["availablePackages"], 7);

    let allocation = &body["allocation"];
    assert_eq!(allocation["isValid"], true);
    assert_eq!(allocation["totalPackagesAllocated"], 7);
    assert_eq!(allocation["missingPackages"], 0);
    assert_eq!(allocation["totalSpear"], 700);
    assert_eq!(allocation["totalSword"], 700);

    let lines = allocation["allocations"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["villageName"], "0001");
    assert_eq!(lines[0]["packagesFromVillage"], 2);
    assert_eq!(lines[0]["spearToSend"], 200);
    assert_eq!(lines[1]["villageName"], "0002");
    assert_eq!(lines[1]["packagesFromVillage"], 5);
    assert_eq!(lines[1]["swordToSend"], 500);
}

#[tokio::test]
async fn test_plan_reports_shortfall() {
    let app = router(AppState::new());
    let response = app
        .oneshot(post_json(
            "/api/support/plan",
            json!({
                "villages": test_villages(),
                "packageCount": 10,
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["allocation"]["isValid"], false);
    assert_eq!(body["allocation"]["totalPackagesAllocated"], 7);
    assert_eq!(body["allocation"]["missingPackages"], 3);
}

#[tokio::test]
async fn test_plan_requires_villages_or_server_id() {
    let app = router(AppState::new());
    let response = app
        .oneshot(post_json(
            "/api/support/plan",
            json!({
                "packageCount": 5,
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_from_stored_snapshot() {
    let state = AppState::new();

    // Unknown server: no snapshot yet.
    let response = router(state.clone())
        .oneshot(post_json(
            "/api/support/plan",
            json!({
                "serverId": 9,
                "packageCount": 3,
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Crawler uploads a snapshot.
    let response = router(state.clone())
        .oneshot(put_json("/api/servers/9/village-units", test_villages()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["serverId"], 9);
    assert_eq!(body["villageCount"], 2);

    // Planning against the snapshot now works.
    let response = router(state)
        .oneshot(post_json(
            "/api/support/plan",
            json!({
                "serverId": 9,
                "packageCount": 3,
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allocation"]["isValid"], true);
    assert_eq!(body["allocation"]["totalPackagesAllocated"], 3);
}

#[tokio::test]
async fn test_capacity_endpoint() {
    let app = router(AppState::new());
    let response = app
        .oneshot(post_json(
            "/api/support/capacity",
            json!({
                "villages": test_villages(),
                "packageSize": 100,
                "maxUnitsPerVillage": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["availablePackages"], 7);
}

#[tokio::test]
async fn test_send_and_crawler_pickup() {
    let state = AppState::new();

    let send_body = json!({
        "serverId": 1,
        "targetVillageId": "30707",
        "allocations": [
            {
                "villageName": "0001",
                "villageId": "10001",
                "coordinates": "512|489",
                "packagesFromVillage": 2,
                "spearToSend": 200,
                "swordToSend": 200
            },
            {
                "villageName": "0002",
                "villageId": "10002",
                "coordinates": "513|490",
                "packagesFromVillage": 5,
                "spearToSend": 500,
                "swordToSend": 500
            }
        ],
        "totalPackages": 7,
        "packageSize": 100
    });

    let response = router(state.clone())
        .oneshot(post_json("/api/support/send", send_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["dispatchedCount"], 2);
    assert_eq!(body["queueDepth"], 1);

    // Queue status reflects the pending command.
    let response = router(state.clone())
        .oneshot(get("/api/support/queue"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["depth"], 1);
    assert_eq!(body["pendingPackages"], 7);

    // Crawler claims the command.
    let response = router(state.clone())
        .oneshot(post_json("/api/support/queue/next", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let command = body_json(response).await;
    assert_eq!(command["serverId"], 1);
    assert_eq!(command["targetVillageId"], 30707);
    assert_eq!(command["totalPackages"], 7);
    assert_eq!(command["allocations"].as_array().unwrap().len(), 2);

    // Queue drained.
    let response = router(state)
        .oneshot(post_json("/api/support/queue/next", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_send_rejects_invalid_target() {
    let state = AppState::new();

    let response = router(state.clone())
        .oneshot(post_json(
            "/api/support/send",
            json!({
                "serverId": 1,
                "targetVillageId": "abc",
                "allocations": [
                    {
                        "villageName": "0001",
                        "villageId": "10001",
                        "coordinates": "512|489",
                        "packagesFromVillage": 1,
                        "spearToSend": 100,
                        "swordToSend": 100
                    }
                ],
                "totalPackages": 1,
                "packageSize": 100
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid target village id");

    // Nothing was queued.
    let response = router(state)
        .oneshot(get("/api/support/queue"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["depth"], 0);
}

#[tokio::test]
async fn test_snapshot_lifecycle() {
    let state = AppState::new();

    let response = router(state.clone())
        .oneshot(get("/api/servers/5/village-units"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router(state.clone())
        .oneshot(put_json("/api/servers/5/village-units", test_villages()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router(state.clone())
        .oneshot(get("/api/servers/5/village-units"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["serverId"], 5);
    assert_eq!(body["villages"].as_array().unwrap().len(), 2);
    assert_eq!(body["villages"][0]["villageName"], "0001");

    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/servers/5/village-units")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router(state)
        .oneshot(get("/api/servers/5/village-units"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
