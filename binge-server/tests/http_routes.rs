use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use binge_server::routes::create_router;
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::Fixture;

async fn router() -> Router {
    create_router(Fixture::new().await.state())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_graphql(body: impl Into<Body>) -> Request<Body> {
    Request::post("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = router()
        .await
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn graphql_post_executes_queries() {
    let request = json!({ "query": "{ watchThroughs { id } }" }).to_string();
    let response = router().await.oneshot(post_graphql(request)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "watchThroughs": [] } })
    );
}

#[tokio::test]
async fn graphql_errors_are_reported_in_the_response() {
    let request = json!({
        "query": "query($id: ID!) { watch(id: $id) { id } }",
        "variables": { "id": "not-a-gid" },
    })
    .to_string();
    let response = router().await.oneshot(post_graphql(request)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], json!({ "watch": null }));
    assert_eq!(body["errors"][0]["extensions"]["code"], "BAD_GLOBAL_ID");
}

#[tokio::test]
async fn malformed_request_bodies_use_the_error_envelope() {
    let response = router()
        .await
        .oneshot(post_graphql("{ not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["status"], 400);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn graphiql_is_served_on_get() {
    let response = router()
        .await
        .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("/graphql"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let response = router()
        .await
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "error": { "message": "Route not found", "status": 404 } })
    );
}
