use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{Method, header},
    response::{Html, IntoResponse},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    graphql,
    infra::errors::{AppError, AppResult},
};

pub const GRAPHQL_PATH: &str = "/graphql";

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    request: Result<Json<async_graphql::Request>, JsonRejection>,
) -> AppResult<Json<async_graphql::Response>> {
    let Json(request) = request?;
    let response =
        graphql::execute(&state.schema, state.request_loaders(), request).await;
    Ok(Json(response))
}

async fn graphiql() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint(GRAPHQL_PATH)
            .finish(),
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}
