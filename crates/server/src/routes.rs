//! Route handlers.
//!
//! Every handler answers `{"status": "success", ...}` or an [`ApiError`].
//! Chapter numbers that could not be determined are reported as `"Unknown"`.

use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use pagewalk_core::{ClearScope, Direction, Engine};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub url: String,
    /// Expected fragment, e.g. `chapter12`; blank means none.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub current_url: String,
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub url: String,
    #[serde(default)]
    pub max_chapters: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryQuery {
    #[serde(default)]
    pub scope: ClearScope,
}

/// Routes without middleware, over a shared engine.
pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/detect", post(detect))
        .route("/check-lock", post(check_lock))
        .route("/navigate", post(navigate))
        .route("/queue", post(enqueue))
        .route("/book", post(book))
        .route("/memory", get(inspect_memory).delete(clear_memory))
        .with_state(engine)
}

/// [`router`] with tracing, CORS and a per-request timeout.
pub fn app(engine: Engine, request_timeout: Duration) -> Router {
    router(engine)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn chapter_value(chapter: Option<u64>) -> Value {
    chapter.map_or_else(|| json!("Unknown"), |n| json!(n))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "success", "version": env!("CARGO_PKG_VERSION") }))
}

async fn extract(State(engine): State<Engine>, payload: Result<Json<UrlRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;

    let result = engine.extract(&request.url).await;
    if let Some(err) = result.to_error() {
        return Err(err.into());
    }

    tracing::info!(url = %result.url, method = %result.method, "extracted");
    Ok(Json(json!({
        "status": "success",
        "content": result.text,
        "final_url": result.url,
        "title": result.title,
        "meta_description": result.meta_description,
        "method": result.method,
    })))
}

async fn detect(State(engine): State<Engine>, payload: Result<Json<DetectRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;
    let info = engine.detect_chapter(&request.url, request.pattern.as_deref()).await?;

    Ok(Json(json!({
        "status": "success",
        "chapter": info.numeric_value,
        "chapter_info": info,
    })))
}

async fn check_lock(State(engine): State<Engine>, payload: Result<Json<DetectRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;
    let report = engine.check_lock(&request.url, request.pattern.as_deref()).await?;
    let auto_detected = report.chapter.as_ref().is_some_and(|info| info.auto_detected);

    Ok(Json(json!({
        "status": "success",
        "final_url": report.final_url,
        "auto_detected": auto_detected,
        "chapter": chapter_value(report.chapter.as_ref().map(|info| info.numeric_value)),
        "chapter_info": report.chapter,
        "nav": report.links,
    })))
}

async fn navigate(State(engine): State<Engine>, payload: Result<Json<NavigateRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;
    let outcome = engine.navigate(&request.current_url, request.direction).await?;

    tracing::info!(from = %request.current_url, to = %outcome.target_url, tier = %outcome.tier, "navigated");
    Ok(Json(json!({
        "status": "success",
        "new_url": outcome.target_url,
        "chapter": chapter_value(outcome.chapter),
        "tier": outcome.tier,
    })))
}

async fn enqueue(State(engine): State<Engine>, payload: Result<Json<UrlRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;
    let queued = engine.enqueue(&request.url)?;

    Ok(Json(json!({
        "status": "success",
        "queued": queued,
        "queue_length": engine.memory().queue_len(),
    })))
}

async fn book(State(engine): State<Engine>, payload: Result<Json<BookRequest>, JsonRejection>) -> ApiResult {
    let request = body(payload)?;
    let chapters = engine.collect_book(&request.url, request.max_chapters).await?;

    tracing::info!(url = %request.url, chapters = chapters.len(), "book collected");
    let chapters = chapters
        .into_iter()
        .map(|chapter| json!({ "url": chapter.url, "chapter": chapter_value(chapter.chapter), "content": chapter.text }))
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "status": "success",
        "chapter_count": chapters.len(),
        "chapters": chapters,
    })))
}

async fn inspect_memory(State(engine): State<Engine>) -> Json<Value> {
    Json(json!({ "status": "success", "memory": engine.inspect_memory() }))
}

async fn clear_memory(State(engine): State<Engine>, query: Result<Query<MemoryQuery>, QueryRejection>) -> ApiResult {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let removed = engine.clear_memory(query.scope);

    tracing::info!(scope = %query.scope, removed, "memory cleared");
    Ok(Json(json!({ "status": "success", "scope": query.scope, "removed": removed })))
}
