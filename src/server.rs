// HTTP service - axum router over the analysis pipeline
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cache::{cache_key, ResultCache};
use crate::complexity::{rank_profile, DeveloperRank};
use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::feedback::{Feedback, FeedbackMessage, Notifier, RECEIVED_MESSAGE};
use crate::github::{RepoFetcher, RepoRequest};
use crate::ingest::{Ingestor, UploadSummary};
use crate::language::Language;
use crate::report::{analyze_sources, AnalysisResult};
use crate::rules::{RuleStore, SkillInfo};
use crate::scoring::{category_average, level_distribution, LevelDistribution, SkillScore};

const UPLOAD_FIELD: &str = "file";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleStore>,
    pub cache: ResultCache,
    pub config: Arc<ServiceConfig>,
    pub fetcher: Arc<RepoFetcher>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: ServiceConfig, rules: RuleStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("skilllens/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            rules: Arc::new(rules),
            cache: ResultCache::new(config.cache_dir.clone(), config.cache_ttl()),
            fetcher: Arc::new(RepoFetcher::new(client.clone(), config.github_archive_base.clone())),
            notifier: Notifier::new(client, config.feedback_webhook.clone()),
            config: Arc::new(config),
        })
    }

    fn analysis_ingestor(&self) -> Ingestor {
        Ingestor::analysis(self.config.max_archive_file_bytes)
    }

    fn extended_ingestor(&self) -> Ingestor {
        Ingestor::extended(self.config.max_archive_file_bytes)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/analyze/file", post(analyze_file))
        .route("/analyze/github", post(analyze_github))
        .route("/api/skill_signals", post(skill_signals))
        .route("/api/developer_rank", post(developer_rank))
        .route("/api/upload_summary", post(upload_summary))
        .route("/api/skill_progress_chart", post(skill_progress_chart))
        .route("/resources", get(all_resources))
        .route("/resources/{skill_name}", get(skill_resources))
        .route("/skills", get(list_skills))
        .route("/skills/categories", get(skill_categories))
        .route("/feedback", post(submit_feedback))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), limit_request_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", state.config.bind))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(bind = %addr, "SkillLens API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let mut valid = Vec::with_capacity(origins.len());
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => valid.push(value),
            Err(e) => warn!(origin, error = %e, "Ignoring unparseable CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(valid)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}

/// Reject POST bodies whose declared length exceeds the limit before any
/// handler runs. Bodies without a length are capped by `DefaultBodyLimit`;
/// the 413 that produces is rewritten to carry the same detail.
async fn limit_request_size(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() == Method::POST {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        if declared.is_some_and(|len| len > state.config.max_upload_bytes) {
            return AppError::PayloadTooLarge(state.config.too_large_message()).into_response();
        }
    }

    let response = next.run(request).await;
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(state.config.too_large_message()).into_response();
    }
    response
}

/// First multipart field named `file`, with its client-side file name.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<(String, Bytes), AppError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Uploaded file has no name".to_string()))?;
        let bytes = field.bytes().await?;
        return Ok((filename, bytes));
    }

    Err(AppError::Validation(format!("Missing '{}' field", UPLOAD_FIELD)))
}

/// Run CPU or file-system bound work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn analyze_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let ingestor = state.analysis_ingestor();
    ingestor.validate(&filename)?;

    let rules = state.rules.clone();
    let result = blocking(move || {
        let sources = ingestor.ingest_upload(&filename, &bytes)?;
        Ok(analyze_sources(&filename, &sources, &rules))
    })
    .await?;

    info!(
        filename = %result.filename,
        language = %result.primary_language,
        skills = result.skills.len(),
        "Analyzed upload"
    );
    Ok(Json(result))
}

async fn analyze_github(
    State(state): State<AppState>,
    body: Result<Json<RepoRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(request) = body?;
    let repo = request.validate()?;
    let key = cache_key(&request.cache_key_source());

    let cache = state.cache.clone();
    let lookup = key.clone();
    match blocking(move || Ok(cache.get::<AnalysisResult>(&lookup))).await? {
        Ok(Some(hit)) => {
            info!(repository = %request.repository_url, "Cache hit");
            return Ok(Json(hit));
        }
        Ok(None) => {}
        Err(e) => warn!("Cache read failed for {}: {:#}", key, e),
    }

    let sources = state
        .fetcher
        .fetch_sources(&repo, &request.branch, state.analysis_ingestor())
        .await?;

    let rules = state.rules.clone();
    let name = repo.repo.clone();
    let result = blocking(move || Ok(analyze_sources(&name, &sources, &rules))).await?;

    if !result.is_error() {
        let cache = state.cache.clone();
        let entry = result.clone();
        let store_key = key.clone();
        if let Err(e) = blocking(move || Ok(cache.put(&store_key, &entry))).await? {
            warn!("Cache write failed for {}: {:#}", key, e);
        }
    }

    Ok(Json(result))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignalsResponse {
    pub language: Language,
    pub skills: BTreeMap<String, f64>,
}

async fn skill_signals(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SignalsResponse>, AppError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let ingestor = state.analysis_ingestor();
    ingestor.validate(&filename)?;

    let response = blocking(move || {
        let sources = ingestor.ingest_upload(&filename, &bytes)?;
        let (language, skills) = sources.signals();
        Ok(SignalsResponse { language, skills })
    })
    .await?;

    Ok(Json(response))
}

async fn developer_rank(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DeveloperRank>, AppError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let ingestor = state.extended_ingestor();
    ingestor.validate(&filename)?;

    let rank = blocking(move || {
        let sources = ingestor.ingest_upload(&filename, &bytes)?;
        let libraries = sources.libraries().all_libraries();
        Ok(rank_profile(sources.contents(), &libraries, sources.languages()))
    })
    .await?;

    Ok(Json(rank))
}

async fn upload_summary(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadSummary>, AppError> {
    let started = Instant::now();
    let (filename, bytes) = read_upload(multipart).await?;
    let ingestor = state.extended_ingestor();
    ingestor.validate(&filename)?;

    let summary = blocking(move || {
        let sources = ingestor.ingest_upload(&filename, &bytes)?;
        Ok(sources.summary(started.elapsed().as_secs_f64() * 1000.0))
    })
    .await?;

    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    #[serde(default)]
    pub skills: Vec<SkillScore>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub frontend_avg: u32,
    pub backend_avg: u32,
    pub level_distribution: LevelDistribution,
}

async fn skill_progress_chart(
    body: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<Json<ProgressResponse>, AppError> {
    let Json(request) = body?;
    // Client-supplied scores go through the clamping constructor
    let skills: Vec<SkillScore> = request
        .skills
        .into_iter()
        .map(|s| SkillScore::new(s.name, s.score, s.category))
        .collect();

    Ok(Json(ProgressResponse {
        frontend_avg: category_average(&skills, "Frontend"),
        backend_avg: category_average(&skills, "Backend"),
        level_distribution: level_distribution(&skills),
    }))
}

async fn skill_resources(State(state): State<AppState>, Path(skill_name): Path<String>) -> Json<SkillInfo> {
    Json(state.rules.skill_info(&skill_name))
}

async fn all_resources(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "categories": state.rules.skills_by_category() }))
}

async fn list_skills(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "skills": state.rules.skills() }))
}

async fn skill_categories(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "categories": state.rules.skills_by_category() }))
}

async fn submit_feedback(
    State(state): State<AppState>,
    body: Result<Json<Feedback>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(feedback) = body?;
    feedback.validate().map_err(AppError::Validation)?;

    let message = FeedbackMessage::new(&feedback);
    state
        .notifier
        .send(&message)
        .await
        .map_err(|e| AppError::Notification(format!("{:#}", e)))?;

    Ok(Json(json!({ "message": RECEIVED_MESSAGE })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tests::zip_fixture;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "skilllens-test-boundary";

    fn test_state(dir: &TempDir) -> AppState {
        let config = ServiceConfig {
            cache_dir: dir.path().join("cache"),
            data_dir: dir.path().join("data"),
            ..Default::default()
        };
        AppState::new(config, RuleStore::defaults().unwrap()).unwrap()
    }

    fn upload(uri: &str, filename: &str, content: &[u8]) -> HttpRequest<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(router(test_state(&dir)), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_analyze_python_file() {
        let dir = TempDir::new().unwrap();
        let request = upload(
            "/analyze/file",
            "app.py",
            b"import pandas as pd\nimport os\nfrom flask import Flask",
        );
        let (status, body) = send(router(test_state(&dir)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "app.py");
        assert_eq!(body["language"], "Python");
        assert_eq!(body["libraries"], json!(["flask", "pandas"]));
        assert_eq!(body["skills"][0]["name"], "Backend");
        assert_eq!(body["recommendations"][0], "Backend");
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_disallowed_extension_is_400() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(router(test_state(&dir)), upload("/analyze/file", "run.exe", b"MZ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains(".py"));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400() {
        let dir = TempDir::new().unwrap();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/analyze/file")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(format!("--{BOUNDARY}--\r\n")))
            .unwrap();
        let (status, _) = send(router(test_state(&dir)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zip_upload() {
        let dir = TempDir::new().unwrap();
        let archive = zip_fixture(&[
            ("web/index.js", "import React from 'react';\nconst axios = require('axios');"),
            ("web/notes.txt", "not code"),
        ]);
        let (status, body) = send(router(test_state(&dir)), upload("/analyze/file", "web.zip", &archive)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "JavaScript");
        assert_eq!(body["libraries"], json!(["axios", "react"]));
        assert_eq!(body["skills"][0]["name"], "Frontend");
    }

    #[tokio::test]
    async fn test_zip_without_sources_sets_error() {
        let dir = TempDir::new().unwrap();
        let archive = zip_fixture(&[("README.md", "# hi")]);
        let (status, body) = send(router(test_state(&dir)), upload("/analyze/file", "docs.zip", &archive)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].is_string());
        assert_eq!(body["skills"], json!([]));
        assert_eq!(body["libraries"], json!([]));
    }

    #[tokio::test]
    async fn test_corrupt_zip_is_422() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(router(test_state(&dir)), upload("/analyze/file", "bad.zip", b"nope")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_oversized_request_is_413() {
        let dir = TempDir::new().unwrap();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/analyze/file")
            .header(header::CONTENT_LENGTH, "6000000")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(test_state(&dir)), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["detail"], "Request too large. Maximum size is 5MB.");
    }

    #[tokio::test]
    async fn test_unsized_oversized_bodies_get_the_same_413() {
        let dir = TempDir::new().unwrap();
        let big = vec![b'a'; 6 * 1024 * 1024];

        let request = upload("/analyze/file", "big.py", &big);
        assert!(request.headers().get(header::CONTENT_LENGTH).is_none());
        let (status, body) = send(router(test_state(&dir)), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["detail"], "Request too large. Maximum size is 5MB.");

        let padded = json!({
            "repository_url": "https://github.com/octo/demo",
            "padding": String::from_utf8(big).unwrap(),
        });
        let (status, body) = send(router(test_state(&dir)), post_json("/analyze/github", padded)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["detail"], "Request too large. Maximum size is 5MB.");
    }

    #[tokio::test]
    async fn test_github_bad_url_is_400() {
        let dir = TempDir::new().unwrap();
        let request = post_json("/analyze/github", json!({ "repository_url": "https://example.com/a/b" }));
        let (status, body) = send(router(test_state(&dir)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("Invalid GitHub repository URL"));
    }

    #[tokio::test]
    async fn test_github_analysis_is_cached() {
        let upstream = Router::new().route(
            "/octo/demo/archive/refs/heads/main.zip",
            get(|| async { zip_fixture(&[("demo-main/app.py", "import django\n")]) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let config = ServiceConfig {
            cache_dir: dir.path().join("cache"),
            github_archive_base: format!("http://{}", addr),
            ..Default::default()
        };
        let state = AppState::new(config, RuleStore::defaults().unwrap()).unwrap();
        let cache = state.cache.clone();
        let app = router(state);

        let request = json!({ "repository_url": "https://github.com/octo/demo.git" });
        let (status, body) = send(app.clone(), post_json("/analyze/github", request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "demo");
        assert_eq!(body["libraries"], json!(["django"]));
        assert_eq!(cache.stats().unwrap().file_count, 1);

        let (status, again) = send(app, post_json("/analyze/github", request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["timestamp"], body["timestamp"]);
    }

    #[tokio::test]
    async fn test_github_missing_branch_is_502() {
        let upstream = Router::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let config = ServiceConfig {
            cache_dir: dir.path().join("cache"),
            github_archive_base: format!("http://{}", addr),
            ..Default::default()
        };
        let app = router(AppState::new(config, RuleStore::defaults().unwrap()).unwrap());
        let request = post_json(
            "/analyze/github",
            json!({ "repository_url": "https://github.com/octo/demo", "branch": "gone" }),
        );
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_developer_rank_endpoint() {
        let dir = TempDir::new().unwrap();
        let code = b"import flask\n\ndef handler(x):\n    if x:\n        return 1\n    return 0\n";
        let (status, body) = send(router(test_state(&dir)), upload("/api/developer_rank", "app.py", code)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complexity_score"], 2.0);
        assert_eq!(body["diversity_score"], 2);
        assert_eq!(body["rank"], "Intermediate");
    }

    #[tokio::test]
    async fn test_developer_rank_accepts_extended_types() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(
            router(test_state(&dir)),
            upload("/api/developer_rank", "Main.java", b"public class Main {}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_summary_endpoint() {
        let dir = TempDir::new().unwrap();
        let archive = zip_fixture(&[
            ("a.py", "# comment\nx = 1\ny = 2\n"),
            ("b.go", "package main\n"),
        ]);
        let (status, body) = send(router(test_state(&dir)), upload("/api/upload_summary", "src.zip", &archive)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_files"], 2);
        assert_eq!(body["lines_of_code"], 3);
        assert_eq!(body["most_used_languages"]["Python"], 2);
        assert_eq!(body["most_used_languages"]["Go"], 1);
    }

    #[tokio::test]
    async fn test_skill_signals_endpoint() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            router(test_state(&dir)),
            upload("/api/skill_signals", "app.py", b"import flask\n"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "Python");
        assert_eq!(body["skills"]["python"], 0.8);
    }

    #[tokio::test]
    async fn test_skill_progress_chart() {
        let dir = TempDir::new().unwrap();
        let request = post_json(
            "/api/skill_progress_chart",
            json!({ "skills": [
                { "name": "Frontend", "score": 0.5, "category": "Frontend" },
                { "name": "Backend", "score": 1.4, "category": "Backend" }
            ]}),
        );
        let (status, body) = send(router(test_state(&dir)), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["frontend_avg"], 50);
        assert_eq!(body["backend_avg"], 100);
        assert_eq!(body["level_distribution"]["Intermediate"], 1);
        assert_eq!(body["level_distribution"]["Expert"], 1);
    }

    #[tokio::test]
    async fn test_resources_and_skills() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));

        let (status, body) = send(app.clone(), get_req("/resources/Flask")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "Backend");

        let (_, body) = send(app.clone(), get_req("/resources/leftpad")).await;
        assert_eq!(body["name"], "Leftpad");
        assert_eq!(body["category"], "Other");
        assert_eq!(body["resources"].as_array().unwrap().len(), 1);

        let (_, body) = send(app.clone(), get_req("/skills")).await;
        let names: Vec<&str> = body["skills"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let (_, body) = send(app.clone(), get_req("/skills/categories")).await;
        assert!(body["categories"]["Backend"].as_array().is_some_and(|v| !v.is_empty()));

        let (_, body) = send(app, get_req("/resources")).await;
        assert!(body["categories"]["Frontend"].is_array());
    }

    #[tokio::test]
    async fn test_feedback() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));

        let (status, body) = send(app.clone(), post_json("/feedback", json!({ "rating": 5, "comment": "nice" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], RECEIVED_MESSAGE);

        let (status, _) = send(app.clone(), post_json("/feedback", json!({ "rating": 9 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app, post_json("/feedback", json!({ "comment": "no rating" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feedback_sink_failure_is_500() {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig {
            cache_dir: dir.path().join("cache"),
            // Nothing listens on port 9 locally
            feedback_webhook: Some("http://127.0.0.1:9/hook".to_string()),
            ..Default::default()
        };
        let app = router(AppState::new(config, RuleStore::defaults().unwrap()).unwrap());
        let (status, body) = send(app, post_json("/feedback", json!({ "rating": 3 }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Failed to send feedback:"));
    }
}
