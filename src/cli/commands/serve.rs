//! HTTP chat API.
//!
//! Provides REST endpoints for one-shot questions, passage search, and chat
//! sessions whose history is kept in memory.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::AssistantError;
use crate::llm::{Message, Role};
use crate::pipeline::{QueryPipeline, Reply};
use crate::session::{greeting, ChatSession};
use crate::vector_store::SearchResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pipeline: QueryPipeline,
    sessions: RwLock<HashMap<Uuid, ChatSession>>,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline) -> Self {
        Self {
            pipeline,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/search", post(search))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/messages", post(post_message).delete(clear_session))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let secrets = match preflight::check(Operation::Answer, &settings) {
        Ok(secrets) => secrets,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let pipeline = QueryPipeline::from_settings(&settings, &secrets)?;
    let app = router(Arc::new(AppState::new(pipeline)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Bible Assistant API");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Ask", "POST   /ask");
    Output::kv("Search", "POST   /search");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Get session", "GET    /sessions/{id}");
    Output::kv("Send message", "POST   /sessions/{id}/messages");
    Output::kv("New chat", "DELETE /sessions/{id}/messages");
    Output::kv("End session", "DELETE /sessions/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    question: String,
    refined_query: String,
    answer: String,
    sources: Vec<SourceInfo>,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    text: String,
    score: f32,
}

impl From<&SearchResult> for SourceInfo {
    fn from(result: &SearchResult) -> Self {
        Self {
            id: result.passage.id.clone(),
            text: result.passage.text.clone(),
            score: result.score,
        }
    }
}

#[derive(Serialize)]
struct SessionResponse {
    id: Uuid,
    created_at: DateTime<Utc>,
    greeting: &'static str,
    messages: Vec<Message>,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            greeting: greeting(),
            messages: session.messages().to_vec(),
        }
    }
}

#[derive(Deserialize)]
struct MessageRequest {
    content: String,
}

#[derive(Serialize)]
struct TurnResponse {
    reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn status_for(error: &AssistantError) -> StatusCode {
    match error {
        AssistantError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AssistantError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn session_not_found(id: Uuid) -> ApiError {
    let e = AssistantError::SessionNotFound(id.to_string());
    api_error(status_for(&e), e)
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let answer = state
        .pipeline
        .process_query(&req.question)
        .await
        .map_err(|e| api_error(status_for(&e), e))?;

    Ok(Json(AskResponse {
        question: answer.question,
        refined_query: answer.refined_query,
        answer: answer.text,
        sources: answer.sources.iter().map(SourceInfo::from).collect(),
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Query is empty"));
    }

    let results = state
        .pipeline
        .search(&req.query)
        .await
        .map_err(|e| api_error(status_for(&e), e))?;

    Ok(Json(SearchResponse {
        results: results.iter().map(SourceInfo::from).collect(),
    }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = ChatSession::new();
    let response = SessionResponse::from(&session);
    info!("Created chat session {}", session.id);
    state.sessions.write().await.insert(session.id, session);
    (StatusCode::CREATED, Json(response))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(SessionResponse::from(session)))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is empty"));
    }

    {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
        session.update_chat(Role::User, content.clone());
    }

    // The lock is released while the answer is generated, so the chat may be
    // reset or receive another question in the meantime.
    let reply = state.pipeline.answer_or_apologize(&content).await;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    if !session.complete_turn(&content, reply.text()) {
        warn!("Session {} changed during the turn, dropping the reply", id);
        return Err(api_error(
            StatusCode::CONFLICT,
            "The chat changed while this question was being answered",
        ));
    }

    let error = match &reply {
        Reply::Apology { error } => Some(error.clone()),
        Reply::Answered(_) => None,
    };

    Ok(Json(TurnResponse {
        reply: reply.text().to_string(),
        error,
        messages: session.messages().to_vec(),
    }))
}

async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    session.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(session_not_found(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::llm::{AssistantMessage, ChatModel};
    use crate::testing::{pipeline_with, scripted_model, ScriptedChatModel};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    async fn app_with(model: Arc<dyn ChatModel>) -> Router {
        router(Arc::new(AppState::new(pipeline_with(model).await)))
    }

    /// Holds its first call until released, then answers every call.
    struct GatedChatModel {
        entered: Notify,
        release: Notify,
        first: AtomicBool,
    }

    #[async_trait]
    impl ChatModel for GatedChatModel {
        async fn complete(&self, _messages: &[Message]) -> Result<AssistantMessage> {
            if self.first.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(AssistantMessage::new("Moses Egypt"))
        }

        fn identity(&self) -> String {
            "gated".to_string()
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(scripted_model("unused")).await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ask() {
        let app = app_with(scripted_model("Moses Egypt")).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/ask",
            Some(json!({ "question": "Who was Moses?" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["refined_query"], "Moses Egypt");
        assert_eq!(body["answer"], "Answer about Moses Egypt");
        assert_eq!(body["sources"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_ask_blank_question_is_bad_request() {
        let app = app_with(scripted_model("unused")).await;
        let (status, _) = send(&app, Method::POST, "/ask", Some(json!({ "question": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ask_upstream_failure_is_bad_gateway() {
        let app = app_with(Arc::new(ScriptedChatModel::failing("down"))).await;
        let (status, body) =
            send(&app, Method::POST, "/ask", Some(json!({ "question": "Who was Moses?" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_search() {
        let app = app_with(scripted_model("unused")).await;
        let (status, body) =
            send(&app, Method::POST, "/search", Some(json!({ "query": "love world" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["id"], "john-3-16");
    }

    #[tokio::test]
    async fn test_session_turns() {
        let app = app_with(scripted_model("creation")).await;

        let (status, created) = send(&app, Method::POST, "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(created["messages"].as_array().unwrap().is_empty());

        let uri = format!("/sessions/{}/messages", id);
        let (status, turn) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({ "content": "What is the story of creation?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["reply"], "Answer about creation");
        assert!(turn.get("error").is_none());
        assert_eq!(
            turn["messages"],
            json!([
                { "role": "user", "content": "What is the story of creation?" },
                { "role": "assistant", "content": "Answer about creation" }
            ])
        );

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, session) = send(&app, Method::GET, &format!("/sessions/{}", id), None).await;
        assert!(session["messages"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_failure_records_apology() {
        let app = app_with(Arc::new(ScriptedChatModel::failing("timeout"))).await;
        let (_, created) = send(&app, Method::POST, "/sessions", None).await;
        let uri = format!("/sessions/{}/messages", created["id"].as_str().unwrap());

        let (status, turn) = send(&app, Method::POST, &uri, Some(json!({ "content": "Hi" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["reply"], crate::pipeline::APOLOGY);
        assert!(turn["error"].as_str().unwrap().contains("timeout"));
        assert_eq!(turn["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_after_new_chat_is_dropped() {
        let model = Arc::new(GatedChatModel {
            entered: Notify::new(),
            release: Notify::new(),
            first: AtomicBool::new(true),
        });
        let app = app_with(model.clone()).await;

        let (_, created) = send(&app, Method::POST, "/sessions", None).await;
        let id = created["id"].as_str().unwrap().to_string();
        let uri = format!("/sessions/{}/messages", id);

        let turn = {
            let app = app.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                send(&app, Method::POST, &uri, Some(json!({ "content": "Who was Moses?" }))).await
            })
        };

        model.entered.notified().await;
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        model.release.notify_one();

        let (status, body) = turn.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("changed"));

        let (_, session) = send(&app, Method::GET, &format!("/sessions/{}", id), None).await;
        assert!(session["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = app_with(scripted_model("unused")).await;
        let uri = format!("/sessions/{}/messages", Uuid::new_v4());
        let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "content": "Hi" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Chat session not found"));
    }
}
