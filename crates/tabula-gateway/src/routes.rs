use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info};

use tabula_core::types::{AgentProgress, AgentReply, AgentStatus, SessionId};
use tabula_report::{generate_report, ReportRequest};

use crate::error::ApiError;
use crate::state::{AgentState, DbState};

// ── Agent-facing API ────────────────────────────────────────────

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct QueryBody {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Wire shape of an agent answer.
fn reply_body(session_id: &SessionId, reply: &AgentReply) -> serde_json::Value {
    serde_json::json!({
        "session_id": session_id.to_string(),
        "is_task_complete": reply.status == AgentStatus::Completed,
        "require_user_input": reply.status == AgentStatus::InputRequired,
        "content": reply.message,
    })
}

// POST /api/query
pub async fn query(
    State(state): State<Arc<AgentState>>,
    Json(body): Json<QueryBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError(tabula_core::error::TabulaError::InvalidRequest(
            "query must not be empty".into(),
        )));
    }

    let session_id = body
        .session_id
        .as_deref()
        .map(SessionId::from_string)
        .unwrap_or_default();
    info!(%session_id, "agent query received");

    let reply = state.runtime.run(&session_id, &body.query).await?;
    Ok(Json(reply_body(&session_id, &reply)))
}

// POST /api/query/stream — SSE of tool-call progress, then the reply
pub async fn query_stream(
    State(state): State<Arc<AgentState>>,
    Json(body): Json<QueryBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError(tabula_core::error::TabulaError::InvalidRequest(
            "query must not be empty".into(),
        )));
    }

    let session_id = body
        .session_id
        .as_deref()
        .map(SessionId::from_string)
        .unwrap_or_default();
    let (tx, rx) = mpsc::channel::<AgentProgress>(32);

    let runtime = Arc::clone(&state.runtime);
    let query = body.query.clone();
    let sid = session_id.clone();
    tokio::spawn(async move {
        if let Err(e) = runtime.run_streaming(&sid, &query, tx.clone()).await {
            error!(%sid, error = %e, "streaming agent run failed");
            let _ = tx
                .send(AgentProgress::Final {
                    reply: AgentReply::error(e.to_string()),
                })
                .await;
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        let event = Event::default()
            .json_data(&item)
            .unwrap_or_else(|_| Event::default().data("serialization failed"));
        Some((Ok(event), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// POST /api/reports — returns the rendered workbook as a download
pub async fn create_report(
    Json(request): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = generate_report(request)?;
    info!(
        filename = %output.filename,
        size = output.bytes.len(),
        "report generated"
    );

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.filename),
        ),
    ];
    Ok((headers, output.bytes))
}

// ── Database API ────────────────────────────────────────────────

// GET /
pub async fn db_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// GET /db/tables
pub async fn list_tables(
    State(state): State<Arc<DbState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tables = state.inspector.tables().await?;
    Ok(Json(serde_json::json!({ "tables": tables })))
}

// GET /db/schema
pub async fn schema(
    State(state): State<Arc<DbState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let schema = state.inspector.schema().await?;
    Ok(Json(schema))
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    5
}

// GET /db/{table}/samples?limit=5
pub async fn samples(
    State(state): State<Arc<DbState>>,
    Path(table): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = state.inspector.sample(&table, q.limit).await?;
    Ok(Json(serde_json::json!({ "table": table, "rows": rows })))
}

// GET /db/{table}/summary
pub async fn summary(
    State(state): State<Arc<DbState>>,
    Path(table): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.inspector.summary(&table).await?;
    Ok(Json(summary))
}

// GET /db/{table}/uniques?limit=5
pub async fn uniques(
    State(state): State<Arc<DbState>>,
    Path(table): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let uniques = state.inspector.uniques(&table, q.limit).await?;
    Ok(Json(uniques))
}

#[derive(Deserialize)]
pub struct SqlBody {
    pub query: String,
}

// POST /db/query — read-only SQL
pub async fn run_query(
    State(state): State<Arc<DbState>>,
    Json(body): Json<SqlBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = state.inspector.run_query(&body.query).await?;
    Ok(Json(serde_json::json!({
        "rows": rows,
        "row_count": rows.len(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_body_shape() {
        let sid = SessionId::from_string("s1");

        let done = reply_body(&sid, &AgentReply::completed("10 users"));
        assert_eq!(done["is_task_complete"], true);
        assert_eq!(done["require_user_input"], false);
        assert_eq!(done["content"], "10 users");
        assert_eq!(done["session_id"], "s1");

        let ask = reply_body(
            &sid,
            &AgentReply {
                status: AgentStatus::InputRequired,
                message: "which table?".into(),
            },
        );
        assert_eq!(ask["is_task_complete"], false);
        assert_eq!(ask["require_user_input"], true);

        let err = reply_body(&sid, &AgentReply::error("boom"));
        assert_eq!(err["is_task_complete"], false);
        assert_eq!(err["require_user_input"], false);
    }
}
