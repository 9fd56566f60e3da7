//! Query Routes
//!
//! `POST /query`: validate, classify, log, respond. Any failure ends the
//! request; nothing is retried and failed attempts leave no row behind.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use inference_engine::SentimentLabel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::NewQueryLog;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// Request body
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

/// Successful classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Submitted text after trimming, as stored
    pub input_text: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f64,
}

/// Classify the submitted text and log the outcome
pub async fn post_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = handle_query(&state, payload).await;

    let tag = match &outcome {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!("sentiment_queries_total", "outcome" => tag).increment(1);

    outcome.map(Json)
}

async fn handle_query(
    state: &AppState,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<QueryResponse, ApiError> {
    let Json(request) = payload?;

    let text = state.validator.validate(&request.text)?;
    let chars = text.chars().count();
    debug!(chars, "Query validated");

    let result = state.inference.classify(text.clone()).await?;

    let entry = state
        .repository
        .insert_log(NewQueryLog {
            input_text: text,
            label: result.label.as_str().to_string(),
            score: result.score,
        })
        .await?;

    info!(
        id = entry.id,
        chars,
        label = %result.label,
        score = result.score,
        "Query classified and logged"
    );

    Ok(QueryResponse {
        input_text: entry.input_text,
        sentiment_label: result.label,
        sentiment_score: entry.score,
    })
}
