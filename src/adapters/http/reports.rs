//! Report handlers: thin dispatch from routes to `ReportRepository`.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use super::error::ApiError;
use super::response::{AgentReports, ApiResponse, DeletedData, ReportData, ReportList};
use super::AppState;
use crate::domain::validation::validate_list_query;
use crate::domain::ReportError;

type JsonResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// POST /reports
#[instrument(skip_all)]
pub async fn create_report(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReportData>>), ApiError> {
    let Json(body) = body?;
    let report = state.repository.create(&body).await?;
    state.metrics.reports_created.inc();
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Report created successfully", ReportData { report }),
    ))
}

/// GET /reports?threatLevel=&confirmed=&fieldCode=&limit=&skip=
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> JsonResult<ReportList> {
    let (filter, options) = validate_list_query(&params).map_err(ReportError::validation)?;
    let reports = state.repository.list(&filter, options).await?;
    Ok(ApiResponse::ok(
        "All intelligence reports retrieved successfully",
        ReportList::from(reports),
    ))
}

/// GET /reports/high
pub async fn list_high_threat(State(state): State<AppState>) -> JsonResult<ReportList> {
    let reports = state.repository.list_high_threat().await?;
    Ok(ApiResponse::ok(
        "High-priority threat reports retrieved successfully",
        ReportList::from(reports),
    ))
}

/// GET /reports/agent/:fieldCode
pub async fn list_by_agent(
    State(state): State<AppState>,
    Path(field_code): Path<String>,
) -> JsonResult<AgentReports> {
    let agent = field_code.trim().to_string();
    let reports = state.repository.list_by_agent(&agent).await?;
    Ok(ApiResponse::ok(
        format!("Reports from agent {agent} retrieved successfully"),
        AgentReports {
            agent,
            count: reports.len(),
            reports,
        },
    ))
}

/// GET /reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<ReportData> {
    let report = state.repository.get_by_id(&id).await?;
    Ok(ApiResponse::ok("Report retrieved successfully", ReportData { report }))
}

/// PUT /reports/:id/confirm
#[instrument(skip(state))]
pub async fn confirm_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<ReportData> {
    let report = state.repository.confirm(&id).await?;
    state.metrics.reports_confirmed.inc();
    Ok(ApiResponse::ok("Report confirmed successfully", ReportData { report }))
}

/// PATCH /reports/:id
#[instrument(skip(state, body))]
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> JsonResult<ReportData> {
    let Json(body) = body?;
    let report = state.repository.update(&id, &body).await?;
    Ok(ApiResponse::ok("Report updated successfully", ReportData { report }))
}

/// DELETE /reports/:id
#[instrument(skip(state))]
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult<DeletedData> {
    let deleted_id = state.repository.delete(&id).await?;
    state.metrics.reports_deleted.inc();
    Ok(ApiResponse::ok("Report deleted successfully", DeletedData { deleted_id }))
}
