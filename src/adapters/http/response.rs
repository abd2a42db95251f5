//! Success envelope and the payload shapes carried in `data`.

use axum::Json;
use serde::Serialize;

use crate::domain::{Report, ReportId};

/// `{ "success": true, "message": ..., "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReportData {
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub count: usize,
    pub reports: Vec<Report>,
}

impl From<Vec<Report>> for ReportList {
    fn from(reports: Vec<Report>) -> Self {
        Self {
            count: reports.len(),
            reports,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgentReports {
    pub agent: String,
    pub count: usize,
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedData {
    pub deleted_id: ReportId,
}
