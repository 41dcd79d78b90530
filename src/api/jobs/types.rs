use cronmesh_core::JobId;
use serde::{Deserialize, Serialize};

/// Request to create a new job
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub name: String,
    pub cron_schedule: String,
}

/// `?id=` query parameter
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: JobId,
}

/// `?job_id=` filter for history listings
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub job_id: Option<JobId>,
}

/// Acknowledgement for state-changing requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub id: JobId,
    pub status: String,
}

impl StatusView {
    pub fn new(id: JobId, status: &str) -> Self {
        Self {
            id,
            status: status.to_string(),
        }
    }
}
