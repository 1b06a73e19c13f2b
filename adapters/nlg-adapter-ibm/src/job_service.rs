//! Remote job lookups.
//!
//! The batch folders only carry job ids; the status of a batch and the
//! creation date of each job come from IBM Quantum. [`IbmRuntimeClient`]
//! queries the REST API, [`StaticJobService`] answers from memory.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nlg_core::{IngestError, IngestResult};
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::debug;

use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// User-Agent sent with requests (Cloudflare blocks default reqwest UA).
const USER_AGENT: &str = concat!("nlg/", env!("CARGO_PKG_VERSION"));

/// Lifecycle state of an IBM Quantum job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Initializing,
    Queued,
    Running,
    Done,
    Cancelled,
    Error,
    /// A state this crate does not know; treated as still running.
    Other(String),
}

impl JobStatus {
    /// Whether the job will not change state any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled | JobStatus::Error)
    }

    /// Whether the job finished with results.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Done)
    }

    /// Upper-case name, as cached in `status.txt`.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Initializing => "INITIALIZING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Error => "ERROR",
            JobStatus::Other(s) => s.as_str(),
        }
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    /// Accepts both the runtime names (`DONE`, `ERROR`) and the REST names
    /// (`Completed`, `Failed`), in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_uppercase().as_str() {
            "INITIALIZING" => JobStatus::Initializing,
            "QUEUED" => JobStatus::Queued,
            "RUNNING" | "VALIDATING" => JobStatus::Running,
            "DONE" | "COMPLETED" => JobStatus::Done,
            "CANCELLED" | "CANCELED" => JobStatus::Cancelled,
            "ERROR" | "FAILED" => JobStatus::Error,
            other => JobStatus::Other(other.to_string()),
        };
        Ok(status)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the ingester needs to know about a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub status: JobStatus,
    pub creation_date: DateTime<Utc>,
}

/// Source of job status and creation dates.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Look up a job by id.
    async fn job(&self, job_id: &str) -> IngestResult<JobInfo>;
}

/// IBM Quantum REST client for job lookups.
pub struct IbmRuntimeClient {
    client: Client,
    endpoint: String,
}

impl fmt::Debug for IbmRuntimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmRuntimeClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Job response from `GET /v1/jobs/{id}`.
#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    state: Option<JobState>,
}

/// State object of the Cloud API.
#[derive(Debug, Deserialize)]
struct JobState {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl JobResponse {
    fn into_info(self, job_id: &str) -> IbmResult<JobInfo> {
        let status = self
            .state
            .and_then(|s| s.status)
            .unwrap_or(self.status);
        let created = self.created.ok_or_else(|| IbmError::ApiError {
            code: None,
            message: format!("job {job_id} has no creation date"),
        })?;
        let creation_date = DateTime::parse_from_rfc3339(&created)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| IbmError::ApiError {
                code: None,
                message: format!("job {job_id}: invalid creation date '{created}': {e}"),
            })?;

        Ok(JobInfo {
            status: status.parse().unwrap_or(JobStatus::Other(status)),
            creation_date,
        })
    }
}

impl IbmRuntimeClient {
    /// Create a client authenticating with a bearer token.
    pub fn new(endpoint: impl Into<String>, token: &str) -> IbmResult<Self> {
        if token.trim().is_empty() {
            return Err(IbmError::MissingToken);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| IbmError::InvalidToken)?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the status and creation date of a job.
    pub async fn get_job(&self, job_id: &str) -> IbmResult<JobInfo> {
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);
        debug!(job_id, "Querying IBM job");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(IbmError::JobNotFound(job_id.to_string()));
            }
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error: ApiErrorResponse =
                serde_json::from_str(&body).unwrap_or(ApiErrorResponse {
                    code: None,
                    message: None,
                });
            return Err(IbmError::ApiError {
                code: error.code,
                message: error.message.unwrap_or_else(|| format!("{status}: {body}")),
            });
        }

        let job: JobResponse = response.json().await?;
        if let Some(id) = job.id.as_deref().filter(|id| *id != job_id) {
            debug!(requested = job_id, returned = id, "IBM returned a different job id");
        }
        job.into_info(job_id)
    }
}

#[async_trait]
impl JobService for IbmRuntimeClient {
    async fn job(&self, job_id: &str) -> IngestResult<JobInfo> {
        Ok(self.get_job(job_id).await?)
    }
}

/// In-memory job service.
#[derive(Debug, Default, Clone)]
pub struct StaticJobService {
    jobs: HashMap<String, JobInfo>,
}

impl StaticJobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(
        mut self,
        job_id: impl Into<String>,
        status: JobStatus,
        creation_date: DateTime<Utc>,
    ) -> Self {
        self.jobs.insert(
            job_id.into(),
            JobInfo {
                status,
                creation_date,
            },
        );
        self
    }
}

#[async_trait]
impl JobService for StaticJobService {
    async fn job(&self, job_id: &str) -> IngestResult<JobInfo> {
        self.jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| IngestError::JobService(format!("unknown job '{job_id}'")))
    }
}
