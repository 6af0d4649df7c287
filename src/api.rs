//! Remote sequence service: wire types and the blocking HTTP client.

use crate::{
    analysis_state::{SearchResult, SequenceId, UploadedSequence},
    config::ServiceConfig,
    error::{AnalyzerError, Result},
};
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info};

pub const UPLOAD_ENDPOINT: &str = "sequences/upload/";
pub const SEARCH_ENDPOINT: &str = "search/";
pub const DEFAULT_ALGORITHM: &str = "naive-local";

#[derive(Clone, Debug, PartialEq)]
pub struct SequenceFile {
    pub path: PathBuf,
    pub name: String,
}

impl SequenceFile {
    pub fn new(path: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            path: path.into(),
            name: name.to_string(),
        }
    }

    /// Display name defaults to the file name.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(path, &name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRequest {
    pub sequence_id: SequenceId,
    pub pattern: String,
    pub allow_overlapping: bool,
}

impl SearchRequest {
    pub fn new(sequence_id: SequenceId, pattern: &str) -> Self {
        Self {
            sequence_id,
            pattern: pattern.to_string(),
            allow_overlapping: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SearchJob {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub total_matches: Option<usize>,
    #[serde(default)]
    pub algorithm_used: Option<String>,
    #[serde(default)]
    pub search_time_ms: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub job: Option<SearchJob>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub end_to_end_ms: Option<f64>,
    #[serde(default)]
    pub algorithm_used: Option<String>,
    #[serde(default)]
    pub search_time_ms: Option<f64>,
    #[serde(default)]
    pub total_matches: Option<usize>,
    /// Measured by the client, not part of the payload.
    #[serde(skip)]
    pub round_trip_ms: Option<f64>,
}

impl SearchResponse {
    pub fn algorithm(&self) -> &str {
        self.job
            .as_ref()
            .and_then(|j| j.algorithm_used.as_deref())
            .or(self.algorithm_used.as_deref())
            .unwrap_or(DEFAULT_ALGORITHM)
    }

    pub fn total_matches(&self) -> usize {
        self.job
            .as_ref()
            .and_then(|j| j.total_matches)
            .or(self.total_matches)
            .unwrap_or(self.results.len())
    }

    /// End-to-end timing wins over the server's own measurement.
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.end_to_end_ms
            .or_else(|| self.job.as_ref().and_then(|j| j.search_time_ms))
            .or(self.search_time_ms)
            .or(self.round_trip_ms)
    }
}

pub trait SequenceService: Send + Sync {
    fn upload(&self, file: &SequenceFile) -> Result<UploadedSequence>;
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// Message for a non-success response: `detail` if the body has one, else
/// the compact JSON body, else the raw text, else the status.
pub fn error_detail(status: u16, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.contains_key("detail") => match &map["detail"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        Ok(Value::Null) => format!("HTTP {status}"),
        Ok(other) => other.to_string(),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                format!("HTTP {status}")
            } else {
                text.to_string()
            }
        }
    }
}

pub struct HttpSequenceService {
    config: ServiceConfig,
    client: Client,
}

impl HttpSequenceService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn read_body(response: reqwest::blocking::Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                detail: error_detail(status.as_u16(), &body),
            });
        }
        Ok(body)
    }
}

impl SequenceService for HttpSequenceService {
    fn upload(&self, file: &SequenceFile) -> Result<UploadedSequence> {
        let bytes = std::fs::read(&file.path)?;
        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.name.clone());
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name))
            .text("name", file.name.clone());
        let response = self
            .client
            .post(self.config.endpoint(UPLOAD_ENDPOINT))
            .multipart(form)
            .send()?;
        let body = Self::read_body(response)?;
        let sequence: UploadedSequence = serde_json::from_str(&body)?;
        info!(
            "Uploaded {} as {} ({} bp)",
            sequence.display_name(),
            sequence.id,
            sequence.length
        );
        Ok(sequence)
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.config.endpoint(SEARCH_ENDPOINT))
            .json(request)
            .send()?;
        let body = Self::read_body(response)?;
        let mut ret: SearchResponse = serde_json::from_str(&body)?;
        ret.round_trip_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        Ok(ret)
    }
}
