/// Data model for batch transcription jobs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a batch job, as reported by the service.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued or being processed
    Running,
    /// Finished; results can be fetched
    Done,
    /// Failed; see the job's errors
    Rejected,
    /// Removed by the caller
    Deleted,
}

impl JobStatus {
    /// Whether this status is terminal (the job will not change again).
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// A batch job as reported by the status and list endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobDetails {
    /// Opaque job identifier
    pub id: String,

    /// Current status
    pub status: JobStatus,

    /// Submission timestamp (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Name of the uploaded file or fetch URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_name: Option<String>,

    /// Audio duration in seconds, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Failure details for rejected jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<JobErrorDetail>>,
}

impl JobDetails {
    /// Concatenated failure messages, for error reporting.
    pub fn error_summary(&self) -> String {
        match &self.errors {
            Some(errors) if !errors.is_empty() => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            _ => "no error details reported".to_string(),
        }
    }
}

/// One failure record attached to a rejected job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobErrorDetail {
    /// When the failure occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Human-readable failure description
    pub message: String,
}

/// Envelope for single-job responses (`{"job": {...}}`).
#[derive(Deserialize, Debug)]
pub(crate) struct JobResponse {
    pub job: JobDetails,
}

/// Envelope for the job list response (`{"jobs": [...]}`).
#[derive(Deserialize, Debug)]
pub(crate) struct JobsResponse {
    pub jobs: Vec<JobDetails>,
}

/// Envelope for the submission response (`{"id": "..."}`).
#[derive(Deserialize, Debug)]
pub(crate) struct SubmitResponse {
    pub id: String,
}

/// Audio input for a job submission.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Upload a local file
    File(PathBuf),

    /// Upload in-memory bytes under the given filename
    Bytes {
        /// Filename reported to the service
        filename: String,
        /// Audio content
        data: Vec<u8>,
    },
}

impl AudioSource {
    /// Source for a local file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioSource::File(path.into())
    }

    /// Source for in-memory audio bytes.
    pub fn bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        AudioSource::Bytes {
            filename: filename.into(),
            data,
        }
    }
}

/// Transcript output format for result retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text
    Txt,
    /// SubRip subtitles
    Srt,
    /// Structured JSON (v2 schema)
    #[default]
    JsonV2,
}

impl OutputFormat {
    /// Value for the `format` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::JsonV2 => "json-v2",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // json and json_v2 are accepted as aliases for json-v2
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(OutputFormat::Txt),
            "srt" => Ok(OutputFormat::Srt),
            "json-v2" | "json_v2" | "json" => Ok(OutputFormat::JsonV2),
            other => Err(format!(
                "unknown output format {other:?}, expected txt, srt or json-v2"
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

/// A retrieved transcript, structured or rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    /// Parsed json-v2 payload
    Json(Value),

    /// Rendered txt or srt output
    Text(String),
}

impl Transcript {
    /// The rendered text, or the JSON payload re-serialized.
    pub fn to_text(&self) -> String {
        match self {
            Transcript::Text(text) => text.clone(),
            Transcript::Json(value) => value.to_string(),
        }
    }

    /// The JSON payload, if this is a structured transcript.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Transcript::Json(value) => Some(value),
            Transcript::Text(_) => None,
        }
    }
}
