//! Batch transcription job client
//!
//! Submits complete audio files (or fetch URLs) for asynchronous
//! processing and tracks the resulting jobs: status polling, result
//! retrieval, deletion and listing.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use skald::batch::{AudioSource, BatchClient, OutputFormat};
//! use skald::config::{BatchTranscriptionConfig, TranscriptionConfig};
//! use skald::settings::ConnectionSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConnectionSettings::new("https://asr.api.skald.io/v2")
//!         .with_auth_token("your-token");
//!     let client = BatchClient::new(settings)?;
//!
//!     let config = BatchTranscriptionConfig::new(TranscriptionConfig::new("en"));
//!     let job_id = client
//!         .submit_job(Some(AudioSource::file("meeting.wav")), &config)
//!         .await?;
//!
//!     let job = client
//!         .wait_for_completion(&job_id, Duration::from_secs(3600), Duration::from_secs(15))
//!         .await?;
//!     println!("job {} finished: {:?}", job.id, job.status);
//!
//!     let transcript = client.get_job_result(&job_id, OutputFormat::Txt).await?;
//!     println!("{}", transcript.to_text());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;

pub use error::{BatchError, BatchResult};
pub use models::{AudioSource, JobDetails, JobErrorDetail, JobStatus, OutputFormat, Transcript};

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use crate::config::BatchTranscriptionConfig;
use crate::settings::{ConnectionSettings, SslMode};
use models::{JobResponse, JobsResponse, SubmitResponse};

/// Client for the batch transcription REST API
///
/// The client holds a connection pool; clone-free reuse across calls is
/// fine since every operation takes `&self`. Each instance is tied to the
/// settings it was created with.
#[derive(Debug)]
pub struct BatchClient {
    http: reqwest::Client,
    base_url: String,
}

impl BatchClient {
    /// Create a client from connection settings.
    ///
    /// The endpoint URL is normalized to end in `/v2`. The auth token, if
    /// present, is attached to every request as a bearer header.
    pub fn new(settings: ConnectionSettings) -> BatchResult<Self> {
        let base_url = normalize_batch_url(&settings.url);

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &settings.auth_token {
            let value = format!("Bearer {token}");
            let mut value = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|e| BatchError::Validation(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .danger_accept_invalid_certs(settings.ssl_mode == SslMode::Insecure)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Submit audio and config for transcription, returning the job id.
    ///
    /// Exactly one of `audio` and the config's `fetch_data` must be
    /// provided. Not idempotent: every call creates a new job.
    ///
    /// A submission that fails on a transient connect error is retried
    /// once; nothing else is retried.
    ///
    /// # Errors
    /// `BatchError::Validation` before any network call on a blank
    /// language or a bad audio/fetch combination; `BatchError::Unauthorized`
    /// / `BatchError::BadRequest` / `BatchError::HttpStatus` on non-2xx
    /// responses.
    pub async fn submit_job(
        &self,
        audio: Option<AudioSource>,
        config: &BatchTranscriptionConfig,
    ) -> BatchResult<String> {
        if !config.transcription_config.has_valid_language() {
            return Err(BatchError::Validation(
                "language must not be blank".to_string(),
            ));
        }
        match (&audio, &config.fetch_data) {
            (Some(_), Some(_)) => {
                return Err(BatchError::Validation(
                    "only one of audio or fetch_data can be set at a time".to_string(),
                ));
            }
            (None, None) => {
                return Err(BatchError::Validation(
                    "either audio or fetch_data must be provided".to_string(),
                ));
            }
            _ => {}
        }

        let config_json = serde_json::to_string(config)?;

        // The file part is read up front so the request can be rebuilt for
        // the retry below.
        let file_part: Option<(String, Vec<u8>)> = match audio {
            Some(AudioSource::File(path)) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "audio".to_string());
                let data = tokio::fs::read(&path).await?;
                Some((filename, data))
            }
            Some(AudioSource::Bytes { filename, data }) => Some((filename, data)),
            None => None,
        };

        let build_form = || {
            let mut form = Form::new().text("config", config_json.clone());
            if let Some((filename, data)) = &file_part {
                form = form.part(
                    "data_file",
                    Part::bytes(data.clone()).file_name(filename.clone()),
                );
            }
            form
        };

        let url = format!("{}/jobs", self.base_url);
        debug!(url = %url, "Submitting job");

        let response = match self.send_multipart(&url, build_form()).await {
            Ok(response) => response,
            // One retry for connect failures, which happen before any part
            // of the request reached the service.
            Err(e) if e.is_connect() => {
                warn!(error = %e, "Job submission failed to connect, retrying once");
                self.send_multipart(&url, build_form()).await?
            }
            Err(e) => return Err(e.into()),
        };

        let response = check_status(response, None).await?;
        let submitted: SubmitResponse = response.json().await?;

        info!(job_id = %submitted.id, "Job submitted");
        Ok(submitted.id)
    }

    /// Fetch the current status of a job.
    ///
    /// Safe to call repeatedly.
    ///
    /// # Errors
    /// `BatchError::JobNotFound` if the service does not know the id.
    pub async fn check_job_status(&self, job_id: &str) -> BatchResult<JobDetails> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.http.get(&url).query(&sdk_query()).send().await?;
        let response = check_status(response, Some(job_id)).await?;
        let envelope: JobResponse = response.json().await?;
        Ok(envelope.job)
    }

    /// List the caller's jobs.
    pub async fn list_jobs(&self) -> BatchResult<Vec<JobDetails>> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.http.get(&url).query(&sdk_query()).send().await?;
        let response = check_status(response, None).await?;
        let envelope: JobsResponse = response.json().await?;
        Ok(envelope.jobs)
    }

    /// Poll until the job reaches a terminal status.
    ///
    /// Polls at a fixed interval: with interval `P` and budget `T` this
    /// issues at most `ceil(T / P)` status checks. On timeout the remote
    /// job is left running; cancelling it is the caller's decision.
    ///
    /// # Errors
    /// - `BatchError::Timeout` if the budget elapses first
    /// - `BatchError::JobRejected` if the job fails
    /// - `BatchError::JobNotFound` if the job disappears (e.g. deleted)
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> BatchResult<JobDetails> {
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let details = self.check_job_status(job_id).await?;
            match details.status {
                JobStatus::Running => {
                    if tokio::time::Instant::now() + poll_interval >= deadline {
                        return Err(BatchError::Timeout {
                            job_id: job_id.to_string(),
                            waited: timeout,
                        });
                    }
                    debug!(job_id = %job_id, "Job still running, polling again");
                    tokio::time::sleep(poll_interval).await;
                }
                JobStatus::Done => {
                    info!(job_id = %job_id, "Job done");
                    return Ok(details);
                }
                JobStatus::Rejected => {
                    return Err(BatchError::JobRejected {
                        id: details.id.clone(),
                        reason: details.error_summary(),
                    });
                }
                JobStatus::Deleted => {
                    return Err(BatchError::JobNotFound(job_id.to_string()));
                }
            }
        }
    }

    /// Fetch the transcript of a completed job in the requested format.
    ///
    /// Safe to call repeatedly.
    ///
    /// # Errors
    /// `BatchError::JobNotFound` if the job is unknown or its transcript
    /// is not available yet.
    pub async fn get_job_result(
        &self,
        job_id: &str,
        format: OutputFormat,
    ) -> BatchResult<Transcript> {
        let url = format!("{}/jobs/{}/transcript", self.base_url, job_id);
        let response = self
            .http
            .get(&url)
            .query(&sdk_query())
            .query(&[("format", format.as_query())])
            .send()
            .await?;
        let response = check_status(response, Some(job_id)).await?;

        match format {
            OutputFormat::JsonV2 => Ok(Transcript::Json(response.json().await?)),
            OutputFormat::Txt | OutputFormat::Srt => {
                Ok(Transcript::Text(response.text().await?))
            }
        }
    }

    /// Delete a job. A running job is only terminated when `force` is set.
    ///
    /// # Errors
    /// `BatchError::JobNotFound` if the service does not know the id.
    pub async fn delete_job(&self, job_id: &str, force: bool) -> BatchResult<JobDetails> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self
            .http
            .delete(&url)
            .query(&sdk_query())
            .query(&[("force", if force { "true" } else { "false" })])
            .send()
            .await?;
        let response = check_status(response, Some(job_id)).await?;
        let envelope: JobResponse = response.json().await?;

        info!(job_id = %job_id, status = ?envelope.job.status, "Job deleted");
        Ok(envelope.job)
    }

    /// Submit a job and block until its transcript is available.
    ///
    /// Convenience composition of [`submit_job`](Self::submit_job),
    /// [`wait_for_completion`](Self::wait_for_completion) and
    /// [`get_job_result`](Self::get_job_result).
    pub async fn transcribe(
        &self,
        audio: Option<AudioSource>,
        config: &BatchTranscriptionConfig,
        format: OutputFormat,
        timeout: Duration,
        poll_interval: Duration,
    ) -> BatchResult<Transcript> {
        let job_id = self.submit_job(audio, config).await?;
        self.wait_for_completion(&job_id, timeout, poll_interval)
            .await?;
        self.get_job_result(&job_id, format).await
    }

    async fn send_multipart(&self, url: &str, form: Form) -> Result<Response, reqwest::Error> {
        self.http
            .post(url)
            .query(&sdk_query())
            .multipart(form)
            .send()
            .await
    }
}

/// Query parameter identifying the client version to the service.
fn sdk_query() -> [(&'static str, String); 1] {
    [("sdk", crate::sdk_tag())]
}

/// Trim a trailing slash and make sure the URL ends with the API version.
fn normalize_batch_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v2") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v2")
    }
}

/// Map non-2xx responses onto the batch error taxonomy.
///
/// 404 becomes `JobNotFound` when a job id is in play, so callers can
/// branch on missing jobs without inspecting status codes.
async fn check_status(response: Response, job_id: Option<&str>) -> BatchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND if job_id.is_some() => {
            BatchError::JobNotFound(job_id.unwrap_or_default().to_string())
        }
        StatusCode::UNAUTHORIZED => BatchError::Unauthorized { body },
        StatusCode::BAD_REQUEST => BatchError::BadRequest { body },
        _ => BatchError::HttpStatus {
            status: status.as_u16(),
            body,
        },
    })
}
