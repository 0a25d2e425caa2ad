//! Backend Client: the only module that talks to the external recommendation service.
//!
//! Reference data, question sets and all scoring rounds go through here.
//! Calls are never retried: a failure ends the current operation and the
//! respondent retries explicitly.
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::catalog::{CareerTrack, Job, JobDetail, ReferenceData};
use crate::models::question::Question;
use crate::models::recommendation::{
    FinalRequest, Recommendation, RecommendRequest, Stage1Outcome, Stage1Request,
};

const HTML_DIAGNOSTIC: &str =
    "received an HTML page instead of JSON; BACKEND_API_URL is probably routed to a web frontend";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response from {path}: {reason}")]
    UnexpectedShape { path: String, reason: String },

    #[error("Backend returned no content for {path}")]
    EmptyBody { path: String },
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and decodes the JSON body. `Ok(None)` means 204 No Content.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<Option<T>, BackendError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| {
                warn!("Backend request to {path} failed: {e}");
                BackendError::Http(e)
            })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!("Backend {path} returned 204");
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Backend {path} returned {status}");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        decode_body(path, content_type.as_deref(), &body).map(Some)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BackendError> {
        debug!("GET {path}");
        let list = self.send(self.client.get(self.url(path)), path).await?;
        Ok(list.unwrap_or_default())
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        debug!("POST {path}");
        self.send(self.client.post(self.url(path)).json(body), path)
            .await?
            .ok_or_else(|| BackendError::EmptyBody {
                path: path.to_string(),
            })
    }

    pub async fn jobs(&self) -> Result<Vec<Job>, BackendError> {
        self.get_list("/jobs").await
    }

    pub async fn job_details(&self) -> Result<Vec<JobDetail>, BackendError> {
        self.get_list("/job-details").await
    }

    pub async fn career_tracks(&self) -> Result<Vec<CareerTrack>, BackendError> {
        self.get_list("/career-tracks").await
    }

    /// Fetches jobs, job details and career tracks concurrently. Any failure fails the whole load.
    pub async fn reference_data(&self) -> Result<ReferenceData, BackendError> {
        let (jobs, job_details, career_tracks) =
            tokio::try_join!(self.jobs(), self.job_details(), self.career_tracks())?;
        Ok(ReferenceData {
            jobs,
            job_details,
            career_tracks,
        })
    }

    /// Questions of one stage, optionally restricted to a track by the backend.
    pub async fn survey_questions(
        &self,
        stage: Option<u8>,
        track: Option<&str>,
    ) -> Result<Vec<Question>, BackendError> {
        let path = "/survey-questions";
        let mut query = Vec::new();
        if let Some(stage) = stage {
            query.push(("stage", stage.to_string()));
        }
        if let Some(track) = track {
            query.push(("track", track.to_string()));
        }
        debug!("GET {path} stage={stage:?} track={track:?}");
        let questions: Vec<Question> = self
            .send(self.client.get(self.url(path)).query(&query), path)
            .await?
            .unwrap_or_default();
        Ok(questions.into_iter().map(Question::normalize).collect())
    }

    pub async fn recommend(&self, req: &RecommendRequest) -> Result<Recommendation, BackendError> {
        self.post("/recommendation", req).await
    }

    pub async fn stage1(&self, req: &Stage1Request) -> Result<Stage1Outcome, BackendError> {
        self.post("/recommendation/stage1", req).await
    }

    pub async fn finalize(&self, req: &FinalRequest) -> Result<Recommendation, BackendError> {
        self.post("/recommendation/final", req).await
    }
}

/// Body text of a failed response, or `HTTP <code>` when the body is empty.
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else if looks_like_html(None, body) {
        HTML_DIAGNOSTIC.to_string()
    } else {
        body.to_string()
    }
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    content_type.is_some_and(|ct| ct.contains("text/html")) || body.trim_start().starts_with('<')
}

/// Decodes a success body, turning HTML or malformed payloads into a diagnostic.
fn decode_body<T: DeserializeOwned>(
    path: &str,
    content_type: Option<&str>,
    body: &str,
) -> Result<T, BackendError> {
    if looks_like_html(content_type, body) {
        return Err(BackendError::UnexpectedShape {
            path: path.to_string(),
            reason: HTML_DIAGNOSTIC.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| BackendError::UnexpectedShape {
        path: path.to_string(),
        reason: format!("response is not the expected JSON: {e}"),
    })
}
