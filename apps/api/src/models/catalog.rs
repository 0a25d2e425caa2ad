use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::question::{deserialize_id, Question};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default)]
    pub subfields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(deserialize_with = "deserialize_id")]
    pub job_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub similar_jobs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CareerTrack {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Jobs, job details and career tracks: the data every result screen needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub jobs: Vec<Job>,
    pub job_details: Vec<JobDetail>,
    pub career_tracks: Vec<CareerTrack>,
}

impl ReferenceData {
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn job_detail(&self, job_id: &str) -> Option<&JobDetail> {
        self.job_details.iter().find(|d| d.job_id == job_id)
    }
}

/// Full local catalog: reference data plus every question of both stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(flatten)]
    pub reference: ReferenceData,
    pub questions: Vec<Question>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut catalog: Catalog =
            serde_json::from_str(raw).context("Question catalog is not valid JSON")?;
        catalog.questions = catalog
            .questions
            .into_iter()
            .map(Question::normalize)
            .collect();
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question catalog at {}", path.display()))?;
        let catalog = Self::from_json(&raw)?;
        info!(
            "Loaded catalog from {}: {} jobs, {} tracks, {} questions",
            path.display(),
            catalog.reference.jobs.len(),
            catalog.reference.career_tracks.len(),
            catalog.questions.len()
        );
        Ok(catalog)
    }
}
