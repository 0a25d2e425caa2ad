use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileFacts;
use crate::survey::scoring::{AnswerLog, ScoreMap};
use crate::survey::selector::rank;

/// Result of the stage-1 (trait inference) round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stage1Outcome {
    pub top_track: String,
    #[serde(default)]
    pub trait_scores: ScoreMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedJob {
    #[serde(alias = "id")]
    pub job_id: String,
    pub score: i64,
}

/// Final recommendation for one completed survey pass. Immutable until reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub top_job: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_subfield: Option<String>,
    #[serde(default)]
    pub scores: ScoreMap,
    #[serde(default)]
    pub ranking: Vec<RankedJob>,
    #[serde(default)]
    pub trait_scores: ScoreMap,
    #[serde(default)]
    pub skill_scores: ScoreMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Recommendation {
    /// Fills `ranking` from `scores` when the producer left it empty.
    pub fn with_ranking(mut self) -> Self {
        if self.ranking.is_empty() {
            self.ranking = rank(&self.scores)
                .into_iter()
                .map(|job_id| RankedJob {
                    score: self.scores.get(&job_id).unwrap_or(0),
                    job_id,
                })
                .collect();
        }
        self
    }
}

/// Body of `POST /recommendation` (single-stage flow).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub answers: AnswerLog,
    pub profile: ProfileFacts,
    pub user_id: String,
}

/// Body of `POST /recommendation/stage1`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage1Request {
    pub answers: AnswerLog,
    pub profile: ProfileFacts,
    pub user_id: String,
}

/// Body of `POST /recommendation/final`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRequest {
    pub stage1_answers: AnswerLog,
    pub stage2_answers: AnswerLog,
    pub track: String,
    pub profile: ProfileFacts,
    pub user_id: String,
}
