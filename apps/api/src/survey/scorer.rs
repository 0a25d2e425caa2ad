//! Scoring backends: pluggable, trait-based scorers behind the survey flow.
//!
//! `LocalSurveyScorer` evaluates answers against an in-memory catalog
//! (pure Rust, deterministic, fully testable).
//! `RemoteSurveyScorer` delegates every round to the external backend.
//!
//! `AppState` holds an `Arc<dyn SurveyScorer>`, chosen at startup via `SCORING_MODE`.

use anyhow::anyhow;
use async_trait::async_trait;

use crate::backend_client::BackendClient;
use crate::errors::AppError;
use crate::models::catalog::{Catalog, ReferenceData};
use crate::models::profile::ProfileFacts;
use crate::models::question::{AnswerOption, Question};
use crate::models::recommendation::{
    FinalRequest, Recommendation, RecommendRequest, Stage1Outcome, Stage1Request,
};
use crate::survey::filter::select_stage;
use crate::survey::scoring::{apply_option, AnswerLog, ScoreMap};
use crate::survey::selector::{confidence, select_top, select_top_subfield};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SurveyScorer: Send + Sync {
    /// "local" | "remote", for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn reference_data(&self) -> Result<ReferenceData, AppError>;

    /// Questions of `stage`, restricted to `track` when given. Profile
    /// conditions are evaluated by the caller.
    async fn questions(&self, stage: u8, track: Option<&str>) -> Result<Vec<Question>, AppError>;

    /// The job-scoring question pool of the single-stage flow.
    async fn single_stage_questions(&self) -> Result<Vec<Question>, AppError>;

    async fn recommend(&self, req: &RecommendRequest) -> Result<Recommendation, AppError>;

    async fn stage1(&self, req: &Stage1Request) -> Result<Stage1Outcome, AppError>;

    async fn finalize(&self, req: &FinalRequest) -> Result<Recommendation, AppError>;
}

/// Zeroed totals over every career track, in catalog order.
pub fn track_base(reference: &ReferenceData) -> ScoreMap {
    ScoreMap::zeroed(reference.career_tracks.iter().map(|t| t.id.clone()))
}

/// Zeroed totals over the jobs of `track` (all jobs when no job belongs to it).
pub fn job_base(reference: &ReferenceData, track: Option<&str>) -> ScoreMap {
    let in_track: Vec<String> = match track {
        Some(t) => reference
            .jobs
            .iter()
            .filter(|j| j.track.as_deref() == Some(t))
            .map(|j| j.id.clone())
            .collect(),
        None => Vec::new(),
    };
    if in_track.is_empty() {
        ScoreMap::zeroed(reference.jobs.iter().map(|j| j.id.clone()))
    } else {
        ScoreMap::zeroed(in_track)
    }
}

/// Readiness from the coding level; no coding experience counts as 0.
fn readiness(profile: &ProfileFacts) -> Option<f64> {
    Some(profile.coding_level.map_or(0.0, |l| l.readiness()))
}

// ────────────────────────────────────────────────────────────────────────────
// LocalSurveyScorer
// ────────────────────────────────────────────────────────────────────────────

/// Client-side scoring over a bundled catalog.
///
/// - stage 1: `option.score` is keyed by track; the top track wins.
/// - final / single stage: `option.score` is keyed by job; the top job wins,
///   its best subfield comes from `subfieldScores`.
/// - trait and skill totals are summed over every answer.
pub struct LocalSurveyScorer {
    catalog: Catalog,
}

impl LocalSurveyScorer {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    fn option(&self, question_id: &str, option_id: &str) -> Result<&AnswerOption, AppError> {
        self.catalog
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .and_then(|q| q.option(option_id))
            .ok_or_else(|| {
                AppError::Validation(vec![format!(
                    "Question {question_id} has no option {option_id}"
                )])
            })
    }

    fn chosen<'a>(&'a self, logs: &[&AnswerLog]) -> Result<Vec<&'a AnswerOption>, AppError> {
        logs.iter()
            .copied()
            .flat_map(|log| log.records())
            .map(|r| self.option(&r.question_id, &r.option_id))
            .collect()
    }

    fn score_jobs(
        &self,
        chosen_for_jobs: &[&AnswerOption],
        all_chosen: &[&AnswerOption],
        base: ScoreMap,
        track: Option<String>,
        readiness: Option<f64>,
    ) -> Result<Recommendation, AppError> {
        let mut scores = base;
        let mut subfields = ScoreMap::new();
        for option in chosen_for_jobs {
            apply_option(&mut scores, option);
            subfields.merge(&option.subfield_scores);
        }
        let mut trait_scores = ScoreMap::new();
        let mut skill_scores = ScoreMap::new();
        for option in all_chosen {
            trait_scores.merge(&option.traits);
            skill_scores.merge(&option.skills);
        }

        let top_job = select_top(&scores)
            .ok_or_else(|| anyhow!("Catalog defines no jobs to recommend"))?
            .to_string();
        let top_subfield = self
            .catalog
            .reference
            .job(&top_job)
            .and_then(|job| select_top_subfield(job, &subfields));

        Ok(Recommendation {
            confidence: Some(confidence(&scores)),
            top_job,
            top_track: track,
            top_subfield,
            scores,
            ranking: Vec::new(),
            trait_scores,
            skill_scores,
            readiness,
        }
        .with_ranking())
    }
}

#[async_trait]
impl SurveyScorer for LocalSurveyScorer {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn reference_data(&self) -> Result<ReferenceData, AppError> {
        Ok(self.catalog.reference.clone())
    }

    async fn questions(&self, stage: u8, track: Option<&str>) -> Result<Vec<Question>, AppError> {
        Ok(select_stage(&self.catalog.questions, stage, track))
    }

    async fn single_stage_questions(&self) -> Result<Vec<Question>, AppError> {
        Ok(select_stage(&self.catalog.questions, 2, None))
    }

    async fn recommend(&self, req: &RecommendRequest) -> Result<Recommendation, AppError> {
        let chosen = self.chosen(&[&req.answers])?;
        let base = job_base(&self.catalog.reference, None);
        self.score_jobs(&chosen, &chosen, base, None, readiness(&req.profile))
    }

    async fn stage1(&self, req: &Stage1Request) -> Result<Stage1Outcome, AppError> {
        let chosen = self.chosen(&[&req.answers])?;
        let mut tracks = track_base(&self.catalog.reference);
        let mut trait_scores = ScoreMap::new();
        for option in &chosen {
            apply_option(&mut tracks, option);
            trait_scores.merge(&option.traits);
        }
        let top_track = select_top(&tracks)
            .ok_or_else(|| anyhow!("Catalog defines no career tracks"))?
            .to_string();
        Ok(Stage1Outcome {
            top_track,
            trait_scores,
            confidence: Some(confidence(&tracks)),
        })
    }

    async fn finalize(&self, req: &FinalRequest) -> Result<Recommendation, AppError> {
        let stage2 = self.chosen(&[&req.stage2_answers])?;
        let all = self.chosen(&[&req.stage1_answers, &req.stage2_answers])?;
        let base = job_base(&self.catalog.reference, Some(&req.track));
        self.score_jobs(
            &stage2,
            &all,
            base,
            Some(req.track.clone()),
            readiness(&req.profile),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteSurveyScorer
// ────────────────────────────────────────────────────────────────────────────

/// Scoring performed by the external recommendation backend.
pub struct RemoteSurveyScorer(pub BackendClient);

#[async_trait]
impl SurveyScorer for RemoteSurveyScorer {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn reference_data(&self) -> Result<ReferenceData, AppError> {
        Ok(self.0.reference_data().await?)
    }

    async fn questions(&self, stage: u8, track: Option<&str>) -> Result<Vec<Question>, AppError> {
        Ok(self.0.survey_questions(Some(stage), track).await?)
    }

    async fn single_stage_questions(&self) -> Result<Vec<Question>, AppError> {
        Ok(self.0.survey_questions(None, None).await?)
    }

    async fn recommend(&self, req: &RecommendRequest) -> Result<Recommendation, AppError> {
        Ok(self.0.recommend(req).await?)
    }

    async fn stage1(&self, req: &Stage1Request) -> Result<Stage1Outcome, AppError> {
        Ok(self.0.stage1(req).await?)
    }

    async fn finalize(&self, req: &FinalRequest) -> Result<Recommendation, AppError> {
        Ok(self.0.finalize(req).await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
