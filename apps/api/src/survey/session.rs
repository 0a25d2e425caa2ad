//! Survey sessions: the async driver around `SurveyState`.
//!
//! A session commits a new state only after every external call of the
//! transition succeeded. On failure the previous state stays in place and the
//! user-facing message is kept in `error` until the next successful transition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::catalog::{Job, JobDetail, ReferenceData};
use crate::models::profile::{ProfileDraft, ProfileFacts};
use crate::models::recommendation::{Recommendation, Stage1Outcome};
use crate::survey::machine::{Answered, Step, Submission, SurveyFlow, SurveyState};
use crate::survey::scorer::{job_base, track_base, SurveyScorer};
use crate::survey::scoring::ScoreMap;

pub struct SurveySession {
    pub id: Uuid,
    pub state: SurveyState,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveySession {
    pub fn new(flow: SurveyFlow, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: SurveyState::new(flow, user_id),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the last committed transition is older than `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.updated_at)
            .to_std()
            .map_or(false, |idle| idle > ttl)
    }

    fn commit(&mut self, next: SurveyState) {
        if next.step != self.state.step {
            info!(
                "Survey {} moved {:?} -> {:?}",
                self.id, self.state.step, next.step
            );
        }
        self.state = next;
        self.error = None;
        self.updated_at = Utc::now();
    }

    fn settle<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        result.map_err(|e| {
            warn!("Survey {} transition failed at {:?}: {e}", self.id, self.state.step);
            self.error = Some(e.user_message());
            e
        })
    }

    pub fn start(&mut self) -> Result<(), AppError> {
        let result = self.state.start().map_err(AppError::from);
        let next = self.settle(result)?;
        self.commit(next);
        Ok(())
    }

    /// Validates intake, loads this flow's first question set and enters the survey.
    pub async fn submit_intake(
        &mut self,
        draft: &ProfileDraft,
        scorer: &dyn SurveyScorer,
        reference: &ReferenceData,
    ) -> Result<(), AppError> {
        let result = self.begin(draft, scorer, reference).await;
        let next = self.settle(result)?;
        self.commit(next);
        Ok(())
    }

    async fn begin(
        &self,
        draft: &ProfileDraft,
        scorer: &dyn SurveyScorer,
        reference: &ReferenceData,
    ) -> Result<SurveyState, AppError> {
        let profile = self.state.submit_intake(draft)?;
        let (catalog, base) = match self.state.flow {
            SurveyFlow::TwoStage => (scorer.questions(1, None).await?, track_base(reference)),
            SurveyFlow::SingleStage => (
                scorer.single_stage_questions().await?,
                job_base(reference, None),
            ),
        };
        Ok(self.state.begin_survey(profile, &catalog, base)?)
    }

    /// Answers the current question; the last answer of a stage triggers its scoring round.
    pub async fn answer(
        &mut self,
        option_id: &str,
        scorer: &dyn SurveyScorer,
        reference: &ReferenceData,
    ) -> Result<(), AppError> {
        let result = self.advance(option_id, scorer, reference).await;
        let next = self.settle(result)?;
        self.commit(next);
        Ok(())
    }

    async fn advance(
        &self,
        option_id: &str,
        scorer: &dyn SurveyScorer,
        reference: &ReferenceData,
    ) -> Result<SurveyState, AppError> {
        let (pending, submission) = match self.state.answer(option_id)? {
            Answered::Next(next) => return Ok(next),
            Answered::Submit {
                pending,
                submission,
            } => (pending, submission),
        };

        match submission {
            Submission::Recommend(req) => {
                let recommendation = scorer.recommend(&req).await?;
                Ok(pending.finalized(recommendation)?)
            }
            Submission::Stage1(req) => {
                let outcome = scorer.stage1(&req).await?;
                info!(
                    "Survey {} stage 1 scored by {} backend: track {}",
                    self.id,
                    scorer.backend(),
                    outcome.top_track
                );
                let questions = scorer.questions(2, Some(&outcome.top_track)).await?;
                let base = job_base(reference, Some(&outcome.top_track));
                Ok(pending.stage1_scored(outcome, &questions, base)?)
            }
            Submission::Final(req) => {
                let recommendation = scorer.finalize(&req).await?;
                info!(
                    "Survey {} finished: top job {}",
                    self.id, recommendation.top_job
                );
                Ok(pending.finalized(recommendation)?)
            }
        }
    }

    pub fn back(&mut self) -> Result<(), AppError> {
        let result = self.state.back().map_err(AppError::from);
        let next = self.settle(result)?;
        self.commit(next);
        Ok(())
    }

    pub fn reset(&mut self) {
        let fresh = self.state.reset();
        self.commit(fresh);
    }

    pub fn view(&self, reference: &ReferenceData) -> SurveyView {
        let state = &self.state;
        SurveyView {
            id: self.id,
            flow: state.flow,
            step: state.step,
            progress: state.progress().map(|(current, total)| Progress { current, total }),
            question: state.current_question().map(|q| QuestionView {
                id: q.id.clone(),
                text: q.text.clone(),
                options: q
                    .options
                    .iter()
                    .map(|o| OptionView {
                        id: o.id.clone(),
                        text: o.text.clone(),
                    })
                    .collect(),
            }),
            scores: match state.step {
                Step::Survey1 | Step::Survey2 => state.scores.clone(),
                _ => ScoreMap::new(),
            },
            profile: state.profile.clone(),
            stage1: state.stage1.clone(),
            result: state
                .result
                .as_ref()
                .map(|rec| ResultView::build(rec, reference)),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Views
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    pub id: Uuid,
    pub flow: SurveyFlow,
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub scores: ScoreMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1: Option<Stage1Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// A question as shown to the respondent: option points stay server-side.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<JobDetail>,
    pub bars: Vec<ScoreBar>,
}

/// One row of the score chart, scaled against the best score.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBar {
    pub job_id: String,
    pub label: String,
    pub score: i64,
    pub percent_of_top: f64,
}

impl ResultView {
    fn build(rec: &Recommendation, reference: &ReferenceData) -> Self {
        let top = rec.ranking.iter().map(|r| r.score).max().unwrap_or(0);
        let bars = rec
            .ranking
            .iter()
            .map(|r| ScoreBar {
                job_id: r.job_id.clone(),
                label: reference
                    .job(&r.job_id)
                    .map(|j| j.name.clone())
                    .unwrap_or_else(|| r.job_id.clone()),
                score: r.score,
                percent_of_top: if top > 0 {
                    (r.score.max(0) as f64 / top as f64 * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                },
            })
            .collect();

        Self {
            recommendation: rec.clone(),
            job: reference.job(&rec.top_job).cloned(),
            detail: reference.job_detail(&rec.top_job).cloned(),
            bars,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

/// In-memory sessions. Each session has its own lock, held across its
/// external calls so one respondent's requests run strictly in order.
///
/// A session idle for longer than the TTL is treated as gone: `get` reports
/// it as not found, and `purge_expired` drops it from the map. Sessions whose
/// lock is held are in use and never expire.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SurveySession>>>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self, flow: SurveyFlow, user_id: String) -> Arc<Mutex<SurveySession>> {
        let session = SurveySession::new(flow, user_id);
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.inner.write().await.insert(id, handle.clone());
        info!("Created survey {id} ({flow:?})");
        handle
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<SurveySession>>, AppError> {
        let handle = self
            .inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))?;

        if self.expired(&handle, Utc::now()) {
            self.inner.write().await.remove(&id);
            info!("Survey {id} expired after {}s idle", self.ttl.as_secs());
            return Err(not_found(id));
        }
        Ok(handle)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    /// Drops every expired session; returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| !self.expired(handle, now));
        let purged = before - sessions.len();
        if purged > 0 {
            info!("Purged {purged} idle surveys, {} remain", sessions.len());
        }
        purged
    }

    /// Runs `purge_expired` every `every` on a background task.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.purge_expired().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    fn expired(&self, handle: &Mutex<SurveySession>, now: DateTime<Utc>) -> bool {
        match handle.try_lock() {
            Ok(session) => session.is_expired(now, self.ttl),
            Err(_) => false,
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Survey {id} not found"))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
