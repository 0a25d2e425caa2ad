//! Survey state machine.
//!
//! `SurveyState` is an immutable record; each transition borrows the current
//! state and returns a new one (or an error, leaving the original untouched).
//! Transitions that need the scoring backend return the candidate state
//! together with a `Submission`; the caller commits the candidate only after
//! the backend answers, via `stage1_scored` or `finalized`.
//!
//! Steps: Intro -> Intake -> Survey1 -> [Survey2] -> Result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::profile::{ProfileDraft, ProfileFacts};
use crate::models::question::Question;
use crate::models::recommendation::{
    FinalRequest, Recommendation, RecommendRequest, Stage1Outcome, Stage1Request,
};
use crate::survey::error::SurveyError;
use crate::survey::filter::filter_questions;
use crate::survey::intake::validate_intake;
use crate::survey::scoring::{apply_option, remove_option, AnswerLog, AnswerRecord, ScoreMap};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurveyFlow {
    /// Trait inference picks a track, then track-specific questions pick the job.
    #[default]
    TwoStage,
    /// One filtered question round scored straight into a job.
    SingleStage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Intro,
    Intake,
    Survey1,
    Survey2,
    Result,
}

/// A scoring request the caller must send before the pending state may be committed.
#[derive(Debug, Clone)]
pub enum Submission {
    Recommend(RecommendRequest),
    Stage1(Stage1Request),
    Final(FinalRequest),
}

#[derive(Debug, Clone)]
pub enum Answered {
    /// More questions remain in this stage.
    Next(SurveyState),
    /// The stage's last question was answered.
    Submit {
        pending: SurveyState,
        submission: Submission,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyState {
    pub flow: SurveyFlow,
    pub step: Step,
    pub user_id: String,
    pub profile: Option<ProfileFacts>,
    /// Filtered questions of the current stage.
    pub questions: Vec<Question>,
    pub index: usize,
    pub stage1_answers: AnswerLog,
    pub stage2_answers: AnswerLog,
    /// Running totals of the current stage.
    pub scores: ScoreMap,
    pub stage1: Option<Stage1Outcome>,
    pub result: Option<Recommendation>,
}

impl SurveyState {
    pub fn new(flow: SurveyFlow, user_id: impl Into<String>) -> Self {
        Self {
            flow,
            step: Step::Intro,
            user_id: user_id.into(),
            profile: None,
            questions: Vec::new(),
            index: 0,
            stage1_answers: AnswerLog::new(),
            stage2_answers: AnswerLog::new(),
            scores: ScoreMap::new(),
            stage1: None,
            result: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.step {
            Step::Survey1 | Step::Survey2 => self.questions.get(self.index),
            _ => None,
        }
    }

    /// `(1-based position, total)` while a survey stage is active.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.current_question()
            .map(|_| (self.index + 1, self.questions.len()))
    }

    fn expect_step(&self, action: &'static str, allowed: &[Step]) -> Result<(), SurveyError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(SurveyError::InvalidTransition {
                action,
                step: self.step,
            })
        }
    }

    fn profile_or(&self, action: &'static str) -> Result<&ProfileFacts, SurveyError> {
        self.profile.as_ref().ok_or(SurveyError::InvalidTransition {
            action,
            step: self.step,
        })
    }

    fn log_mut(&mut self) -> &mut AnswerLog {
        match self.step {
            Step::Survey2 => &mut self.stage2_answers,
            _ => &mut self.stage1_answers,
        }
    }

    /// Intro -> Intake.
    pub fn start(&self) -> Result<SurveyState, SurveyError> {
        self.expect_step("start", &[Step::Intro])?;
        let mut next = self.clone();
        next.step = Step::Intake;
        Ok(next)
    }

    /// Checks that intake is open and validates the form.
    pub fn submit_intake(&self, draft: &ProfileDraft) -> Result<ProfileFacts, SurveyError> {
        self.expect_step("submit intake", &[Step::Intake])?;
        validate_intake(draft)
    }

    /// Intake -> Survey1 with the stage-1 questions this respondent qualifies for.
    pub fn begin_survey(
        &self,
        profile: ProfileFacts,
        stage1_catalog: &[Question],
        base_scores: ScoreMap,
    ) -> Result<SurveyState, SurveyError> {
        self.expect_step("begin survey", &[Step::Intake])?;
        let questions = filter_questions(stage1_catalog, &profile);
        if questions.is_empty() {
            return Err(SurveyError::NoQuestions {
                stage: 1,
                track: None,
            });
        }
        debug!(
            "Stage 1 begins with {} of {} questions",
            questions.len(),
            stage1_catalog.len()
        );

        let mut next = self.clone();
        next.step = Step::Survey1;
        next.profile = Some(profile);
        next.questions = questions;
        next.index = 0;
        next.stage1_answers = AnswerLog::new();
        next.stage2_answers = AnswerLog::new();
        next.scores = base_scores;
        next.stage1 = None;
        next.result = None;
        Ok(next)
    }

    /// Records the chosen option of the current question.
    pub fn answer(&self, option_id: &str) -> Result<Answered, SurveyError> {
        self.expect_step("answer", &[Step::Survey1, Step::Survey2])?;
        let question = self
            .current_question()
            .ok_or(SurveyError::InvalidTransition {
                action: "answer",
                step: self.step,
            })?;
        let option = question
            .option(option_id)
            .ok_or_else(|| SurveyError::UnknownOption {
                question_id: question.id.clone(),
                option_id: option_id.to_string(),
            })?
            .clone();

        let mut next = self.clone();
        let introduced = apply_option(&mut next.scores, &option);
        next.log_mut().push(AnswerRecord {
            question_id: question.id.clone(),
            option_id: option.id.clone(),
            option,
            introduced,
        });

        if next.index + 1 < next.questions.len() {
            next.index += 1;
            return Ok(Answered::Next(next));
        }

        let profile = next.profile_or("answer")?.clone();
        let submission = match (self.flow, self.step) {
            (SurveyFlow::SingleStage, _) => Submission::Recommend(RecommendRequest {
                answers: next.stage1_answers.clone(),
                profile,
                user_id: next.user_id.clone(),
            }),
            (SurveyFlow::TwoStage, Step::Survey1) => Submission::Stage1(Stage1Request {
                answers: next.stage1_answers.clone(),
                profile,
                user_id: next.user_id.clone(),
            }),
            (SurveyFlow::TwoStage, _) => {
                let track = next
                    .stage1
                    .as_ref()
                    .map(|s| s.top_track.clone())
                    .ok_or(SurveyError::InvalidTransition {
                        action: "answer",
                        step: self.step,
                    })?;
                Submission::Final(FinalRequest {
                    stage1_answers: next.stage1_answers.clone(),
                    stage2_answers: next.stage2_answers.clone(),
                    track,
                    profile,
                    user_id: next.user_id.clone(),
                })
            }
        };

        Ok(Answered::Submit {
            pending: next,
            submission,
        })
    }

    /// Survey1 -> Survey2 once the stage-1 scorer picked a track.
    /// `stage2_catalog` must already be restricted to that track.
    pub fn stage1_scored(
        &self,
        outcome: Stage1Outcome,
        stage2_catalog: &[Question],
        base_scores: ScoreMap,
    ) -> Result<SurveyState, SurveyError> {
        self.expect_step("enter stage 2", &[Step::Survey1])?;
        if self.flow != SurveyFlow::TwoStage {
            return Err(SurveyError::InvalidTransition {
                action: "enter stage 2",
                step: self.step,
            });
        }
        let profile = self.profile_or("enter stage 2")?;
        let questions = filter_questions(stage2_catalog, profile);
        if questions.is_empty() {
            return Err(SurveyError::NoQuestions {
                stage: 2,
                track: Some(outcome.top_track),
            });
        }
        debug!(
            "Stage 2 begins for track {} with {} questions",
            outcome.top_track,
            questions.len()
        );

        let mut next = self.clone();
        next.step = Step::Survey2;
        next.questions = questions;
        next.index = 0;
        next.stage2_answers = AnswerLog::new();
        next.scores = base_scores;
        next.stage1 = Some(outcome);
        Ok(next)
    }

    /// Final survey stage -> Result.
    pub fn finalized(&self, recommendation: Recommendation) -> Result<SurveyState, SurveyError> {
        let final_step = match self.flow {
            SurveyFlow::SingleStage => Step::Survey1,
            SurveyFlow::TwoStage => Step::Survey2,
        };
        self.expect_step("finish", &[final_step])?;
        let mut next = self.clone();
        next.step = Step::Result;
        next.result = Some(recommendation.with_ranking());
        Ok(next)
    }

    /// One step back. Inside a stage this pops the last answer and reverses
    /// its score; from a stage's first question it returns to intake.
    pub fn back(&self) -> Result<SurveyState, SurveyError> {
        let mut next = self.clone();
        match self.step {
            Step::Survey1 | Step::Survey2 if self.index > 0 => {
                let record = next.log_mut().pop().ok_or(SurveyError::InvalidTransition {
                    action: "go back",
                    step: self.step,
                })?;
                remove_option(&mut next.scores, &record.option, &record.introduced);
                next.index -= 1;
            }
            Step::Survey1 | Step::Survey2 => {
                next.step = Step::Intake;
                next.questions = Vec::new();
                next.index = 0;
                next.stage1_answers = AnswerLog::new();
                next.stage2_answers = AnswerLog::new();
                next.scores = ScoreMap::new();
                next.stage1 = None;
            }
            Step::Intake => next.step = Step::Intro,
            Step::Intro | Step::Result => {
                return Err(SurveyError::InvalidTransition {
                    action: "go back",
                    step: self.step,
                })
            }
        }
        Ok(next)
    }

    /// Retry: a fresh pass with the same flow and respondent.
    pub fn reset(&self) -> SurveyState {
        SurveyState::new(self.flow, self.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{CodingExp, Major};
    use crate::models::question::{AnswerOption, Condition};
    use crate::survey::selector::select_top;

    fn opt(id: &str, score: &[(&str, i64)]) -> AnswerOption {
        AnswerOption {
            id: id.to_string(),
            text: id.to_string(),
            score: score.iter().map(|(k, v)| (*k, *v)).collect(),
            ..AnswerOption::default()
        }
    }

    fn question(id: &str, options: Vec<AnswerOption>) -> Question {
        Question {
            id: id.to_string(),
            text: id.to_string(),
            stage: 1,
            track: None,
            options,
            condition: None,
        }
    }

    fn jobs_catalog() -> Vec<Question> {
        let mut it_only = question("q2", vec![opt("be", &[("backend", 10)])]);
        it_only.condition = Some(Condition {
            or: None,
            requirements: [("major".to_string(), "it".to_string())].into_iter().collect(),
        });
        vec![
            question("q1", vec![opt("fe", &[("frontend", 5)]), opt("be", &[("backend", 5)])]),
            it_only,
            question("q3", vec![opt("fe", &[("frontend", 5)]), opt("ai", &[("ai", 5)])]),
        ]
    }

    fn non_it_draft() -> ProfileDraft {
        ProfileDraft {
            major: Some(Major::NonIt),
            coding_exp: Some(CodingExp::No),
            ..Default::default()
        }
    }

    fn job_ids() -> ScoreMap {
        ScoreMap::zeroed(["frontend", "backend", "ai"])
    }

    fn in_survey(flow: SurveyFlow) -> SurveyState {
        let state = SurveyState::new(flow, "tester").start().unwrap();
        let profile = state.submit_intake(&non_it_draft()).unwrap();
        state.begin_survey(profile, &jobs_catalog(), job_ids()).unwrap()
    }

    fn next(answered: Answered) -> SurveyState {
        match answered {
            Answered::Next(s) => s,
            Answered::Submit { .. } => panic!("unexpected submission"),
        }
    }

    #[test]
    fn test_start_only_from_intro() {
        let intake = SurveyState::new(SurveyFlow::TwoStage, "u").start().unwrap();
        assert_eq!(intake.step, Step::Intake);
        assert!(matches!(
            intake.start(),
            Err(SurveyError::InvalidTransition { step: Step::Intake, .. })
        ));
    }

    #[test]
    fn test_invalid_intake_blocks_transition() {
        let intake = SurveyState::new(SurveyFlow::TwoStage, "u").start().unwrap();
        let err = intake.submit_intake(&ProfileDraft::default()).unwrap_err();
        assert!(matches!(err, SurveyError::Validation(ref m) if m.len() == 2));
        assert_eq!(intake.step, Step::Intake);
    }

    #[test]
    fn test_filtered_questions_skip_it_only() {
        let state = in_survey(SurveyFlow::SingleStage);
        let ids: Vec<_> = state.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
        assert_eq!(state.progress(), Some((1, 2)));
    }

    #[test]
    fn test_single_stage_all_frontend_answers() {
        let state = in_survey(SurveyFlow::SingleStage);
        let state = next(state.answer("fe").unwrap());
        match state.answer("fe").unwrap() {
            Answered::Submit {
                pending,
                submission: Submission::Recommend(req),
            } => {
                let expected: ScoreMap = [("frontend", 10), ("backend", 0), ("ai", 0)]
                    .into_iter()
                    .collect();
                assert_eq!(pending.scores, expected);
                assert_eq!(select_top(&pending.scores), Some("frontend"));
                assert_eq!(req.answers.len(), 2);
                assert_eq!(req.user_id, "tester");
                // Pending state stays on the last question until committed.
                assert_eq!(pending.index, 1);
                assert_eq!(pending.step, Step::Survey1);
            }
            other => panic!("expected recommend submission, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let state = in_survey(SurveyFlow::SingleStage);
        assert!(matches!(
            state.answer("nope"),
            Err(SurveyError::UnknownOption { ref option_id, .. }) if option_id == "nope"
        ));
    }

    #[test]
    fn test_back_reverses_last_answer_exactly() {
        let state = in_survey(SurveyFlow::SingleStage);
        let before = state.scores.clone();
        let answered = next(state.answer("be").unwrap());
        assert_eq!(answered.scores.get("backend"), Some(5));

        let back = answered.back().unwrap();
        assert_eq!(back.scores, before);
        assert_eq!(back.index, 0);
        assert!(back.stage1_answers.is_empty());
    }

    #[test]
    fn test_back_drops_ids_the_answer_introduced() {
        let catalog = vec![
            question("q1", vec![opt("fe", &[("frontend", 5)])]),
            question("q2", vec![opt("ops", &[("devops", 4), ("backend", 1)])]),
            question("q3", vec![opt("ai", &[("ai", 5)])]),
        ];
        let state = SurveyState::new(SurveyFlow::SingleStage, "tester").start().unwrap();
        let profile = state.submit_intake(&non_it_draft()).unwrap();
        let state = state.begin_survey(profile, &catalog, job_ids()).unwrap();
        let state = next(state.answer("fe").unwrap());
        let before = state.scores.clone();

        let answered = next(state.answer("ops").unwrap());
        assert_eq!(answered.scores.get("devops"), Some(4));

        let back = answered.back().unwrap();
        assert_eq!(back.scores, before);
        assert_eq!(back.scores.get("devops"), None);
        assert_eq!(
            serde_json::to_value(&back.scores).unwrap(),
            serde_json::json!({"frontend": 5, "backend": 0, "ai": 0})
        );
    }

    #[test]
    fn test_back_from_first_question_returns_to_intake() {
        let state = in_survey(SurveyFlow::TwoStage);
        let back = state.back().unwrap();
        assert_eq!(back.step, Step::Intake);
        assert!(back.questions.is_empty());
        assert_eq!(back.back().unwrap().step, Step::Intro);
    }

    #[test]
    fn test_back_not_allowed_from_intro() {
        let intro = SurveyState::new(SurveyFlow::TwoStage, "u");
        assert!(intro.back().is_err());
    }

    #[test]
    fn test_two_stage_flow_reaches_result() {
        let state = in_survey(SurveyFlow::TwoStage);
        let state = next(state.answer("be").unwrap());
        let (pending, req) = match state.answer("ai").unwrap() {
            Answered::Submit {
                pending,
                submission: Submission::Stage1(req),
            } => (pending, req),
            other => panic!("expected stage1 submission, got {other:?}"),
        };
        assert_eq!(req.answers.len(), 2);

        let mut s2 = question("s2", vec![opt("db", &[("backend", 7)])]);
        s2.stage = 2;
        s2.track = Some("backend".to_string());
        let outcome = Stage1Outcome {
            top_track: "backend".to_string(),
            trait_scores: ScoreMap::new(),
            confidence: Some(0.6),
        };
        let stage2 = pending
            .stage1_scored(outcome, &[s2], ScoreMap::zeroed(["backend"]))
            .unwrap();
        assert_eq!(stage2.step, Step::Survey2);
        assert_eq!(stage2.stage1_answers.len(), 2);

        let (pending, req) = match stage2.answer("db").unwrap() {
            Answered::Submit {
                pending,
                submission: Submission::Final(req),
            } => (pending, req),
            other => panic!("expected final submission, got {other:?}"),
        };
        assert_eq!(req.track, "backend");
        assert_eq!(req.stage1_answers.len(), 2);
        assert_eq!(req.stage2_answers.len(), 1);

        let done = pending
            .finalized(Recommendation {
                top_job: "backend".to_string(),
                top_track: Some("backend".to_string()),
                top_subfield: None,
                scores: pending.scores.clone(),
                ranking: vec![],
                trait_scores: ScoreMap::new(),
                skill_scores: ScoreMap::new(),
                readiness: None,
                confidence: None,
            })
            .unwrap();
        assert_eq!(done.step, Step::Result);
        assert_eq!(done.result.as_ref().unwrap().ranking[0].job_id, "backend");
        assert!(done.back().is_err());

        let fresh = done.reset();
        assert_eq!(fresh.step, Step::Intro);
        assert_eq!(fresh.flow, SurveyFlow::TwoStage);
        assert!(fresh.result.is_none());
    }

    #[test]
    fn test_stage2_without_questions_is_error() {
        let state = in_survey(SurveyFlow::TwoStage);
        let state = next(state.answer("be").unwrap());
        let pending = match state.answer("ai").unwrap() {
            Answered::Submit { pending, .. } => pending,
            other => panic!("expected submission, got {other:?}"),
        };
        let outcome = Stage1Outcome {
            top_track: "backend".to_string(),
            trait_scores: ScoreMap::new(),
            confidence: None,
        };
        let err = pending.stage1_scored(outcome, &[], ScoreMap::new()).unwrap_err();
        assert_eq!(
            err,
            SurveyError::NoQuestions {
                stage: 2,
                track: Some("backend".to_string())
            }
        );
        assert_eq!(
            err.to_string(),
            "No questions available for stage 2 (track 'backend')"
        );
    }

    #[test]
    fn test_empty_stage1_is_error() {
        let intake = SurveyState::new(SurveyFlow::TwoStage, "u").start().unwrap();
        let profile = intake.submit_intake(&non_it_draft()).unwrap();
        let it_only = vec![jobs_catalog().remove(1)];
        assert!(matches!(
            intake.begin_survey(profile, &it_only, ScoreMap::new()),
            Err(SurveyError::NoQuestions { stage: 1, .. })
        ));
    }
}
