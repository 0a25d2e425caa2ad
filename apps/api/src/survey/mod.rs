// Survey engine
// Implements: intake validation, condition filtering, score accumulation,
// recommendation selection, the two-stage orchestrator and its sessions.
// Scoring goes through the SurveyScorer trait; only RemoteSurveyScorer talks
// to the backend.

pub mod error;
pub mod filter;
pub mod handlers;
pub mod intake;
pub mod machine;
pub mod scorer;
pub mod scoring;
pub mod selector;
pub mod session;
