use thiserror::Error;

use crate::survey::machine::Step;

/// Domain errors raised by survey transitions. None of them change state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SurveyError {
    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Question {question_id} has no option {option_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("Cannot {action} while at step {step:?}")]
    InvalidTransition { action: &'static str, step: Step },

    #[error("No questions available for stage {stage}{}", track_suffix(.track))]
    NoQuestions { stage: u8, track: Option<String> },
}

fn track_suffix(track: &Option<String>) -> String {
    match track {
        Some(t) => format!(" (track '{t}')"),
        None => String::new(),
    }
}
