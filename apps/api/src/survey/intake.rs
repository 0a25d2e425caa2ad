use crate::models::profile::{CodingExp, Major, ProfileDraft, ProfileFacts};
use crate::survey::error::SurveyError;

pub const MISSING_MAJOR: &str = "Please select whether your major is IT-related.";
pub const MISSING_IT_MAJOR_DETAIL: &str = "Please select your IT major.";
pub const MISSING_CODING_EXP: &str = "Please select whether you have coding experience.";
pub const MISSING_CODING_LEVEL: &str = "Please select your coding experience level.";

/// Turns the intake form into `ProfileFacts`.
///
/// Every missing field produces its own message; all are reported together.
/// Follow-up answers that no longer apply (an IT sub-major after choosing
/// "non-it", a level after "no" experience) are dropped rather than carried
/// into question filtering.
pub fn validate_intake(draft: &ProfileDraft) -> Result<ProfileFacts, SurveyError> {
    let mut missing = Vec::new();

    match draft.major {
        None => missing.push(MISSING_MAJOR.to_string()),
        Some(Major::It) if draft.it_major_detail.is_none() => {
            missing.push(MISSING_IT_MAJOR_DETAIL.to_string())
        }
        Some(_) => {}
    }

    match draft.coding_exp {
        None => missing.push(MISSING_CODING_EXP.to_string()),
        Some(CodingExp::Yes) if draft.coding_level.is_none() => {
            missing.push(MISSING_CODING_LEVEL.to_string())
        }
        Some(_) => {}
    }

    match (draft.major, draft.coding_exp) {
        (Some(major), Some(coding_exp)) if missing.is_empty() => Ok(ProfileFacts {
            major,
            it_major_detail: match major {
                Major::It => draft.it_major_detail,
                Major::NonIt => None,
            },
            coding_exp,
            coding_level: match coding_exp {
                CodingExp::Yes => draft.coding_level,
                CodingExp::No => None,
            },
        }),
        _ => Err(SurveyError::Validation(missing)),
    }
}
