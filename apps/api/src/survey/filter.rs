use tracing::debug;

use crate::models::profile::ProfileFacts;
use crate::models::question::{Condition, Question};

/// True when every requirement of the condition equals the respondent's fact.
/// A key with no matching fact never matches.
pub fn condition_matches(condition: &Condition, facts: &ProfileFacts) -> bool {
    condition
        .requirements
        .iter()
        .all(|(key, required)| facts.fact(key) == Some(required.as_str()))
}

/// Questions applicable to this respondent, in catalog order.
pub fn filter_questions(catalog: &[Question], facts: &ProfileFacts) -> Vec<Question> {
    catalog
        .iter()
        .filter(|q| match &q.condition {
            None => true,
            Some(condition) => {
                if condition.or.is_some() {
                    debug!("Question {} carries an `or` condition; ignoring it", q.id);
                }
                condition_matches(condition, facts)
            }
        })
        .cloned()
        .collect()
}

/// Questions of one stage and, when given, one track. Conditions are not evaluated here.
pub fn select_stage(catalog: &[Question], stage: u8, track: Option<&str>) -> Vec<Question> {
    catalog
        .iter()
        .filter(|q| q.stage == stage)
        .filter(|q| match track {
            Some(t) => q.track.as_deref() == Some(t),
            None => true,
        })
        .cloned()
        .collect()
}
