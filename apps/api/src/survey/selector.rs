//! Recommendation selection over a `ScoreMap`.
//!
//! Tie-break contract: among equal maxima the entry that appears first in the
//! map wins. Maps are built in catalog order, so "first" means catalog order.

use crate::models::catalog::Job;
use crate::survey::scoring::ScoreMap;

/// Id with the highest score; the earliest entry wins ties. `None` when empty.
pub fn select_top(scores: &ScoreMap) -> Option<&str> {
    let mut best: Option<(&str, i64)> = None;
    for (id, score) in scores.iter() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((id, score)),
        }
    }
    best.map(|(id, _)| id)
}

/// Best subfield of `job`. Only the job's own subfields compete; when none
/// scored above zero the job's first listed subfield is returned.
pub fn select_top_subfield(job: &Job, subfield_scores: &ScoreMap) -> Option<String> {
    let mut best: Option<(&str, i64)> = None;
    for subfield in &job.subfields {
        let score = subfield_scores.get(subfield).unwrap_or(0);
        if score <= 0 {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((subfield.as_str(), score)),
        }
    }
    best.map(|(s, _)| s.to_string())
        .or_else(|| job.subfields.first().cloned())
}

/// Ids ordered by descending score; equal scores keep map order.
pub fn rank(scores: &ScoreMap) -> Vec<String> {
    let mut entries: Vec<(&str, i64)> = scores.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().map(|(id, _)| id.to_string()).collect()
}

/// Share of the top score in the positive total, in [0, 1].
pub fn confidence(scores: &ScoreMap) -> f64 {
    let total = scores.positive_total();
    if total <= 0 {
        return 0.0;
    }
    let top = select_top(scores)
        .and_then(|id| scores.get(id))
        .unwrap_or(0)
        .max(0);
    (top as f64 / total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, i64)]) -> ScoreMap {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn job(subfields: &[&str]) -> Job {
        Job {
            id: "backend".to_string(),
            name: "Backend Developer".to_string(),
            track: None,
            subfields: subfields.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_first_seen_wins_tie() {
        let scores = map(&[("frontend", 10), ("backend", 10), ("ai", 5)]);
        assert_eq!(select_top(&scores), Some("frontend"));
    }

    #[test]
    fn test_tie_follows_map_order_not_alphabet() {
        let scores = map(&[("web", 4), ("ai", 4)]);
        assert_eq!(select_top(&scores), Some("web"));
    }

    #[test]
    fn test_select_top_is_deterministic() {
        let scores = map(&[("a", 1), ("b", 7), ("c", 7), ("d", 2)]);
        let first = select_top(&scores);
        for _ in 0..10 {
            assert_eq!(select_top(&scores), first);
        }
        assert_eq!(first, Some("b"));
    }

    #[test]
    fn test_all_zero_picks_first() {
        let scores = ScoreMap::zeroed(["frontend", "backend", "ai"]);
        assert_eq!(select_top(&scores), Some("frontend"));
    }

    #[test]
    fn test_negative_scores_still_ranked() {
        let scores = map(&[("a", -3), ("b", -1)]);
        assert_eq!(select_top(&scores), Some("b"));
    }

    #[test]
    fn test_empty_map_has_no_top() {
        assert_eq!(select_top(&ScoreMap::new()), None);
    }

    #[test]
    fn test_subfield_restricted_to_job() {
        let scores = map(&[("ml", 50), ("server", 2), ("cloud", 3)]);
        assert_eq!(
            select_top_subfield(&job(&["server", "cloud"]), &scores),
            Some("cloud".to_string())
        );
    }

    #[test]
    fn test_subfield_tie_uses_job_order() {
        let scores = map(&[("cloud", 2), ("server", 2)]);
        assert_eq!(
            select_top_subfield(&job(&["server", "cloud"]), &scores),
            Some("server".to_string())
        );
    }

    #[test]
    fn test_subfield_falls_back_to_first_listed() {
        let scores = map(&[("ml", 5)]);
        assert_eq!(
            select_top_subfield(&job(&["server", "cloud"]), &scores),
            Some("server".to_string())
        );
        assert_eq!(select_top_subfield(&job(&[]), &scores), None);
    }

    #[test]
    fn test_rank_is_stable_descending() {
        let scores = map(&[("frontend", 10), ("backend", 10), ("ai", 12), ("game", 0)]);
        assert_eq!(rank(&scores), vec!["ai", "frontend", "backend", "game"]);
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(confidence(&ScoreMap::zeroed(["a", "b"])), 0.0);
        assert!((confidence(&map(&[("a", 3), ("b", 1)])) - 0.75).abs() < 1e-9);
        assert_eq!(confidence(&map(&[("a", 5)])), 1.0);
    }
}
