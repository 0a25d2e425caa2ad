//! Score accumulation.
//!
//! `ScoreMap` is an insertion-ordered id -> points map. Order matters: the
//! selector breaks ties by first-seen position, so the map keeps catalog
//! order and JSON (de)serialization keeps document order.
//!
//! `apply_option` / `remove_option` are exact inverses. The answer log keeps
//! every chosen option, and the ids its points introduced, so "back" restores
//! precisely the map it started from.
//!
//! Totals saturate at the `i64` bounds instead of overflowing.

#![allow(dead_code)]

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::question::AnswerOption;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreMap {
    entries: Vec<(String, i64)>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with every id present at zero, in the given order.
    pub fn zeroed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for id in ids {
            let id = id.into();
            if map.get(&id).is_none() {
                map.entries.push((id, 0));
            }
        }
        map
    }

    pub fn get(&self, id: &str) -> Option<i64> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| *v)
    }

    /// Adds `delta` to `id`, saturating at the `i64` bounds. Ids not yet
    /// present are appended; returns true when `id` was appended.
    pub fn add(&mut self, id: &str, delta: i64) -> bool {
        match self.entries.iter_mut().find(|(k, _)| k == id) {
            Some((_, v)) => {
                *v = v.saturating_add(delta);
                false
            }
            None => {
                self.entries.push((id.to_string(), delta));
                true
            }
        }
    }

    /// Drops `id` and its points.
    pub fn remove(&mut self, id: &str) -> Option<i64> {
        let pos = self.entries.iter().position(|(k, _)| k == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the strictly positive values.
    pub fn positive_total(&self) -> i64 {
        self.entries
            .iter()
            .map(|(_, v)| *v)
            .filter(|v| *v > 0)
            .fold(0i64, i64::saturating_add)
    }

    /// Adds every delta of `other` into `self`. Returns the ids that were
    /// not present before, in the order they were appended.
    pub fn merge(&mut self, other: &ScoreMap) -> Vec<String> {
        other
            .iter()
            .filter(|(id, delta)| self.add(id, *delta))
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Subtracts every delta of `other` from `self`.
    pub fn unmerge(&mut self, other: &ScoreMap) {
        for (id, delta) in other.iter() {
            self.add(id, delta.saturating_neg());
        }
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for ScoreMap {
    fn from_iter<T: IntoIterator<Item = (S, i64)>>(iter: T) -> Self {
        let mut map = ScoreMap::new();
        for (id, v) in iter {
            map.add(&id.into(), v);
        }
        map
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ScoreMapVisitor)
    }
}

struct ScoreMapVisitor;

impl<'de> Visitor<'de> for ScoreMapVisitor {
    type Value = ScoreMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of id to numeric points")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ScoreMap, A::Error> {
        let mut map = ScoreMap::new();
        while let Some((id, Points(v))) = access.next_entry::<String, Points>()? {
            map.add(&id, v);
        }
        Ok(map)
    }
}

/// Integral points. Fractional values reported by the backend are rounded.
struct Points(i64);

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PointsVisitor;

        impl<'de> Visitor<'de> for PointsVisitor {
            type Value = Points;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Points, E> {
                Ok(Points(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Points, E> {
                i64::try_from(v)
                    .map(Points)
                    .map_err(|_| E::custom("points out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Points, E> {
                Ok(Points(v.round() as i64))
            }
        }

        deserializer.deserialize_any(PointsVisitor)
    }
}

/// Adds an option's per-job deltas. Jobs the option does not mention are
/// unchanged. Returns the ids the option introduced into `scores`.
pub fn apply_option(scores: &mut ScoreMap, option: &AnswerOption) -> Vec<String> {
    scores.merge(&option.score)
}

/// Reverses `apply_option` for the same option; `introduced` is what that
/// call returned.
pub fn remove_option(scores: &mut ScoreMap, option: &AnswerOption, introduced: &[String]) {
    scores.unmerge(&option.score);
    for id in introduced {
        scores.remove(id);
    }
}

/// One chosen answer. Only the ids go over the wire; the option itself is
/// kept so its contribution can be reversed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub option_id: String,
    #[serde(skip)]
    pub option: AnswerOption,
    /// Score ids this answer added to the running totals.
    #[serde(skip)]
    pub introduced: Vec<String>,
}

/// Ordered answers for one survey stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AnswerLog {
    entries: Vec<AnswerRecord>,
}

impl AnswerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AnswerRecord) {
        self.entries.push(record);
    }

    pub fn pop(&mut self) -> Option<AnswerRecord> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.entries
    }

    /// Recomputes the job totals from scratch on top of `base`.
    pub fn totals(&self, base: &ScoreMap) -> ScoreMap {
        let mut scores = base.clone();
        for record in &self.entries {
            apply_option(&mut scores, &record.option);
        }
        scores
    }
}
