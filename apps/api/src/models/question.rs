use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::survey::scoring::ScoreMap;

/// Eligibility predicate: every `(fact key, required value)` pair must hold.
///
/// `or` appears in some catalog data but has never been evaluated; it is kept
/// only so that such catalogs parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Value>,
    #[serde(flatten)]
    pub requirements: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub text: String,
    /// Per-job (stage 2, single stage) or per-track (stage 1) points.
    #[serde(default)]
    pub score: ScoreMap,
    #[serde(default, skip_serializing_if = "ScoreMap::is_empty")]
    pub subfield_scores: ScoreMap,
    #[serde(default, skip_serializing_if = "ScoreMap::is_empty")]
    pub traits: ScoreMap,
    #[serde(default, skip_serializing_if = "ScoreMap::is_empty")]
    pub skills: ScoreMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "question")]
    pub text: String,
    #[serde(default = "default_stage")]
    pub stage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

fn default_stage() -> u8 {
    1
}

impl Question {
    /// Gives id-less options their position as id, so answers can always be
    /// addressed by `optionId`.
    pub fn normalize(mut self) -> Self {
        for (i, option) in self.options.iter_mut().enumerate() {
            if option.id.is_empty() {
                option.id = i.to_string();
            }
        }
        self
    }

    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Accepts ids given as JSON strings or numbers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
