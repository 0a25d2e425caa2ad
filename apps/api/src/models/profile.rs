use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Major {
    #[serde(rename = "it")]
    It,
    #[serde(rename = "non-it")]
    NonIt,
}

impl Major {
    pub fn as_str(&self) -> &'static str {
        match self {
            Major::It => "it",
            Major::NonIt => "non-it",
        }
    }
}

/// IT major sub-track: computer science, AI/data, networks/security,
/// games/media, other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItMajorDetail {
    Cs,
    Ai,
    Ns,
    Gc,
    Etc,
}

impl ItMajorDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItMajorDetail::Cs => "cs",
            ItMajorDetail::Ai => "ai",
            ItMajorDetail::Ns => "ns",
            ItMajorDetail::Gc => "gc",
            ItMajorDetail::Etc => "etc",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodingExp {
    Yes,
    No,
}

impl CodingExp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodingExp::Yes => "yes",
            CodingExp::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodingLevel {
    Basic,
    Project,
    Team,
    Practical,
}

impl CodingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodingLevel::Basic => "basic",
            CodingLevel::Project => "project",
            CodingLevel::Team => "team",
            CodingLevel::Practical => "practical",
        }
    }

    /// Readiness estimate used by the local scorer, in [0, 1].
    pub fn readiness(&self) -> f64 {
        match self {
            CodingLevel::Basic => 0.25,
            CodingLevel::Project => 0.5,
            CodingLevel::Team => 0.75,
            CodingLevel::Practical => 1.0,
        }
    }
}

/// Validated respondent facts. Immutable for the lifetime of a survey pass.
///
/// `it_major_detail` is set only when `major` is `It`; `coding_level` only
/// when `coding_exp` is `Yes`. Construct through `survey::intake::validate_intake`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFacts {
    pub major: Major,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub it_major_detail: Option<ItMajorDetail>,
    pub coding_exp: CodingExp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_level: Option<CodingLevel>,
}

impl ProfileFacts {
    /// Looks up a fact by the key used in question conditions.
    /// Unknown keys and unset optional facts yield `None`.
    pub fn fact(&self, key: &str) -> Option<&'static str> {
        match key {
            "major" => Some(self.major.as_str()),
            "itMajorDetail" => self.it_major_detail.map(|d| d.as_str()),
            "codingExp" => Some(self.coding_exp.as_str()),
            "codingLevel" => self.coding_level.map(|l| l.as_str()),
            _ => None,
        }
    }
}

/// Intake form as submitted, before validation. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(default)]
    pub major: Option<Major>,
    #[serde(default)]
    pub it_major_detail: Option<ItMajorDetail>,
    #[serde(default)]
    pub coding_exp: Option<CodingExp>,
    #[serde(default)]
    pub coding_level: Option<CodingLevel>,
}
