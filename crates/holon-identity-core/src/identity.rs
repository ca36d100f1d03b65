use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Value written to `generated_by` for identities born through this tool.
pub const GENERATED_BY: &str = "sophia-who";

/// Computational nature of a holon.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Clade {
    #[default]
    #[serde(rename = "deterministic/pure")]
    DeterministicPure,
    #[serde(rename = "deterministic/stateful")]
    DeterministicStateful,
    #[serde(rename = "deterministic/io_bound")]
    DeterministicIoBound,
    #[serde(rename = "probabilistic/generative")]
    ProbabilisticGenerative,
    #[serde(rename = "probabilistic/perceptual")]
    ProbabilisticPerceptual,
    #[serde(rename = "probabilistic/adaptive")]
    ProbabilisticAdaptive,
}

impl Clade {
    pub const ALL: [Self; 6] = [
        Self::DeterministicPure,
        Self::DeterministicStateful,
        Self::DeterministicIoBound,
        Self::ProbabilisticGenerative,
        Self::ProbabilisticPerceptual,
        Self::ProbabilisticAdaptive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeterministicPure => "deterministic/pure",
            Self::DeterministicStateful => "deterministic/stateful",
            Self::DeterministicIoBound => "deterministic/io_bound",
            Self::ProbabilisticGenerative => "probabilistic/generative",
            Self::ProbabilisticPerceptual => "probabilistic/perceptual",
            Self::ProbabilisticAdaptive => "probabilistic/adaptive",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|clade| clade.as_str() == value)
    }
}

impl Display for Clade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage of a holon or of its protocol.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Draft,
    Stable,
    Deprecated,
    Dead,
}

impl Status {
    pub const ALL: [Self; 4] = [Self::Draft, Self::Stable, Self::Deprecated, Self::Dead];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Stable => "stable",
            Self::Deprecated => "deprecated",
            Self::Dead => "dead",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a holon came into being.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReproductionMode {
    #[default]
    Manual,
    Assisted,
    Automatic,
    Autopoietic,
    Bred,
}

impl ReproductionMode {
    pub const ALL: [Self; 5] =
        [Self::Manual, Self::Assisted, Self::Automatic, Self::Autopoietic, Self::Bred];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Assisted => "assisted",
            Self::Automatic => "automatic",
            Self::Autopoietic => "autopoietic",
            Self::Bred => "bred",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl Display for ReproductionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A holon's civil status, mirroring the `HOLON.md` frontmatter.
///
/// `clade`, `status`, and `reproduction` keep whatever the file says; the typed
/// accessors return `None` for values outside the known sets. A YAML `null`
/// decodes as an empty value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Identity {
    #[serde(deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub given_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub family_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub motto: String,
    #[serde(deserialize_with = "null_as_default")]
    pub composer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub clade: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub born: String,

    #[serde(deserialize_with = "null_as_default")]
    pub parents: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub reproduction: String,

    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub aliases: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub generated_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lang: String,
    #[serde(deserialize_with = "null_as_default")]
    pub proto_status: String,
}

impl Identity {
    /// Fresh identity with a v4 UUID, born today, in draft, with the default
    /// clade and reproduction mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            clade: Clade::default().as_str().to_string(),
            status: Status::default().as_str().to_string(),
            born: today(),
            reproduction: ReproductionMode::default().as_str().to_string(),
            generated_by: GENERATED_BY.to_string(),
            proto_status: Status::default().as_str().to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn clade(&self) -> Option<Clade> {
        Clade::parse(&self.clade)
    }

    #[must_use]
    pub fn status(&self) -> Option<Status> {
        Status::parse(&self.status)
    }

    #[must_use]
    pub fn reproduction(&self) -> Option<ReproductionMode> {
        ReproductionMode::parse(&self.reproduction)
    }

    /// `"<given> <family>"`, trimmed when either half is empty.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name).trim().to_string()
    }

    /// Directory name derived from the names: lowercase, a trailing `?` on the
    /// family name dropped, spaces replaced by dashes.
    #[must_use]
    pub fn slug(&self) -> String {
        let family = self.family_name.strip_suffix('?').unwrap_or(&self.family_name);
        format!("{}-{}", self.given_name, family).to_lowercase().replace(' ', "-")
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn today() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.date().to_string()
}
