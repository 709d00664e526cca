//! Enumeration types.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced when a raw step index cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// The step index was negative.
    #[error("step index must be non-negative, got {0}")]
    Negative(i64),

    /// The step index was not an integer (and not `latest`).
    #[error("step index must be an integer or \"latest\", got {0:?}")]
    NotAnInteger(String),
}

/// Which step of a timeline an operation reads from.
///
/// Serialized as a bare integer or the string `latest`. Deserializing also
/// accepts an integer written as a string, so `4`, `"4"` and `latest` all
/// work in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSelector {
    /// An explicit step index.
    At(u64),
    /// The highest committed step.
    Latest,
}

impl StepSelector {
    /// Parse `"latest"` or a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Negative`] for negative integers and
    /// [`StepError::NotAnInteger`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, StepError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_parse_err| StepError::NotAnInteger(raw.to_owned()))?;
        Self::try_from(value)
    }
}

impl TryFrom<i64> for StepSelector {
    type Error = StepError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self::At)
            .map_err(|_conv_err| StepError::Negative(value))
    }
}

impl From<u64> for StepSelector {
    fn from(step: u64) -> Self {
        Self::At(step)
    }
}

impl core::fmt::Display for StepSelector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::At(step) => write!(f, "{step}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

impl Serialize for StepSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::At(step) => serializer.serialize_u64(*step),
            Self::Latest => serializer.serialize_str("latest"),
        }
    }
}

impl<'de> Deserialize<'de> for StepSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StepSelectorVisitor)
    }
}

struct StepSelectorVisitor;

impl Visitor<'_> for StepSelectorVisitor {
    type Value = StepSelector;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a non-negative step index or \"latest\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(StepSelector::At(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        StepSelector::try_from(value).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        StepSelector::parse(value).map_err(E::custom)
    }
}
