//! Color grade rating shared by people and organizations.
//!
//! # Responsibility
//! - Define the closed grade set and its presentation tokens.
//! - Parse grade keys leniently from CSV cells and stored documents.
//!
//! # Invariants
//! - Serialized form is always the grade key (`GREEN`, `LIGHT_GREEN`, ...).
//! - Missing or unrecognized keys decode to `ColorGrade::Unknown`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Quality rating used for visual triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorGrade {
    Green,
    LightGreen,
    Yellow,
    Orange,
    Red,
    #[default]
    Unknown,
}

impl ColorGrade {
    /// Every grade in display order.
    pub const ALL: [ColorGrade; 6] = [
        ColorGrade::Green,
        ColorGrade::LightGreen,
        ColorGrade::Yellow,
        ColorGrade::Orange,
        ColorGrade::Red,
        ColorGrade::Unknown,
    ];

    /// Stable storage/CSV key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::LightGreen => "LIGHT_GREEN",
            Self::Yellow => "YELLOW",
            Self::Orange => "ORANGE",
            Self::Red => "RED",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::LightGreen => "Light Green",
            Self::Yellow => "Yellow",
            Self::Orange => "Orange",
            Self::Red => "Red",
            Self::Unknown => "Unknown",
        }
    }

    /// Border style token for cards and graph nodes.
    pub fn border_class(self) -> &'static str {
        match self {
            Self::Green => "border-green-500",
            Self::LightGreen => "border-lime-500",
            Self::Yellow => "border-yellow-400",
            Self::Orange => "border-orange-500",
            Self::Red => "border-red-600",
            Self::Unknown => "border-slate-500",
        }
    }

    /// Dot style token for list badges.
    pub fn dot_class(self) -> &'static str {
        match self {
            Self::Green => "bg-green-500",
            Self::LightGreen => "bg-lime-500",
            Self::Yellow => "bg-yellow-400",
            Self::Orange => "bg-orange-500",
            Self::Red => "bg-red-600",
            Self::Unknown => "bg-slate-500",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Green => "#22c55e",
            Self::LightGreen => "#84cc16",
            Self::Yellow => "#facc15",
            Self::Orange => "#f97316",
            Self::Red => "#dc2626",
            Self::Unknown => "#64748b",
        }
    }

    /// Parses a grade key.
    ///
    /// Matching is case-insensitive and treats `-` and spaces as `_`, so
    /// `light-green` and `Light Green` both resolve to `LightGreen`.
    /// Returns `None` for empty or unrecognized input.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value
            .trim()
            .to_ascii_uppercase()
            .replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|grade| grade.key() == normalized)
    }

    /// Parses a grade key, falling back to `Unknown`.
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl Display for ColorGrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for ColorGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for ColorGrade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(Self::parse_or_default)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::ColorGrade;

    #[test]
    fn parse_accepts_keys_case_insensitively() {
        assert_eq!(ColorGrade::parse("green"), Some(ColorGrade::Green));
        assert_eq!(ColorGrade::parse(" LIGHT_GREEN "), Some(ColorGrade::LightGreen));
        assert_eq!(ColorGrade::parse("light-green"), Some(ColorGrade::LightGreen));
        assert_eq!(ColorGrade::parse("purple"), None);
        assert_eq!(ColorGrade::parse(""), None);
    }

    #[test]
    fn unknown_is_default_and_fallback() {
        assert_eq!(ColorGrade::default(), ColorGrade::Unknown);
        assert_eq!(ColorGrade::parse_or_default("nope"), ColorGrade::Unknown);
    }

    #[test]
    fn serde_uses_key_and_tolerates_missing_values() {
        let encoded = serde_json::to_string(&ColorGrade::LightGreen).unwrap();
        assert_eq!(encoded, "\"LIGHT_GREEN\"");

        let decoded: ColorGrade = serde_json::from_str("null").unwrap();
        assert_eq!(decoded, ColorGrade::Unknown);
        let decoded: ColorGrade = serde_json::from_str("\"Orange\"").unwrap();
        assert_eq!(decoded, ColorGrade::Orange);
    }
}
