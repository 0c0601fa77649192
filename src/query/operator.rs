//! The closed operator set and its spelling normalization.

use crate::error::QuarryError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    /// `!=`
    Ne,
    /// `<>`; compiles exactly like `!=`
    NotEqual,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    /// `%v`
    LeftLike,
    /// `v%`
    RightLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::Eq,
        Operator::Ne,
        Operator::NotEqual,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::NotLike,
        Operator::LeftLike,
        Operator::RightLike,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::Between,
        Operator::NotBetween,
    ];

    /// Canonical (normalized) spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::NotEqual => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
            Operator::LeftLike => "left like",
            Operator::RightLike => "right like",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::Between => "between",
            Operator::NotBetween => "not between",
        }
    }

    /// IS NULL / IS NOT NULL ignore their value.
    pub fn is_nullary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn takes_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn takes_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }

    pub fn is_like(&self) -> bool {
        matches!(
            self,
            Operator::Like | Operator::NotLike | Operator::LeftLike | Operator::RightLike
        )
    }
}

/// Lowercase, treat `_` and `-` as spaces, collapse whitespace runs.
///
/// `NOT_LIKE`, `not  like` and `Not Like` all normalize to `not like`.
pub fn normalize_operator(op: &str) -> String {
    op.replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_valid_operator(op: &str) -> bool {
    op.parse::<Operator>().is_ok()
}

impl FromStr for Operator {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_operator(s);
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| QuarryError::InvalidOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spellings() {
        assert_eq!(normalize_operator("NOT_LIKE"), "not like");
        assert_eq!(normalize_operator("  not   like "), "not like");
        assert_eq!(normalize_operator("Is_Not_Null"), "is not null");
        assert_eq!(normalize_operator(">="), ">=");
    }

    #[test]
    fn test_parse_every_canonical_spelling() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("left_like".parse::<Operator>().unwrap(), Operator::LeftLike);
        assert_eq!("RIGHT-LIKE".parse::<Operator>().unwrap(), Operator::RightLike);
        assert_eq!("NOT_BETWEEN".parse::<Operator>().unwrap(), Operator::NotBetween);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEqual);
    }

    #[test]
    fn test_rejects_unknown() {
        assert!(!is_valid_operator("=="));
        assert!(!is_valid_operator("; drop table"));
        assert!(!is_valid_operator(""));
        assert_eq!(
            "regexp".parse::<Operator>(),
            Err(QuarryError::InvalidOperator("regexp".into()))
        );
    }
}
