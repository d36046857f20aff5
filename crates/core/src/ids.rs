// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! `TAS-n` / `NOT-n` style identifiers.
//!
//! These are never stored as a separate counter; `State::fold` derives the
//! next id by scanning what has already been applied (spec.md §3.3,
//! invariant 3).

use std::fmt;
use std::str::FromStr;

macro_rules! prefixed_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            pub fn first() -> Self {
                Self(1)
            }

            pub fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let rest = s
                    .strip_prefix(concat!($prefix, "-"))
                    .ok_or_else(|| ParseIdError(s.to_string()))?;
                let n: u64 = rest.parse().map_err(|_| ParseIdError(s.to_string()))?;
                Ok(Self(n))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

prefixed_id!(TaskId, "TAS");
prefixed_id!(NoteId, "NOT");

/// Inbox message ids are plain monotonic integers (no prefix in spec.md §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct ParseIdError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_formats_with_prefix() {
        assert_eq!(TaskId(1).to_string(), "TAS-1");
        assert_eq!(TaskId(42).to_string(), "TAS-42");
    }

    #[test]
    fn task_id_round_trips_through_display_and_parse() {
        let id = TaskId(7);
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn task_id_rejects_wrong_prefix() {
        assert!("NOT-1".parse::<TaskId>().is_err());
    }

    #[test]
    fn note_id_next_increments() {
        assert_eq!(NoteId::first().next(), NoteId(2));
    }
}
