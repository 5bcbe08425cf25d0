//! Node and edge identifiers
//!
//! Identifiers are allocated from counters owned by each
//! [`WorldNetwork`](crate::WorldNetwork), so the same input always yields the
//! same ids. Both serialize as zero-padded strings (`node_0001`, `edge_0001`)
//! and can therefore key JSON maps.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Error parsing an id string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct IdParseError {
    kind: &'static str,
    value: String,
}

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw counter value
            #[inline]
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw counter value
            #[inline]
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{:04}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix(concat!($prefix, "_"))
                    .and_then(|digits| digits.parse().ok())
                    .map(Self)
                    .ok_or_else(|| IdParseError {
                        kind: $prefix,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

graph_id!(
    /// Identifier of a node within one world network
    NodeId,
    "node"
);

graph_id!(
    /// Identifier of an edge within one world network
    EdgeId,
    "edge"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(NodeId::new(1).to_string(), "node_0001");
        assert_eq!(EdgeId::new(12345).to_string(), "edge_12345");
    }

    #[test]
    fn parse_round_trips_display() {
        let id: NodeId = "node_0042".parse().unwrap();
        assert_eq!(id, NodeId::new(42));
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        assert!("edge_0001".parse::<NodeId>().is_err());
        assert!("node_x".parse::<NodeId>().is_err());
    }

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_string(&NodeId::new(7)).unwrap();
        assert_eq!(json, "\"node_0007\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeId::new(7));
    }
}
