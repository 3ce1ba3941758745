//! Strongly-typed identifiers for breather

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of a schedule entry registered with the schedule adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityName(String);

impl ActivityName {
    /// All-day recurring entry. In Instant mode it only exists so that
    /// stopping it forces the engine to re-render shielded targets; in the
    /// usage-threshold variant it also carries the usage event.
    pub const PROTECTION: &'static str = "breatherProtection";

    /// One-shot entry whose start converts the allowance into a block.
    pub const DELAYED_BLOCK: &'static str = "breatherDelayedBlock";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn protection() -> Self {
        Self::new(Self::PROTECTION)
    }

    pub fn delayed_block() -> Self {
        Self::new(Self::DELAYED_BLOCK)
    }

    /// Every entry owned by the restriction lifecycle
    pub fn all() -> Vec<Self> {
        vec![Self::protection(), Self::delayed_block()]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActivityName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActivityName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a usage event attached to a schedule entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventName(String);

impl EventName {
    pub const THRESHOLD_REACHED: &'static str = "thresholdReached";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn threshold_reached() -> Self {
        Self::new(Self::THRESHOLD_REACHED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a cross-process restart signal record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalId(Uuid);

impl SignalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the hyphenated form written by `Display`
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_names_are_distinct() {
        let all = ActivityName::all();
        assert_eq!(all.len(), 2);
        assert_ne!(all[0], all[1]);
        assert_eq!(ActivityName::from("breatherProtection"), ActivityName::protection());
    }

    #[test]
    fn signal_id_uniqueness() {
        let s1 = SignalId::new();
        let s2 = SignalId::new();
        assert_ne!(s1, s2);
        assert_eq!(SignalId::parse(&s1.to_string()), Some(s1));
        assert_eq!(SignalId::parse("not-a-uuid"), None);
    }

    #[test]
    fn ids_serialize_deserialize() {
        let name = ActivityName::delayed_block();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"breatherDelayedBlock\"");
        let parsed: ActivityName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, parsed);

        let id = SignalId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: SignalId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
