//! Capability-based gating of tool invocations.
//!
//! A program declares the capabilities it needs in its `cap` header; the
//! host resolves a declarative policy document into an allowed set. The
//! evaluator refuses to start when a declared capability is missing from
//! the allowed set, and refuses individual tool dispatches whose
//! capability id is not allowed. Capabilities cannot be escalated during
//! execution.

use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::budget::Budget;

/// The capability ids a `cap` header may declare.
pub const KNOWN_CAPABILITIES: [&str; 4] = ["fs.read", "fs.write", "http.get", "sh.exec"];

/// Error returned when an operation is denied by the capability set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDenied {
    /// The capability that would have been required.
    pub capability: String,
}

impl fmt::Display for CapabilityDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capability `{}` denied by policy", self.capability)
    }
}

impl std::error::Error for CapabilityDenied {}

/// The set of capabilities a run is permitted to use.
///
/// Immutable once created. [`CapabilitySet::unrestricted`] allows
/// everything (the "absent policy" default for embedding hosts);
/// [`CapabilitySet::none`] denies everything, making the run a pure
/// computation with no tool access.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    /// `None` = allow-all.
    allow: Option<AHashSet<String>>,
}

impl CapabilitySet {
    /// Allows exactly the given capability ids.
    #[must_use]
    pub fn new(allow: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allow: Some(allow.into_iter().map(Into::into).collect()),
        }
    }

    /// Allows every capability.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self { allow: None }
    }

    /// Denies every capability.
    #[must_use]
    pub fn none() -> Self {
        Self {
            allow: Some(AHashSet::new()),
        }
    }

    #[must_use]
    pub fn allows(&self, capability: &str) -> bool {
        match &self.allow {
            None => true,
            Some(set) => set.contains(capability),
        }
    }

    pub fn check(&self, capability: &str) -> Result<(), CapabilityDenied> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(CapabilityDenied {
                capability: capability.to_owned(),
            })
        }
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.allow {
            None => f.write_str("CapabilitySet(*)"),
            Some(set) => {
                let mut ids: Vec<_> = set.iter().map(String::as_str).collect();
                ids.sort_unstable();
                write!(f, "CapabilitySet({})", ids.join(", "))
            }
        }
    }
}

/// A declarative policy document, as loaded from a JSON policy file.
///
/// The effective allow-set is `allow − deny`. The optional `limits` block
/// is a budget ceiling the host may impose on top of a program's own
/// `budget` header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub allow: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Budget>,
}

impl Policy {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolves the document into the allowed capability set.
    #[must_use]
    pub fn resolve(&self) -> CapabilitySet {
        let allow = self
            .allow
            .iter()
            .filter(|cap| !self.deny.contains(cap))
            .cloned()
            .collect::<AHashSet<_>>();
        CapabilitySet { allow: Some(allow) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_wins_over_allow() {
        let policy = Policy {
            allow: vec!["fs.read".into(), "fs.write".into()],
            deny: vec!["fs.write".into()],
            limits: None,
        };
        let caps = policy.resolve();
        assert!(caps.allows("fs.read"));
        assert!(!caps.allows("fs.write"));
        assert!(!caps.allows("sh.exec"));
    }

    #[test]
    fn unrestricted_allows_anything() {
        let caps = CapabilitySet::unrestricted();
        assert!(caps.allows("fs.read"));
        assert!(caps.allows("made.up"));
    }

    #[test]
    fn none_denies_everything() {
        let caps = CapabilitySet::none();
        let err = caps.check("fs.read").unwrap_err();
        assert_eq!(err.capability, "fs.read");
    }

    #[test]
    fn policy_document_parses_with_limits() {
        let policy = Policy::from_json(r#"{"allow": ["http.get"], "limits": {"maxToolCalls": 3}}"#).unwrap();
        assert_eq!(policy.allow, vec!["http.get"]);
        assert_eq!(policy.limits.unwrap().max_tool_calls, 3);
    }
}
