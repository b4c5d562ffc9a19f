//! Party roles and connection identity.
//!
//! A connection identity is a fresh Uuid per transport attachment -- it is
//! never reused across reconnects, even for the same party and session.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Which side of the consultation a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Customer,
    Provider,
}

impl PartyRole {
    /// The other side of the consultation.
    pub fn counterpart(self) -> PartyRole {
        match self {
            PartyRole::Customer => PartyRole::Provider,
            PartyRole::Provider => PartyRole::Customer,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Customer => write!(f, "customer"),
            PartyRole::Provider => write!(f, "provider"),
        }
    }
}

impl FromStr for PartyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(PartyRole::Customer),
            "provider" => Ok(PartyRole::Provider),
            other => Err(format!("invalid party role: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [PartyRole::Customer, PartyRole::Provider] {
            let parsed: PartyRole = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_counterpart() {
        assert_eq!(PartyRole::Customer.counterpart(), PartyRole::Provider);
        assert_eq!(PartyRole::Provider.counterpart(), PartyRole::Customer);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(
            serde_json::to_string(&PartyRole::Provider).unwrap(),
            "\"provider\""
        );
    }
}
