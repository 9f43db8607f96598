//! Discovery domains
//!
//! A domain partitions what the server returns: the caller's own data,
//! everything they can see, public data, or a shared snapshot.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Scope of a discovery query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryDomain {
    /// Data owned by the current user
    #[default]
    MyData,
    /// Everything the current user can access
    AllData,
    /// Public data
    Public,
    /// A shared public snapshot
    Snapshot,
}

impl DiscoveryDomain {
    /// All domains
    pub const ALL: [Self; 4] = [Self::AllData, Self::MyData, Self::Public, Self::Snapshot];

    /// Wire name of the domain
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MyData => "my_data",
            Self::AllData => "all_data",
            Self::Public => "public",
            Self::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for DiscoveryDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown domain name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown discovery domain '{0}' (expected one of: my_data, all_data, public, snapshot)")]
pub struct UnknownDomain(pub String);

impl FromStr for DiscoveryDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == s)
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}
