//! The closed set of pub/sub channels (spec §3, §4.G, §6).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    SystemStats,
    DbPoolStats,
    VectorSearch,
    ErrorFirewall,
    AiAnalysis,
    MemoryUpdates,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::SystemStats,
        Channel::DbPoolStats,
        Channel::VectorSearch,
        Channel::ErrorFirewall,
        Channel::AiAnalysis,
        Channel::MemoryUpdates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::SystemStats => "system_stats",
            Channel::DbPoolStats => "db_pool_stats",
            Channel::VectorSearch => "vector_search",
            Channel::ErrorFirewall => "error_firewall",
            Channel::AiAnalysis => "ai_analysis",
            Channel::MemoryUpdates => "memory_updates",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown channel '{0}', valid channels: {1:?}")]
pub struct UnknownChannel(pub String, pub Vec<&'static str>);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_stats" => Ok(Channel::SystemStats),
            "db_pool_stats" => Ok(Channel::DbPoolStats),
            "vector_search" => Ok(Channel::VectorSearch),
            "error_firewall" => Ok(Channel::ErrorFirewall),
            "ai_analysis" => Ok(Channel::AiAnalysis),
            "memory_updates" => Ok(Channel::MemoryUpdates),
            other => Err(UnknownChannel(
                other.to_string(),
                Channel::ALL.iter().map(Channel::as_str).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_channel() {
        for ch in Channel::ALL {
            let parsed: Channel = ch.as_str().parse().unwrap();
            assert_eq!(parsed, ch);
        }
    }

    #[test]
    fn unknown_channel_lists_valid_set() {
        let err = "bogus".parse::<Channel>().unwrap_err();
        assert_eq!(err.1.len(), 6);
    }
}
