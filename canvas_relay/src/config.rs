use anyhow::Context;
use std::{env, net::SocketAddr};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Relay settings, read from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    /// Boards buffered per room before slow clients start skipping.
    pub channel_capacity: usize,
}

impl RelayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = lookup("RELAY_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .with_context(|| format!("RELAY_ADDR is not a socket address: {addr}"))?;

        let channel_capacity = match lookup("RELAY_CHANNEL_CAPACITY") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("RELAY_CHANNEL_CAPACITY is not a number: {raw}"))?,
            None => DEFAULT_CHANNEL_CAPACITY,
        };

        Ok(Self {
            addr,
            channel_capacity,
        })
    }
}
