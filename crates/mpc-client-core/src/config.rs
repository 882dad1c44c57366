//! Client configuration
//!
//! Everything the demo flow treats as fixed lives here so a hosting
//! application can substitute its own values: the sign-in credentials, the
//! receiver of the half-balance transfer and the network the wallet binds to.

use crate::chain::{NetworkConfig, validate_address};
use crate::{Credentials, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Receiver of the demo transfer
pub const DEFAULT_RECEIVER: &str = "0xD15a8382Db1CD57B3B3823EE90ef057C639E3328";

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Configuration for [`crate::MpcClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Credentials for password sign-in
    pub credentials: Credentials,
    /// Receiver of the transfer sent by the send operation
    pub receiver: String,
    /// Network the wallet handle is bound to
    pub network: NetworkConfig,
    /// Capacity of the session event broadcast channel
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            receiver: DEFAULT_RECEIVER.to_string(),
            network: NetworkConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set receiver address
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = receiver.into();
        self
    }

    /// Set network
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        validate_address(&self.receiver)?;

        if self.credentials.email.is_empty() {
            return Err(Error::InvalidConfig("Sign-in e-mail is empty".into()));
        }
        if self.network.rpc_url.is_empty() {
            return Err(Error::InvalidConfig("Network RPC URL is empty".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "Event capacity must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
