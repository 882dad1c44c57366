//! Core types for the MPC client
//!
//! Key shares, party parameters, credentials and connection handles as they
//! are handed out by the MPC SDK. All of these are opaque to the orchestration
//! layer: it stores and forwards them but never inspects key material.

use crate::{Error, Result, THRESHOLD};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a party in the MPC session (0 or 1)
pub type PartyId = usize;

/// Identifier the signing party uses to look up its half of a key share
pub type ShareId = String;

/// Default account used by the demo flow
pub const DEMO_EMAIL: &str = "mpc-lib-test@example.com";
const DEMO_PASSWORD: &str = "123456";

/// Role of a party in the 2-of-2 wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// Local party driven by this client
    Client,
    /// Remote signing party operated by the SDK provider
    Server,
}

impl PartyRole {
    /// Get the party ID for this role
    pub fn party_id(&self) -> PartyId {
        match self {
            PartyRole::Client => 0,
            PartyRole::Server => 1,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Client => write!(f, "Client"),
            PartyRole::Server => write!(f, "Server"),
        }
    }
}

/// Kind of session requested from the signing party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Threshold signing
    Sign,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Sign => write!(f, "sign"),
        }
    }
}

/// Parameters identifying the parties that hold a key share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartiesParameters {
    /// Share identifier known to both parties
    pub share_id: ShareId,
    /// Participating party IDs
    pub parties: Vec<PartyId>,
    /// Signing threshold
    pub threshold: usize,
    /// Party ID of the holder of this share
    pub local_party: PartyId,
}

impl PartiesParameters {
    /// Parameters for a fresh 2-of-2 share held by the client party
    pub fn two_of_two(share_id: impl Into<ShareId>) -> Self {
        Self {
            share_id: share_id.into(),
            parties: vec![PartyRole::Client.party_id(), PartyRole::Server.party_id()],
            threshold: THRESHOLD,
            local_party: PartyRole::Client.party_id(),
        }
    }

    /// Check that the parameters describe a usable signing set
    pub fn validate(&self) -> Result<()> {
        if self.parties.len() < self.threshold {
            return Err(Error::InvalidConfig(format!(
                "Threshold {} exceeds {} parties",
                self.threshold,
                self.parties.len()
            )));
        }
        if !self.parties.contains(&self.local_party) {
            return Err(Error::InvalidConfig(
                "Local party is not in the signing set".into(),
            ));
        }
        Ok(())
    }
}

/// Metadata associated with a key share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyShareMetadata {
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
}

/// Local half of a 2-of-2 key
///
/// Produced by the SDK and immutable afterwards. The session holder shares it
/// as `Arc<KeyShare>`; identity of that `Arc` is what distinguishes one
/// generated share from the next.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// Joint public key (compressed SEC1, 33 bytes)
    #[zeroize(skip)]
    pub public_key: Vec<u8>,

    /// Party parameters used to open sessions for this share
    #[zeroize(skip)]
    pub parties_parameters: PartiesParameters,

    /// SDK-owned secret material, opaque to this crate
    secret: Vec<u8>,

    /// Metadata about this share
    #[zeroize(skip)]
    pub metadata: KeyShareMetadata,
}

impl KeyShare {
    /// Wrap a share handed out by the SDK
    pub fn new(
        public_key: Vec<u8>,
        parties_parameters: PartiesParameters,
        secret: Vec<u8>,
    ) -> Self {
        Self {
            public_key,
            parties_parameters,
            secret,
            metadata: KeyShareMetadata {
                created_at: Utc::now().timestamp(),
            },
        }
    }

    /// Public key as 0x-prefixed hex, the identifier shown to operators
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.public_key))
    }

    /// Share identifier
    pub fn share_id(&self) -> &str {
        &self.parties_parameters.share_id
    }

    /// Secret material, for the SDK that produced it
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("public_key", &self.public_key_hex())
            .field("parties_parameters", &self.parties_parameters)
            .field("secret", &"[REDACTED]")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Established session with the remote signing party
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier
    pub id: String,
    /// Kind of session
    pub kind: SessionKind,
    /// Parties the connection was negotiated for
    pub parties: PartiesParameters,
    /// Establishment timestamp
    pub established_at: DateTime<Utc>,
}

impl Connection {
    /// Create a connection handle
    pub fn new(kind: SessionKind, parties: PartiesParameters) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            parties,
            established_at: Utc::now(),
        }
    }

    /// Check whether this connection was negotiated for the given share
    pub fn is_for(&self, key_share: &KeyShare) -> bool {
        self.parties.share_id == key_share.parties_parameters.share_id
    }
}

/// Password credentials for the authentication service
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Whether these are the built-in demo credentials
    pub fn is_demo(&self) -> bool {
        self.email == DEMO_EMAIL
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEMO_EMAIL, DEMO_PASSWORD)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Native transfer handed to a wallet for signing and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Recipient address
    pub to: String,
    /// Amount in wei
    pub value: U256,
}

impl TransactionRequest {
    pub fn new(to: impl Into<String>, value: U256) -> Self {
        Self {
            to: to.into(),
            value,
        }
    }
}
