//! In-process MPC SDK
//!
//! `LocalMpcSdk` implements every collaborator contract inside the current
//! process and plays the remote signing party itself. It is useful for:
//! - Running the demo flow without a hosted signing service
//! - Integration tests of the orchestration layer
//!
//! Key shares are additive 2-of-2 shares on secp256k1: the client receives
//! `x1` and the joint public key `(x1 + x2)·G`, the server side keeps `x2`
//! indexed by share id. Signing combines both halves for the prehash of an
//! EIP-155 transfer. Balances live in an in-memory ledger; gas is not charged.

use super::legacy_tx::{LegacyTransaction, RecoverableSignature, keccak256};
use super::{
    AuthService, EthereumWallet, KeyShareGenerator, SessionEstablisher, WalletFactory,
    async_trait,
};
use crate::chain::{NetworkConfig, TxHash, validate_address};
use crate::{
    Connection, Credentials, Error, KeyShare, PartiesParameters, Result, SessionKind, ShareId,
    TransactionRequest,
};
use alloy_primitives::{Address, U256};
use dashmap::DashMap;
use k256::{
    AffinePoint, EncodedPoint, NonZeroScalar, ProjectivePoint, Scalar,
    ecdsa::SigningKey,
    elliptic_curve::{
        Field, PrimeField,
        sec1::{FromEncodedPoint, ToEncodedPoint},
    },
};
use parking_lot::{Mutex, RwLock};
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Gas price quoted by the local wallet (1 gwei)
const LOCAL_GAS_PRICE: u128 = 1_000_000_000;

/// Configuration for [`LocalMpcSdk`]
#[derive(Debug, Clone)]
pub struct LocalSdkConfig {
    /// Registered accounts (e-mail -> password)
    pub accounts: HashMap<String, String>,
    /// Artificial delay applied to every remote call
    pub latency: Duration,
    /// Reject key generation and sessions until someone has signed in
    pub require_auth: bool,
}

impl Default for LocalSdkConfig {
    fn default() -> Self {
        let demo = Credentials::default();
        let mut accounts = HashMap::new();
        accounts.insert(demo.email, demo.password);

        Self {
            accounts,
            latency: Duration::ZERO,
            require_auth: false,
        }
    }
}

impl LocalSdkConfig {
    /// Register an additional account
    pub fn with_account(mut self, credentials: Credentials) -> Self {
        self.accounts.insert(credentials.email, credentials.password);
        self
    }

    /// Set per-call latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Require sign-in before key generation and sessions
    pub fn with_required_auth(mut self, required: bool) -> Self {
        self.require_auth = required;
        self
    }
}

/// Call counters, for tests and the demo summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LocalStats {
    pub sign_ins: usize,
    pub key_shares: usize,
    pub connections: usize,
    pub broadcasts: usize,
}

/// Transfer settled by the local ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledTransfer {
    pub from: String,
    pub to: String,
    pub value: U256,
    pub hash: String,
    pub raw_tx: Vec<u8>,
}

#[derive(Debug, Default)]
struct Counters {
    sign_ins: AtomicUsize,
    key_shares: AtomicUsize,
    connections: AtomicUsize,
    broadcasts: AtomicUsize,
}

/// Server half of a key share
struct ServerShare {
    secret: Scalar,
    public_key: Vec<u8>,
}

struct LocalState {
    config: LocalSdkConfig,
    signed_in: RwLock<Option<String>>,
    server_shares: DashMap<ShareId, ServerShare>,
    connections: DashMap<String, Connection>,
    /// Ledger balances keyed by lowercase address
    ledger: DashMap<String, U256>,
    nonces: DashMap<String, u64>,
    transfers: Mutex<Vec<SettledTransfer>>,
    counters: Counters,
}

impl LocalState {
    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn check_auth(&self, action: &str) -> Result<()> {
        if self.config.require_auth && self.signed_in.read().is_none() {
            return Err(Error::Unauthorized(format!("sign in before {}", action)));
        }
        Ok(())
    }
}

/// In-process implementation of the MPC SDK
///
/// Cloning yields another handle to the same signing party and ledger.
#[derive(Clone)]
pub struct LocalMpcSdk {
    state: Arc<LocalState>,
}

impl LocalMpcSdk {
    /// Create a local SDK with the demo account registered
    pub fn new() -> Self {
        Self::with_config(LocalSdkConfig::default())
    }

    /// Create a local SDK with custom configuration
    pub fn with_config(config: LocalSdkConfig) -> Self {
        Self {
            state: Arc::new(LocalState {
                config,
                signed_in: RwLock::new(None),
                server_shares: DashMap::new(),
                connections: DashMap::new(),
                ledger: DashMap::new(),
                nonces: DashMap::new(),
                transfers: Mutex::new(Vec::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Credit an address in the local ledger
    pub fn fund(&self, address: &str, amount: U256) {
        let mut balance = self.state.ledger.entry(address.to_lowercase()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Ledger balance of an address
    pub fn balance_of(&self, address: &str) -> U256 {
        self.state
            .ledger
            .get(&address.to_lowercase())
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// E-mail of the signed-in account
    pub fn signed_in_as(&self) -> Option<String> {
        self.state.signed_in.read().clone()
    }

    /// Tear down a negotiated connection, as if the server hung up
    pub fn drop_connection(&self, connection_id: &str) -> bool {
        self.state.connections.remove(connection_id).is_some()
    }

    /// Tear down every connection, as if the server restarted
    pub fn disconnect_all(&self) -> usize {
        let count = self.state.connections.len();
        self.state.connections.clear();
        count
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Transfers settled so far
    pub fn transfers(&self) -> Vec<SettledTransfer> {
        self.state.transfers.lock().clone()
    }

    /// Snapshot of call counters
    pub fn stats(&self) -> LocalStats {
        let c = &self.state.counters;
        LocalStats {
            sign_ins: c.sign_ins.load(Ordering::Relaxed),
            key_shares: c.key_shares.load(Ordering::Relaxed),
            connections: c.connections.load(Ordering::Relaxed),
            broadcasts: c.broadcasts.load(Ordering::Relaxed),
        }
    }
}

impl Default for LocalMpcSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalMpcSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMpcSdk")
            .field("shares", &self.state.server_shares.len())
            .field("connections", &self.state.connections.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl AuthService for LocalMpcSdk {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<()> {
        self.state.simulate_latency().await;
        self.state.counters.sign_ins.fetch_add(1, Ordering::Relaxed);

        match self.state.config.accounts.get(&credentials.email) {
            Some(password) if *password == credentials.password => {
                *self.state.signed_in.write() = Some(credentials.email.clone());
                info!("Signed in");
                Ok(())
            }
            _ => {
                warn!("Rejected sign-in");
                Err(Error::AuthFailed("invalid e-mail or password".into()))
            }
        }
    }
}

#[async_trait]
impl KeyShareGenerator for LocalMpcSdk {
    #[instrument(skip(self))]
    async fn generate_key_share_2of2(&self) -> Result<KeyShare> {
        self.state.check_auth("generating a key share")?;
        self.state.simulate_latency().await;

        let client_secret = Scalar::random(&mut OsRng);
        let server_secret = Scalar::random(&mut OsRng);
        let joint = Option::<NonZeroScalar>::from(NonZeroScalar::new(client_secret + server_secret))
            .ok_or_else(|| Error::KeyGeneration("degenerate joint secret".into()))?;

        let public_point = ProjectivePoint::GENERATOR * *joint;
        let public_key = public_point
            .to_affine()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();

        let share_id = uuid::Uuid::new_v4().to_string();
        self.state.server_shares.insert(
            share_id.clone(),
            ServerShare {
                secret: server_secret,
                public_key: public_key.clone(),
            },
        );
        self.state.counters.key_shares.fetch_add(1, Ordering::Relaxed);

        debug!(share_id = %share_id, "Generated 2-of-2 key share");

        Ok(KeyShare::new(
            public_key,
            PartiesParameters::two_of_two(share_id),
            client_secret.to_bytes().to_vec(),
        ))
    }
}

#[async_trait]
impl SessionEstablisher for LocalMpcSdk {
    #[instrument(skip(self, parties), fields(share_id = %parties.share_id))]
    async fn establish_connection(
        &self,
        kind: SessionKind,
        parties: &PartiesParameters,
    ) -> Result<Connection> {
        self.state.check_auth("opening a session")?;
        self.state.simulate_latency().await;

        parties
            .validate()
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        if !self.state.server_shares.contains_key(&parties.share_id) {
            return Err(Error::ConnectionFailed(format!(
                "signing party holds no share {}",
                parties.share_id
            )));
        }

        let connection = Connection::new(kind, parties.clone());
        self.state
            .connections
            .insert(connection.id.clone(), connection.clone());
        self.state.counters.connections.fetch_add(1, Ordering::Relaxed);

        debug!(connection_id = %connection.id, "Established {} session", kind);
        Ok(connection)
    }

    async fn close_connection(&self, connection: &Connection) -> Result<()> {
        if self.state.connections.remove(&connection.id).is_some() {
            debug!(connection_id = %connection.id, "Closed session");
        }
        Ok(())
    }
}

impl WalletFactory for LocalMpcSdk {
    fn make_wallet(
        &self,
        key_share: Arc<KeyShare>,
        connection: Connection,
        network: &NetworkConfig,
    ) -> Result<Arc<dyn EthereumWallet>> {
        if !connection.is_for(&key_share) {
            return Err(Error::ConnectionMismatch(format!(
                "connection {} was negotiated for share {}",
                connection.id, connection.parties.share_id
            )));
        }

        let address = eth_address(&key_share.public_key)?;

        Ok(Arc::new(LocalWallet {
            address,
            key_share,
            connection,
            network: network.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Wallet bound to a local key share and connection
pub struct LocalWallet {
    address: String,
    key_share: Arc<KeyShare>,
    connection: Connection,
    network: NetworkConfig,
    state: Arc<LocalState>,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("share_id", &self.key_share.share_id())
            .field("connection", &self.connection.id)
            .field("chain_id", &self.network.chain_id)
            .finish()
    }
}

impl LocalWallet {
    /// Combine both halves of the key into a signing key
    fn joint_signing_key(&self) -> Result<SigningKey> {
        let client = scalar_from_bytes(self.key_share.secret_bytes())?;

        let server = self
            .state
            .server_shares
            .get(self.key_share.share_id())
            .ok_or_else(|| Error::KeyShareNotFound(self.key_share.share_id().to_string()))?;

        if server.public_key != self.key_share.public_key {
            return Err(Error::Crypto("public key mismatch between parties".into()));
        }

        let joint = Option::<NonZeroScalar>::from(NonZeroScalar::new(client + server.secret))
            .ok_or_else(|| Error::Crypto("degenerate joint secret".into()))?;

        Ok(SigningKey::from(joint))
    }

    fn sign(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature> {
        let key = self.joint_signing_key()?;
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        let (r, s) = signature.split_bytes();
        Ok(RecoverableSignature {
            r: r.into(),
            s: s.into(),
            recovery_id: recovery_id.to_byte(),
        })
    }
}

#[async_trait]
impl EthereumWallet for LocalWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn get_balance(&self) -> Result<U256> {
        self.state.simulate_latency().await;

        Ok(self
            .state
            .ledger
            .get(&self.address)
            .map(|b| *b)
            .unwrap_or_default())
    }

    #[instrument(skip(self, request), fields(from = %self.address, to = %request.to, value = %request.value))]
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash> {
        self.state.simulate_latency().await;

        if !self.state.connections.contains_key(&self.connection.id) {
            return Err(Error::ConnectionFailed(format!(
                "session {} is closed",
                self.connection.id
            )));
        }

        validate_address(&request.to)?;
        let to = Address::from_str(&request.to)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", request.to, e)))?;

        let balance = self
            .state
            .ledger
            .get(&self.address)
            .map(|b| *b)
            .unwrap_or_default();
        if balance < request.value {
            return Err(Error::InsufficientFunds {
                balance: balance.to_string(),
                required: request.value.to_string(),
            });
        }

        let chain_id = self.network.chain_id.0;

        // The nonce entry stays locked until the debit lands, so concurrent
        // sends from this address get consecutive nonces
        let (hash, raw_tx) = {
            let mut nonce = self.state.nonces.entry(self.address.clone()).or_insert(0);
            let tx = LegacyTransaction::transfer(*nonce, LOCAL_GAS_PRICE, to, request.value);

            let signature = self.sign(&tx.signing_hash(chain_id))?;
            let raw_tx = tx.encode_signed(&signature, chain_id);
            let hash = format!("0x{}", hex::encode(keccak256(&raw_tx)));

            {
                let mut from_balance = self.state.ledger.entry(self.address.clone()).or_default();
                if *from_balance < request.value {
                    return Err(Error::InsufficientFunds {
                        balance: from_balance.to_string(),
                        required: request.value.to_string(),
                    });
                }
                *from_balance -= request.value;
            }
            *nonce += 1;

            (hash, raw_tx)
        };
        self.fund_recipient(&request.to, request.value);

        self.state.transfers.lock().push(SettledTransfer {
            from: self.address.clone(),
            to: request.to.to_lowercase(),
            value: request.value,
            hash: hash.clone(),
            raw_tx,
        });
        self.state.counters.broadcasts.fetch_add(1, Ordering::Relaxed);

        info!(tx_hash = %hash, "Broadcast transfer");

        let mut tx_hash = TxHash::new(hash);
        if let Some(url) = self.network.explorer_tx_url(&tx_hash.hash) {
            tx_hash = tx_hash.with_explorer_url(url);
        }
        Ok(tx_hash)
    }
}

impl LocalWallet {
    fn fund_recipient(&self, to: &str, value: U256) {
        let mut balance = self.state.ledger.entry(to.to_lowercase()).or_default();
        *balance = balance.saturating_add(value);
    }
}

/// Derive the Ethereum address of a SEC1-encoded secp256k1 public key
pub fn eth_address(public_key: &[u8]) -> Result<String> {
    let encoded = EncodedPoint::from_bytes(public_key)
        .map_err(|e| Error::Crypto(format!("Invalid public key: {}", e)))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| Error::Crypto("Public key is not on the curve".into()))?;

    let uncompressed = affine.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);

    Ok(format!("0x{}", hex::encode(&hash[12..])))
}

fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let repr = <[u8; 32]>::try_from(bytes)
        .map_err(|_| Error::Crypto(format!("Invalid share length: {}", bytes.len())))?;

    Option::<Scalar>::from(Scalar::from_repr(repr.into()))
        .ok_or_else(|| Error::Crypto("Share is not a valid scalar".into()))
}
