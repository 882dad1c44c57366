//! Connection establisher
//!
//! Binds a wallet handle to every new key share. A single subscriber task
//! consumes `KeyShareChanged` events in order; for each one it negotiates a
//! signing session with the SDK, derives the wallet and publishes it for the
//! generation it was derived from.
//!
//! The session negotiated for a key share is closed as soon as that share is
//! replaced, so no connection outlives its key share.
//!
//! A failed negotiation is final for that key share. It is surfaced as a
//! connection status and event, and only an explicit [`ConnectionEstablisher::retry`]
//! runs it again.

use crate::chain::NetworkConfig;
use crate::log::LogSink;
use crate::sdk::{EthereumWallet, MpcSdk};
use crate::session::{ConnectionStatus, SessionEvent, SessionState};
use crate::{Connection, Error, KeyShare, Result, SessionKind};
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Reactive wallet binder
pub struct ConnectionEstablisher {
    sdk: Arc<dyn MpcSdk>,
    state: Arc<SessionState>,
    log: LogSink,
    network: NetworkConfig,
    /// Held for the duration of a negotiation
    negotiation: Mutex<()>,
    /// Connection backing the published wallet, with its generation
    active: SyncMutex<Option<(u64, Connection)>>,
}

impl ConnectionEstablisher {
    pub fn new(
        sdk: Arc<dyn MpcSdk>,
        state: Arc<SessionState>,
        log: LogSink,
        network: NetworkConfig,
    ) -> Self {
        Self {
            sdk,
            state,
            log,
            network,
            negotiation: Mutex::new(()),
            active: SyncMutex::new(None),
        }
    }

    /// Start the subscriber task
    ///
    /// The subscription is taken before this returns, so no key-share write
    /// made afterwards can be missed.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.state.subscribe();
        let this = Arc::clone(self);

        tokio::spawn(async move { this.run(rx).await })
    }

    async fn run(&self, mut rx: broadcast::Receiver<SessionEvent>) {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::KeyShareChanged { generation, .. }) => {
                    self.close_superseded(generation).await;
                    if generation != self.state.generation() {
                        debug!(generation, "Skipping superseded key share");
                        continue;
                    }
                    self.establish(generation, false).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session events lagged");
                    self.catch_up().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Session event channel closed");
                    break;
                }
            }
        }
    }

    /// After lagging, negotiate for the current share if nobody has yet
    async fn catch_up(&self) {
        let generation = self.state.generation();
        self.close_superseded(generation).await;
        if generation > 0
            && self.state.wallet().is_none()
            && !self.state.connection_status().is_failed()
        {
            self.establish(generation, false).await;
        }
    }

    /// Negotiate and publish a wallet for `generation`
    #[instrument(skip(self))]
    async fn establish(&self, generation: u64, retrying: bool) {
        let _negotiation = self.negotiation.lock().await;

        // A queued event may name a generation that is already settled
        match self.state.connection_status() {
            ConnectionStatus::Connected if self.state.generation() == generation => return,
            ConnectionStatus::Failed { .. } if !retrying => return,
            _ => {}
        }

        let Some(key_share) = self.state.begin_connection(generation) else {
            debug!("Key share superseded before negotiation");
            return;
        };

        match self.connect(&key_share).await {
            Ok((connection, wallet)) => {
                let address = wallet.address().to_string();
                match self.state.publish_wallet(generation, wallet) {
                    Ok(()) => {
                        info!(%address, "Wallet ready");
                        *self.active.lock() = Some((generation, connection));
                    }
                    Err(e) => {
                        debug!("Dropping wallet: {}", e);
                        self.close(&connection).await;
                    }
                }
            }
            Err(e) => {
                error!(share_id = %key_share.share_id(), "Connection failed: {}", e);

                if self.state.record_connection_failure(generation, &e).is_ok() {
                    self.log.append(format!("connection failed: {}", e.to_json()));
                }
            }
        }
    }

    async fn connect(
        &self,
        key_share: &Arc<KeyShare>,
    ) -> Result<(Connection, Arc<dyn EthereumWallet>)> {
        let connection = self
            .sdk
            .establish_connection(SessionKind::Sign, &key_share.parties_parameters)
            .await?;

        let wallet = if connection.is_for(key_share) {
            self.sdk
                .make_wallet(Arc::clone(key_share), connection.clone(), &self.network)
        } else {
            Err(Error::ConnectionMismatch(format!(
                "connection {} is not for share {}",
                connection.id,
                key_share.share_id()
            )))
        };

        match wallet {
            Ok(wallet) => Ok((connection, wallet)),
            Err(e) => {
                self.close(&connection).await;
                Err(e)
            }
        }
    }

    /// Close the active connection if it belongs to an older generation
    async fn close_superseded(&self, generation: u64) {
        let superseded = {
            let mut active = self.active.lock();
            if active.as_ref().is_some_and(|(current, _)| *current < generation) {
                active.take()
            } else {
                None
            }
        };

        if let Some((old, connection)) = superseded {
            debug!(generation = old, "Closing superseded connection");
            self.close(&connection).await;
        }
    }

    async fn close(&self, connection: &Connection) {
        if let Err(e) = self.sdk.close_connection(connection).await {
            warn!(connection_id = %connection.id, "Failed to close connection: {}", e);
        }
    }

    /// Re-run negotiation for the current key share if its last attempt failed
    ///
    /// Returns whether a negotiation was run.
    pub async fn retry(&self) -> bool {
        if !self.state.connection_status().is_failed() {
            return false;
        }

        info!("Retrying connection");
        self.establish(self.state.generation(), true).await;
        true
    }
}

impl std::fmt::Debug for ConnectionEstablisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEstablisher")
            .field("network", &self.network.chain_id)
            .finish()
    }
}
