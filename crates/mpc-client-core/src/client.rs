//! MPC demo client
//!
//! Wires the log sink, session state, connection establisher and action
//! orchestrator around one SDK instance.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mpc_client_core::{ClientConfig, LocalMpcSdk, MpcClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sdk = LocalMpcSdk::new();
//! let client = MpcClient::new(Arc::new(sdk.clone()), ClientConfig::default())?;
//!
//! client.sign_in().await?;
//! client.generate_key_share().await?;
//! let wallet = client.wait_for_wallet(Duration::from_secs(10)).await?;
//! sdk.fund(wallet.address(), U256::from(100u64));
//! client.send_ethereum_transaction().await?;
//!
//! println!("{}", client.snapshot().log);
//! ```

use crate::busy::BusyFlag;
use crate::config::ClientConfig;
use crate::connection::ConnectionEstablisher;
use crate::log::LogSink;
use crate::orchestrator::{ActionOrchestrator, KeygenOutcome, SendOutcome};
use crate::sdk::{EthereumWallet, MpcSdk};
use crate::session::{ConnectionStatus, SessionEvent, SessionSnapshot, SessionState};
use crate::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Everything an operator view renders
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub busy: bool,
    pub log: String,
}

/// MPC wallet demo client
pub struct MpcClient {
    state: Arc<SessionState>,
    log: LogSink,
    busy: BusyFlag,
    orchestrator: ActionOrchestrator,
    establisher: Arc<ConnectionEstablisher>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MpcClient {
    /// Create a client and start its connection establisher
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(sdk: Arc<dyn MpcSdk>, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SessionState::new(config.event_capacity));
        let log = LogSink::new();
        let busy = BusyFlag::new();

        let establisher = Arc::new(ConnectionEstablisher::new(
            Arc::clone(&sdk),
            Arc::clone(&state),
            log.clone(),
            config.network.clone(),
        ));
        let task = establisher.spawn();

        let orchestrator = ActionOrchestrator::new(
            sdk,
            Arc::clone(&state),
            log.clone(),
            busy.clone(),
            config,
        );

        info!(
            chain = %orchestrator.config().network.chain_id.name(),
            "MPC client started"
        );

        Ok(Self {
            state,
            log,
            busy,
            orchestrator,
            establisher,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.orchestrator.config()
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self) -> Result<()> {
        self.orchestrator.sign_in().await
    }

    pub async fn generate_key_share(&self) -> Result<KeygenOutcome> {
        self.orchestrator.generate_key_share().await
    }

    pub async fn send_ethereum_transaction(&self) -> Result<SendOutcome> {
        self.orchestrator.send_ethereum_transaction().await
    }

    /// Re-run a failed negotiation for the current key share
    pub async fn retry_connection(&self) -> bool {
        self.establisher.retry().await
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            session: self.state.snapshot(),
            busy: self.busy.is_busy(),
            log: self.log.render(),
        }
    }

    /// Wait until a wallet handle is bound to the current key share
    ///
    /// Fails early if negotiation for the current key share fails.
    pub async fn wait_for_wallet(&self, timeout: Duration) -> Result<Arc<dyn EthereumWallet>> {
        let mut rx = self.state.subscribe();

        let wait = async {
            loop {
                if let Some(wallet) = self.state.wallet() {
                    return Ok(wallet);
                }
                if let ConnectionStatus::Failed { error } = self.state.connection_status() {
                    return Err(Error::ConnectionFailed(error.message));
                }

                match rx.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(Error::Internal("session event channel closed".into()));
                    }
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout(format!("no wallet after {:?}", timeout)))?
    }

    /// Stop the connection establisher
    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().take() {
            debug!("Stopping connection establisher");
            task.abort();
        }
    }
}

impl Drop for MpcClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpcClient")
            .field("state", &self.state)
            .field("busy", &self.busy.is_busy())
            .finish()
    }
}
