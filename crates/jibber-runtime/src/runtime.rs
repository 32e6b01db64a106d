//! The event loop.
//!
//! [`JibberRuntime`] loads configuration, sets up logging, builds a
//! [`Dispatcher`] over a [`ChannelTransport`] and then feeds it inbound
//! events one at a time until shutdown.
//!
//! ```rust,ignore
//! use jibber_runtime::JibberRuntime;
//!
//! let runtime = JibberRuntime::builder()
//!     .config_file("jibber.toml")
//!     .catalog(catalog)
//!     .build()?;
//!
//! let inbound = runtime.take_inbound();
//! let outbound = runtime.take_outbound();
//! // hand both ends to the XMPP session, then:
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jibber_core::{InboundEvent, OutboundMessage};
use jibber_framework::{Dispatcher, HandlerCatalog};
use parking_lot::{Mutex, RwLock};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, JibberConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::transport::ChannelTransport;

/// Where configuration comes from, kept for reloads.
#[derive(Debug, Clone, Default)]
struct ConfigSource {
    file: Option<PathBuf>,
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    without_env: bool,
    overrides: Vec<JibberConfig>,
}

impl ConfigSource {
    fn load(&self) -> RuntimeResult<JibberConfig> {
        let mut loader = ConfigLoader::new();
        if let Some(file) = &self.file {
            loader = loader.file(file);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile(profile);
        }
        for path in &self.search_paths {
            loader = loader.search_path(path);
        }
        if self.without_env {
            loader = loader.without_env();
        }
        for config in &self.overrides {
            loader = loader.merge(config.clone());
        }

        let config = loader.load()?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Drives a [`Dispatcher`] from a channel of inbound events.
pub struct JibberRuntime {
    source: ConfigSource,
    config: RwLock<JibberConfig>,
    dispatcher: Arc<Dispatcher>,
    transport: ChannelTransport,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<InboundEvent>>>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<InboundEvent>>>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundMessage>>>,
}

impl JibberRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> JibberConfig {
        self.config.read().clone()
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The transport the dispatcher sends through.
    pub fn transport(&self) -> &ChannelTransport {
        &self.transport
    }

    /// Takes the sender of inbound events. Returns `None` once taken.
    ///
    /// The event loop stops once this sender and all its clones are dropped.
    pub fn take_inbound(&self) -> Option<mpsc::UnboundedSender<InboundEvent>> {
        self.inbound_tx.lock().take()
    }

    /// Takes the receiver of outbound messages. Returns `None` once taken.
    pub fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<OutboundMessage>> {
        self.outbound_rx.lock().take()
    }

    /// Re-reads configuration and rebuilds the dispatcher state.
    ///
    /// On error the running configuration stays in effect.
    pub fn reload(&self) -> RuntimeResult<()> {
        let config = self.source.load()?;
        self.dispatcher.setup(&config.client)?;
        info!(packages = config.client.packages.len(), "Configuration reloaded");
        *self.config.write() = config;
        Ok(())
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Jibber runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or every inbound sender is dropped.
    ///
    /// Queued events are delivered before shutdown is observed.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut inbound = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyRunning)?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                event = inbound.recv() => match event {
                    Some(event) => self.dispatcher.handle(&event),
                    None => {
                        debug!("Inbound channel closed");
                        break;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        self.stop();
        Ok(())
    }

    /// Cancels every pending timer.
    pub fn stop(&self) {
        info!("Stopping jibber runtime");
        self.dispatcher.clear_timers();
        self.transport.close();
        info!("Runtime stopped");
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`JibberRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    source: ConfigSource,
    catalog: HandlerCatalog,
    seed: Option<u64>,
}

impl RuntimeBuilder {
    /// Loads configuration from this file instead of searching.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.source.profile = Some(profile.into());
        self
    }

    /// Adds a directory to search for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `JIBBER_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.source.without_env = true;
        self
    }

    /// Merges configuration on top of every other source.
    pub fn merge(mut self, config: JibberConfig) -> Self {
        self.source.overrides.push(config);
        self
    }

    /// Sets the handler classes configuration may instantiate.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Seeds timer jitter.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Loads configuration, initializes logging and wires the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> RuntimeResult<JibberRuntime> {
        let config = self.source.load()?;
        logging::init_from_config(&config.logging);

        let (transport, outbound_rx) = ChannelTransport::new();
        let mut dispatcher = Dispatcher::builder(Arc::new(transport.clone()))
            .catalog(self.catalog)
            .nickname(config.client.nickname.clone());
        if let Some(seed) = self.seed {
            dispatcher = dispatcher.seed(seed);
        }
        let dispatcher = dispatcher.build();
        dispatcher.setup(&config.client)?;

        info!(
            log_level = %config.logging.level,
            nickname = %config.client.nickname,
            rooms = config.client.rooms.len(),
            "Runtime initialized from configuration"
        );

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Ok(JibberRuntime {
            source: self.source,
            config: RwLock::new(config),
            dispatcher,
            transport,
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
        })
    }
}
