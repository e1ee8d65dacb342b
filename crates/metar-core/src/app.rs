use std::future::Future;
use std::sync::Arc;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::entity::{EntityRegistry, EntityState};
use crate::error::{AppError, ConfigError};
use crate::{Config, PlatformProvider};

/// Host state: configured platforms, their entities, and the poll loop
pub struct App {
    config: Arc<Config>,
    platforms: Vec<Box<dyn PlatformProvider>>,
    registry: EntityRegistry,
}

impl App {
    /// Create a new host for the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            platforms: Vec::new(),
            registry: EntityRegistry::new(),
        }
    }

    /// Register a platform with the host
    pub fn register_platform(&mut self, platform: Box<dyn PlatformProvider>) {
        tracing::info!("Registering platform: {}", platform.name());
        self.platforms.push(platform);
    }

    /// Set up every configured sensor block, then run the initial update.
    ///
    /// All blocks are set up before any entity is updated, so a bad block
    /// fails startup without touching the network.
    pub async fn initialize(&mut self) -> Result<(), AppError> {
        tracing::info!(
            "Initializing {} sensor blocks with {} platforms",
            self.config.sensors.len(),
            self.platforms.len()
        );

        for block in &self.config.sensors {
            let platform = self
                .platforms
                .iter()
                .find(|p| p.name() == block.platform)
                .ok_or_else(|| ConfigError::UnknownPlatform(block.platform.clone()))?;

            tracing::debug!("Setting up platform: {}", platform.name());
            platform.setup(&block.options, &mut self.registry)?;
        }

        let mut initial = 0;
        for entry in self.registry.entries_mut() {
            if entry.update_before_add {
                entry.entity.update().await;
                entry.update_before_add = false;
                initial += 1;
            }
        }

        tracing::info!(
            "Initialized {} entities ({} updated before add)",
            self.registry.len(),
            initial
        );
        Ok(())
    }

    /// Update every entity once, serially, in registration order
    pub async fn poll_once(&mut self) -> usize {
        let mut polled = 0;
        for entry in self.registry.entries_mut() {
            entry.entity.update().await;
            polled += 1;
        }
        tracing::debug!("Polled {} entities", polled);
        polled
    }

    /// Poll every `scan_interval` until `shutdown` resolves.
    ///
    /// `on_poll` sees the entity states after each poll. Fails without
    /// polling when the scan interval is zero.
    pub async fn run<F, S>(&mut self, shutdown: S, mut on_poll: F) -> Result<(), AppError>
    where
        S: Future<Output = ()>,
        F: FnMut(&[EntityState]),
    {
        let period = self.config.polling.scan_interval();
        if period.is_zero() {
            return Err(ConfigError::Invalid("polling.scan_interval_secs must be greater than 0".into()).into());
        }
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!("Polling every {:?}", period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                    on_poll(&self.states());
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping poll loop");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Current state of every entity
    pub fn states(&self) -> Vec<EntityState> {
        self.registry.states()
    }

    /// Shutdown the host, releasing every entity and platform.
    ///
    /// Returns how many entities were released.
    pub fn shutdown(&mut self) -> usize {
        let released = std::mem::take(&mut self.registry).len();
        for platform in self.platforms.drain(..) {
            tracing::debug!("Releasing platform: {}", platform.name());
        }
        tracing::info!("Shut down, released {} entities", released);
        released
    }

    /// Get reference to host config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}
