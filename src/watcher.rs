//! Background reload loop
//!
//! Polls the registry (and reacts to its change notifications), loads a
//! fresh tree, feeds it to the comparer and reports what changed.

use std::{sync::Arc, time::Duration};

use conf_registry::Registry;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc, watch},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    conf::{ChangeSet, ConfigTree, Decryptor, SnapshotComparer},
    error::{ConfError, ConfResult},
};

pub struct ConfWatcher {
    registry: Arc<dyn Registry>,
    main_path: String,
    comparer: Arc<SnapshotComparer>,
    decryptor: Arc<dyn Decryptor>,
    poll_interval: Duration,
}

impl ConfWatcher {
    pub fn new(
        registry: Arc<dyn Registry>,
        main_path: impl Into<String>,
        comparer: Arc<SnapshotComparer>,
        decryptor: Arc<dyn Decryptor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            main_path: main_path.into(),
            comparer,
            decryptor,
            poll_interval,
        }
    }

    pub fn comparer(&self) -> &Arc<SnapshotComparer> {
        &self.comparer
    }

    /// Run one load + update + diff cycle.
    ///
    /// The comparer only advances when the main configuration's version (or
    /// presence) moved; sub-configuration edits are picked up together with
    /// the next root bump. A missing main configuration is installed as an
    /// absent tree. Any other failure leaves the comparer untouched.
    pub async fn refresh(&self) -> ConfResult<ChangeSet> {
        let tree = match ConfigTree::load(
            self.registry.as_ref(),
            &self.main_path,
            self.decryptor.as_ref(),
        )
        .await
        {
            Ok(tree) => tree,
            Err(ConfError::NotFound(path)) if path == self.main_path => {
                debug!("No configuration at {}", self.main_path);
                ConfigTree::absent(self.main_path.clone())
            }
            Err(e) => return Err(e),
        };

        let current = self.comparer.candidate().map(|t| t.version());
        if current == Some(tree.version()) {
            debug!(version = ?tree.version(), "Main configuration version unchanged");
            return Ok(ChangeSet::default());
        }

        self.comparer.update(tree);
        Ok(self.comparer.changes())
    }

    /// Start the reload loop
    ///
    /// # Arguments
    /// * `shutdown_rx` - A watch receiver that signals when to stop the task
    /// * `changes_tx` - Receives a [`ChangeSet`] whenever something changed
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        changes_tx: mpsc::Sender<ChangeSet>,
    ) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events = self.registry.subscribe();
        let mut events_open = true;

        info!(
            path = %self.main_path,
            values = ?self.comparer.watched_values(),
            sub_confs = ?self.comparer.watched_sub_confs(),
            "Starting configuration watcher with {:?} poll interval",
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                event = events.recv(), if events_open => match event {
                    Ok(event) if event.touches(&self.main_path) => {
                        debug!("Registry event {:?} on {}", event.kind, event.path);
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Configuration watcher lagged behind {} registry events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        warn!("Registry notifications closed, falling back to polling");
                        events_open = false;
                        continue;
                    }
                },
                _ = shutdown_rx.changed() => {
                    info!("Configuration watcher received shutdown signal");
                    break;
                }
            }

            match self.refresh().await {
                Ok(changes) if changes.any() => {
                    info!(
                        conf = changes.conf,
                        sub_confs = changes.sub_confs,
                        values = changes.values,
                        "Configuration changed"
                    );
                    if changes_tx.send(changes).await.is_err() {
                        info!("Change receiver dropped, stopping configuration watcher");
                        break;
                    }
                }
                Ok(_) => debug!("Configuration unchanged"),
                Err(e) => warn!(error = %e, "Failed to load configuration, keeping current"),
            }
        }

        info!("Configuration watcher stopped");
    }
}
