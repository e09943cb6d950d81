//! Two-phase reconciliation with the relays.
//!
//! 1. **Incoming**: fetch the author's events newer than anything stored and
//!    merge them into the [`EventStore`].
//! 2. **Outgoing**: publish every record the relays have not acknowledged.
//!
//! Both phases always run. A failure on one event never stops the rest of
//! the batch; it is logged and reflected in the phase report.

use crate::{
    config::EngineConfig,
    error::Result,
    gateway::{Filter, GatewayError, RelayGateway},
    store::EventStore,
    Error, Event,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of the incoming phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingReport {
    /// Something in the store changed
    pub refresh_needed: bool,
    pub errors_occurred: bool,
    /// Events returned by the relays
    pub fetched: usize,
    /// Events that changed the store
    pub stored: usize,
    /// Events rejected before reaching the store
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Outcome of the outgoing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingReport {
    pub published_something: bool,
    pub errors_occurred: bool,
    /// Records accepted by at least one relay
    pub published: usize,
    /// Records still waiting for a relay
    pub pending: usize,
    pub errors: Vec<String>,
}

/// Combined outcome of [`SyncEngine::perform_sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Neither phase reported an error
    pub success: bool,
    /// Either phase changed local or remote state
    pub refresh_needed: bool,
    pub incoming: IncomingReport,
    pub outgoing: OutgoingReport,
    /// Human-readable summary of every failure
    pub causes: Vec<String>,
}

/// Reconciles the store with the relays for one author at a time.
///
/// Calls are re-entrant; concurrent syncs at worst fetch the same events
/// twice, and the store's merge makes that harmless.
pub struct SyncEngine {
    store: Arc<EventStore>,
    gateway: Arc<dyn RelayGateway>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(store: Arc<EventStore>, gateway: Arc<dyn RelayGateway>) -> Self {
        Self::with_config(store, gateway, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<EventStore>,
        gateway: Arc<dyn RelayGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run both phases for `actor`.
    ///
    /// Without an actor nothing is attempted and [`Error::MissingActor`] is
    /// returned.
    pub async fn perform_sync(&self, actor: Option<&str>) -> Result<SyncReport> {
        let author = actor.ok_or(Error::MissingActor)?;

        let incoming = self.sync_incoming(author).await;
        let outgoing = self.sync_outgoing(author).await;

        let causes: Vec<String> = incoming
            .errors
            .iter()
            .map(|e| format!("incoming: {e}"))
            .chain(outgoing.errors.iter().map(|e| format!("outgoing: {e}")))
            .collect();
        let report = SyncReport {
            success: !incoming.errors_occurred && !outgoing.errors_occurred,
            refresh_needed: incoming.refresh_needed || outgoing.published_something,
            incoming,
            outgoing,
            causes,
        };

        info!(
            author,
            success = report.success,
            refresh_needed = report.refresh_needed,
            stored = report.incoming.stored,
            published = report.outgoing.published,
            pending = report.outgoing.pending,
            "sync finished"
        );
        Ok(report)
    }

    /// Pull the author's newer events into the store.
    pub async fn sync_incoming(&self, author: &str) -> IncomingReport {
        let mut report = IncomingReport::default();

        let mut filter = Filter::new()
            .authors([author.to_string()])
            .kinds(self.config.sync_kinds.iter().copied());
        if let Some(latest) = self.store.latest_timestamp_for(author).await {
            filter = filter.since(latest.saturating_add(1));
        }

        let events = match self.fetch_with_retry(&filter).await {
            Ok(events) => events,
            Err(e) => {
                error!(author, error = %e, "incoming fetch failed");
                report.errors_occurred = true;
                report.errors.push(format!("fetch failed: {e}"));
                return report;
            }
        };
        report.fetched = events.len();

        for event in events {
            if event.author != author {
                warn!(event_id = %event.id, expected = author, got = %event.author, "skipping event from another author");
                report.skipped += 1;
                continue;
            }
            if let Err(e) = event.verify() {
                warn!(event_id = %event.id, error = %e, "skipping invalid event");
                report.skipped += 1;
                continue;
            }

            let id = event.id.clone();
            match self.store.put(event, None).await {
                Ok(outcome) if outcome.changed() => {
                    report.stored += 1;
                    report.refresh_needed = true;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(event_id = %id, error = %e, "failed to store incoming event");
                    report.errors_occurred = true;
                    report.errors.push(format!("{id}: {e}"));
                }
            }
        }

        debug!(
            author,
            fetched = report.fetched,
            stored = report.stored,
            skipped = report.skipped,
            "incoming phase done"
        );
        report
    }

    /// Publish the author's records that no relay has accepted yet.
    pub async fn sync_outgoing(&self, author: &str) -> OutgoingReport {
        let mut report = OutgoingReport::default();

        let records = match self.store.get_unpublished(author).await {
            Ok(records) => records,
            Err(e) => {
                error!(author, error = %e, "failed to read unpublished records");
                report.errors_occurred = true;
                report.errors.push(format!("reading unpublished records: {e}"));
                return report;
            }
        };

        for record in records {
            let event = record.event;
            if let Err(e) = event.verify() {
                warn!(event_id = %event.id, error = %e, "not publishing unsigned or altered record");
                report.pending += 1;
                continue;
            }

            match self.gateway.publish(&event).await {
                Ok(accepted) if accepted.is_empty() => {
                    warn!(event_id = %event.id, "no relay accepted event, will retry next sync");
                    report.pending += 1;
                }
                Ok(accepted) => {
                    debug!(event_id = %event.id, relays = accepted.len(), "event published");
                    if let Err(e) = self.store.mark_published(&event.id).await {
                        error!(event_id = %event.id, error = %e, "failed to record publication");
                        report.errors_occurred = true;
                        report.errors.push(format!("{}: {e}", event.id));
                    }
                    report.published += 1;
                    report.published_something = true;
                }
                Err(e) => {
                    error!(event_id = %event.id, error = %e, "publish failed");
                    report.errors_occurred = true;
                    report.errors.push(format!("{}: {e}", event.id));
                    report.pending += 1;
                }
            }
        }
        report
    }

    async fn fetch_with_retry(&self, filter: &Filter) -> std::result::Result<Vec<Event>, GatewayError> {
        let attempts = self.config.fetch_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.gateway.fetch(filter).await {
                Ok(events) => return Ok(events),
                Err(e) if attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "fetch failed, retrying");
                    tokio::time::sleep(self.config.fetch_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
