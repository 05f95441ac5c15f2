//! Long-running background task that writes lifecycle events to the
//! database.
//!
//! The lifecycle manager is synchronous, so it publishes into an unbounded
//! channel through [`ChannelSink`]; [`run`] drains the channel in batches.

use project_lifecycle::{EventSink, LifecycleEvent};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use crate::db;
use crate::events::NewEvent;

/// Most events written per batch.
const MAX_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<LifecycleEvent>,
}

pub fn channel() -> (ChannelSink, UnboundedReceiver<LifecycleEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl EventSink for ChannelSink {
    fn publish(&self, event: LifecycleEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("event journal closed, dropping {:?}", e.0.kind());
        }
    }
}

/// Persist events until every [`ChannelSink`] has been dropped.
pub async fn run(pool: SqlitePool, mut rx: UnboundedReceiver<LifecycleEvent>) {
    info!("Event journal starting");

    let mut batch = Vec::with_capacity(MAX_BATCH);
    while let Some(event) = rx.recv().await {
        batch.push(event);
        while batch.len() < MAX_BATCH {
            match rx.try_recv() {
                Ok(event) => batch.push(event),
                Err(_) => break,
            }
        }

        if let Err(e) = write_batch(&pool, &batch).await {
            error!("Event journal write error: {e}");
        }
        batch.clear();
    }

    info!("Event journal stopped");
}

async fn write_batch(pool: &SqlitePool, batch: &[LifecycleEvent]) -> crate::errors::Result<()> {
    let rows = batch
        .iter()
        .map(NewEvent::from_lifecycle)
        .collect::<crate::errors::Result<Vec<_>>>()?;
    let inserted = db::insert_events(pool, &rows).await?;
    info!("Journaled {inserted} lifecycle events");
    Ok(())
}
