//! Ring store: the versioned source of truth for the current ring.
//!
//! Members read the current ring, publish successors and subscribe to
//! changes. Publishing is a compare-and-swap on the ring version so that two
//! mutations based on the same predecessor cannot both win.

use std::sync::Arc;

use corelib::{Placement, Ring};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{Result, StreamingError};

/// Default capacity of the change channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Metadata store collaborator holding the cluster's ring.
#[async_trait::async_trait]
pub trait RingStore: Send + Sync {
    /// The ring currently in force.
    async fn current_ring(&self) -> Result<Arc<Ring>>;

    /// Publishes `ring` as the successor of the current one.
    ///
    /// Unless `replace_existing` is set the version must be exactly one past
    /// the stored version, otherwise [`StreamingError::StaleVersion`].
    async fn publish_ring(&self, ring: Ring, replace_existing: bool) -> Result<()>;

    /// Receives every ring published after this call.
    fn subscribe(&self) -> broadcast::Receiver<Arc<Ring>>;
}

struct Stored {
    encoded: Vec<u8>,
    ring: Arc<Ring>,
}

/// In-process [`RingStore`].
///
/// Rings are kept in wire form and subscribers receive the decoded copy, so
/// everything that reaches a member has crossed the encoding boundary.
pub struct MemoryRingStore {
    stored: RwLock<Stored>,
    changes: broadcast::Sender<Arc<Ring>>,
}

impl MemoryRingStore {
    pub fn new(initial: Ring) -> Result<Self> {
        Self::with_capacity(initial, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(initial: Ring, capacity: usize) -> Result<Self> {
        let (changes, _) = broadcast::channel(capacity.max(1));
        let encoded = initial.marshal()?;
        let ring = Arc::new(Ring::unmarshal(&encoded)?);
        Ok(Self {
            stored: RwLock::new(Stored { encoded, ring }),
            changes,
        })
    }

    /// The stored wire bytes of the current ring.
    pub fn encoded(&self) -> Vec<u8> {
        self.stored.read().encoded.clone()
    }
}

#[async_trait::async_trait]
impl RingStore for MemoryRingStore {
    async fn current_ring(&self) -> Result<Arc<Ring>> {
        Ok(self.stored.read().ring.clone())
    }

    async fn publish_ring(&self, ring: Ring, replace_existing: bool) -> Result<()> {
        let encoded = ring.marshal()?;
        let decoded = Arc::new(Ring::unmarshal(&encoded)?);

        {
            let mut stored = self.stored.write();
            let current = stored.ring.version();
            let proposed = decoded.version();
            if !replace_existing && current.checked_add(1) != Some(proposed) {
                debug!(current, proposed, "rejected stale ring publish");
                return Err(StreamingError::StaleVersion { current, proposed });
            }
            *stored = Stored {
                encoded,
                ring: decoded.clone(),
            };
            // Sent under the lock so subscribers see rings in publish order.
            // No subscribers is not an error.
            let _ = self.changes.send(decoded.clone());
        }

        info!(
            version = decoded.version(),
            ring_type = %decoded.ring_type(),
            members = decoded.members().len(),
            replace_existing,
            "published ring"
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<Ring>> {
        self.changes.subscribe()
    }
}

/// Reads the current ring, applies `mutate` and publishes the result,
/// retrying on version conflicts up to `max_attempts` times.
///
/// Returns the ring that was published.
pub async fn update_ring<S, F>(store: &S, max_attempts: usize, mutate: F) -> Result<Ring>
where
    S: RingStore + ?Sized,
    F: Fn(&Ring) -> corelib::Result<Ring> + Send + Sync,
{
    for attempt in 1..=max_attempts {
        let current = store.current_ring().await?;
        let next = mutate(&current)?;
        match store.publish_ring(next.clone(), false).await {
            Ok(()) => return Ok(next),
            Err(StreamingError::StaleVersion { current, proposed }) => {
                debug!(attempt, current, proposed, "ring update lost the race, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(StreamingError::Contended {
        attempts: max_attempts,
    })
}

/// Waits for the next ring on a subscription.
///
/// A lagging receiver skips to the rings still buffered; callers only ever
/// need the newest one.
pub async fn recv_ring(rings: &mut broadcast::Receiver<Arc<Ring>>) -> Result<Arc<Ring>> {
    loop {
        match rings.recv().await {
            Ok(ring) => return Ok(ring),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "ring subscriber lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(StreamingError::Closed),
        }
    }
}
