//! Migration executor: carries out the local peer's share of a rebalance plan.

use std::sync::Arc;

use corelib::PeerId;
use rebalance::{RebalancePlan, Transfer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::{Result, StreamingError};
use crate::transfer::{BlockSender, BlockSource};

/// Transfers in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Outcome of one execution.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub sent: usize,
    /// Transfers that failed, sorted by block.
    pub failed: Vec<(Transfer, StreamingError)>,
    /// Tasks that never reported back.
    pub aborted: usize,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.aborted == 0
    }
}

/// Sends the transfers a plan assigns to one peer.
///
/// Each transfer reads the block from the local copy and pushes it to its
/// destination. Failures are collected, not retried; the next planning pass
/// recomputes whatever is still missing.
pub struct MigrationExecutor {
    local: PeerId,
    source: Arc<dyn BlockSource>,
    sender: Arc<dyn BlockSender>,
    concurrency: usize,
}

impl MigrationExecutor {
    pub fn new(local: PeerId, source: Arc<dyn BlockSource>, sender: Arc<dyn BlockSender>) -> Self {
        Self {
            local,
            source,
            sender,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Caps the number of concurrent transfers (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn local(&self) -> &PeerId {
        &self.local
    }

    pub async fn execute(&self, plan: &RebalancePlan) -> MigrationReport {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for transfer in plan.transfers_from(&self.local).cloned() {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let source = self.source.clone();
            let sender = self.sender.clone();
            tasks.spawn(async move {
                let result = copy_block(&*source, &*sender, &transfer).await;
                drop(permit);
                (transfer, result)
            });
        }

        let mut report = MigrationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((transfer, Ok(()))) => {
                    debug!(block = %transfer.block, to = %transfer.to, "block migrated");
                    metrics::counter!("migration.blocks_sent").increment(1);
                    report.sent += 1;
                }
                Ok((transfer, Err(e))) => {
                    error!(
                        block = %transfer.block,
                        to = %transfer.to,
                        error = %e,
                        "block migration failed"
                    );
                    metrics::counter!("migration.send_failures").increment(1);
                    report.failed.push((transfer, e));
                }
                Err(e) => {
                    error!(error = %e, "migration task did not complete");
                    metrics::counter!("migration.send_failures").increment(1);
                    report.aborted += 1;
                }
            }
        }
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));

        info!(
            peer = %self.local,
            sent = report.sent,
            failed = report.failed.len(),
            aborted = report.aborted,
            "migration finished"
        );
        report
    }
}

async fn copy_block(
    source: &dyn BlockSource,
    sender: &dyn BlockSender,
    transfer: &Transfer,
) -> Result<()> {
    let data = source.read_block(&transfer.from, transfer.block).await?;
    sender.send_block(&transfer.to, transfer.block, data).await
}
