// crates/sealwatch-core/src/poller.rs

//! Block-range scan driver
//!
//! Advances only as fast as new chain blocks appear and honors cooperative
//! cancellation. A block is either fully processed or not processed at
//! all; the tracker never sees a partial observation.

use {
    crate::{
        bitmap,
        cancel::CancelFlag,
        record::BlockRecord,
        registry::EpochValidatorRegistry,
        tracker::DowntimeTracker,
        ScanError,
    },
    sealwatch_chain::{ChainClient, ChainError},
    sealwatch_common::types::{
        BlockNumber, EpochNumber, RangeSpec, ScanRange, SignerId, ValidatorId, ValidatorStat,
    },
    std::{collections::HashMap, future::Future, sync::Arc, time::Duration},
    tokio::sync::{mpsc, RwLock},
    tracing::{debug, info, warn},
};

/// Poller tuning knobs.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub range: RangeSpec,
    /// Sleep between head polls; doubles as the retry backoff for
    /// transient fetch errors.
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            range: RangeSpec::default(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Scan progression states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Resolving,
    Waiting(BlockNumber),
    Fetching(BlockNumber),
    Processing(BlockNumber),
    Done,
    Cancelled,
}

/// How a finished scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    Failed(ScanError),
}

/// Final result of a scan: the outcome plus the last consistent snapshot.
#[derive(Debug)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub snapshot: Vec<ValidatorStat>,
    /// Account-to-signer mapping discovered during the scan, for renderers.
    pub signers: HashMap<ValidatorId, SignerId>,
    pub last_processed: Option<BlockNumber>,
}

enum WaitOutcome {
    Ready,
    Cancelled,
    Failed(ScanError),
}

enum StepOutcome {
    Processed,
    Cancelled,
    Failed(ScanError),
}

enum RetryOutcome<T> {
    Done(T),
    Cancelled,
    Fatal(ChainError),
}

/// Retry `op` on transient errors until it succeeds, fails hard, or the
/// scan is cancelled.
async fn retry_transient<T, F, Fut>(
    cancel: &CancelFlag,
    interval: Duration,
    what: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }
        match op().await {
            Ok(value) => return RetryOutcome::Done(value),
            Err(e) if e.is_transient() => {
                warn!("{} failed, retrying in {:?}: {}", what, interval, e);
                tokio::time::sleep(interval).await;
            }
            Err(e) => return RetryOutcome::Fatal(e),
        }
    }
}

pub struct BlockScanPoller<C> {
    client: C,
    config: PollerConfig,
    registry: EpochValidatorRegistry,
    tracker: Arc<RwLock<DowntimeTracker>>,
    cancel: CancelFlag,
    records: Option<mpsc::Sender<BlockRecord>>,
    state: ScanState,
}

impl<C: ChainClient> BlockScanPoller<C> {
    pub fn new(
        client: C,
        config: PollerConfig,
        tracker: Arc<RwLock<DowntimeTracker>>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            client,
            config,
            registry: EpochValidatorRegistry::new(),
            tracker,
            cancel,
            records: None,
            state: ScanState::Idle,
        }
    }

    /// Emit a `BlockRecord` per processed block on `records`. A dropped
    /// receiver stops the emission, not the scan.
    pub fn with_records(mut self, records: mpsc::Sender<BlockRecord>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn transition(&mut self, next: ScanState) {
        debug!("scan state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Drive the scan to its end, whichever of completion, cancellation,
    /// or a fatal chain error comes first.
    pub async fn run(&mut self) -> ScanReport {
        self.transition(ScanState::Resolving);
        let range = match self.resolve_range().await {
            Ok(Some(range)) => range,
            Ok(None) => {
                self.transition(ScanState::Cancelled);
                return self.report(ScanOutcome::Cancelled, None).await;
            }
            Err(e) => {
                self.transition(ScanState::Done);
                return self.report(ScanOutcome::Failed(e), None).await;
            }
        };

        info!("scanning blocks {} through {}", range.start, range.end);

        let mut prev_epoch: Option<EpochNumber> = None;
        let mut last_processed: Option<BlockNumber> = None;
        let mut block = range.start;

        while block <= range.end {
            self.transition(ScanState::Waiting(block));
            match self.wait_for(block).await {
                WaitOutcome::Ready => {}
                WaitOutcome::Cancelled => {
                    self.transition(ScanState::Cancelled);
                    return self.report(ScanOutcome::Cancelled, last_processed).await;
                }
                WaitOutcome::Failed(e) => {
                    self.transition(ScanState::Done);
                    return self.report(ScanOutcome::Failed(e), last_processed).await;
                }
            }

            match self.step(block, &mut prev_epoch).await {
                StepOutcome::Processed => {
                    last_processed = Some(block);
                    block += 1;
                }
                StepOutcome::Cancelled => {
                    self.transition(ScanState::Cancelled);
                    return self.report(ScanOutcome::Cancelled, last_processed).await;
                }
                StepOutcome::Failed(e) => {
                    self.transition(ScanState::Done);
                    return self.report(ScanOutcome::Failed(e), last_processed).await;
                }
            }

            // cancellation is honored between blocks, never inside observe
            if block <= range.end && self.cancel.is_cancelled() {
                self.transition(ScanState::Cancelled);
                return self.report(ScanOutcome::Cancelled, last_processed).await;
            }
        }

        self.transition(ScanState::Done);
        self.report(ScanOutcome::Completed, last_processed).await
    }

    async fn resolve_range(&self) -> Result<Option<ScanRange>, ScanError> {
        let spec = self.config.range;
        let head = if spec.needs_head() {
            match retry_transient(&self.cancel, self.config.poll_interval, "height fetch", || {
                self.client.current_height()
            })
            .await
            {
                RetryOutcome::Done(head) => Some(head),
                RetryOutcome::Cancelled => return Ok(None),
                RetryOutcome::Fatal(e) => {
                    return Err(ScanError::Chain {
                        context: "fetching chain height".into(),
                        source: e,
                    })
                }
            }
        } else {
            None
        };

        let range = spec.resolve(head.unwrap_or(0));
        if range.start > range.end {
            return Err(ScanError::Range(format!(
                "start block {} is beyond end block {}",
                range.start, range.end
            )));
        }
        Ok(Some(range))
    }

    async fn wait_for(&self, block: BlockNumber) -> WaitOutcome {
        loop {
            if self.cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            // the seal for `block` is only final once block + 1 exists
            match self.client.current_height().await {
                Ok(head) if head >= block + 1 => return WaitOutcome::Ready,
                Ok(head) => debug!("head at {}, waiting for block {}", head, block),
                Err(e) if e.is_transient() => warn!("height fetch failed, retrying: {}", e),
                Err(e) => {
                    return WaitOutcome::Failed(ScanError::Chain {
                        context: "fetching chain height".into(),
                        source: e,
                    })
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn step(
        &mut self,
        block: BlockNumber,
        prev_epoch: &mut Option<EpochNumber>,
    ) -> StepOutcome {
        self.transition(ScanState::Fetching(block));
        let interval = self.config.poll_interval;

        let epoch = match retry_transient(&self.cancel, interval, "epoch fetch", || {
            self.client.epoch_of_block(block)
        })
        .await
        {
            RetryOutcome::Done(epoch) => epoch,
            RetryOutcome::Cancelled => return StepOutcome::Cancelled,
            RetryOutcome::Fatal(e) => {
                return StepOutcome::Failed(ScanError::Chain {
                    context: format!("fetching epoch of block {}", block),
                    source: e,
                })
            }
        };

        // seed the epoch-change comparison on the first processed block
        if prev_epoch.is_none() && block > 0 {
            *prev_epoch = match retry_transient(&self.cancel, interval, "epoch fetch", || {
                self.client.epoch_of_block(block - 1)
            })
            .await
            {
                RetryOutcome::Done(epoch) => Some(epoch),
                RetryOutcome::Cancelled => return StepOutcome::Cancelled,
                RetryOutcome::Fatal(e) => {
                    return StepOutcome::Failed(ScanError::Chain {
                        context: format!("fetching epoch of block {}", block - 1),
                        source: e,
                    })
                }
            };
        }

        let info = match retry_transient(&self.cancel, interval, "block fetch", || {
            self.client.get_block(block)
        })
        .await
        {
            RetryOutcome::Done(info) => info,
            RetryOutcome::Cancelled => return StepOutcome::Cancelled,
            RetryOutcome::Fatal(e) => {
                return StepOutcome::Failed(ScanError::Chain {
                    context: format!("fetching block {}", block),
                    source: e,
                })
            }
        };

        let seal = match retry_transient(&self.cancel, interval, "seal bitmap fetch", || {
            self.client.seal_bitmap_for_block(block)
        })
        .await
        {
            RetryOutcome::Done(seal) => seal,
            RetryOutcome::Cancelled => return StepOutcome::Cancelled,
            RetryOutcome::Fatal(e) => {
                return StepOutcome::Failed(ScanError::Chain {
                    context: format!("fetching seal bitmap for block {}", block),
                    source: e,
                })
            }
        };

        // the registry is fully populated for this epoch before its first
        // bitmap is decoded
        let set = loop {
            if self.cancel.is_cancelled() {
                return StepOutcome::Cancelled;
            }
            match self.registry.get_validators(&self.client, epoch, block).await {
                Ok(set) => break set,
                Err(e) if e.is_transient() => {
                    warn!("validator set fetch failed, retrying in {:?}: {}", interval, e);
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    return StepOutcome::Failed(ScanError::Chain {
                        context: format!("resolving validator set for epoch {}", epoch),
                        source: e,
                    })
                }
            }
        };

        self.transition(ScanState::Processing(block));
        let decoded = bitmap::decode(&seal, set.len());
        let producer = self
            .registry
            .account_of_signer(&info.miner)
            .cloned()
            .unwrap_or_else(|| info.miner.as_validator_id());

        let display = {
            let mut tracker = self.tracker.write().await;
            tracker.observe(epoch, &set, &decoded, Some(&producer))
        };

        let epoch_change = prev_epoch.map_or(false, |p| p != epoch);
        *prev_epoch = Some(epoch);

        let down: Vec<ValidatorId> = set
            .iter()
            .zip(&display)
            .filter(|(_, signed)| !**signed)
            .map(|(validator, _)| validator.clone())
            .collect();
        let record = BlockRecord {
            epoch,
            block,
            validators: set.to_vec(),
            signed: display,
            raw_signed: decoded,
            down_count: down.len(),
            down,
            epoch_change,
        };

        if let Some(records) = self.records.take() {
            if records.send(record).await.is_ok() {
                self.records = Some(records);
            } else {
                debug!("record receiver dropped, continuing without renderer");
            }
        }

        StepOutcome::Processed
    }

    async fn report(&self, outcome: ScanOutcome, last_processed: Option<BlockNumber>) -> ScanReport {
        let snapshot = self.tracker.read().await.snapshot();
        ScanReport {
            outcome,
            snapshot,
            signers: self.registry.known_signers(),
            last_processed,
        }
    }
}
