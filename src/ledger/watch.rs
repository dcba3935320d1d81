//! Transaction-completion watching.
//!
//! Ledger writes return no receipt, so completion is detected by polling
//! for the write's expected side effect. The deadline is denominated in
//! blocks, not wall-clock time: it tracks the chain's own liveness. A
//! watch that outlives its connection (the client was rebound) cancels
//! itself instead of reporting against the wrong node.

use crate::error::LedgerError;
use std::future::Future;
use std::time::Duration;

/// Source of the current block number. Implemented by the RPC client and
/// by test doubles.
pub trait BlockSource: Send + Sync {
    fn block_number(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

impl BlockSource for crate::rpc::JsonRpcClient {
    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(crate::rpc::JsonRpcClient::block_number(self).await?)
    }
}

/// Tuning for a completion watch.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Blocks to wait past the submission block before giving up.
    pub max_wait_blocks: u64,
    /// How often the block number is sampled.
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_wait_blocks: 5,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// What a single change notification produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStep {
    /// No new block, or the effect is not visible yet — keep polling.
    Waiting,
    /// The effect was observed; `block_number` is the block it was seen at.
    Completed { block_number: u64 },
    /// The deadline passed without the effect appearing.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Polling,
    Completed,
    TimedOut,
}

/// The completion state machine: Armed at construction, then
/// Polling → Completed | TimedOut. Terminal states are sticky, so the
/// completed step is reported exactly once.
#[derive(Debug)]
pub struct TxWatch {
    block_at_start: u64,
    max_wait_blocks: u64,
    state: State,
}

impl TxWatch {
    pub fn new(block_at_start: u64, max_wait_blocks: u64) -> Self {
        Self {
            block_at_start,
            max_wait_blocks,
            state: State::Polling,
        }
    }

    pub fn block_at_start(&self) -> u64 {
        self.block_at_start
    }

    pub fn is_terminal(&self) -> bool {
        self.state != State::Polling
    }

    /// Feeds one change notification into the machine.
    pub fn on_change(&mut self, current_block: u64, effect_observed: bool) -> WatchStep {
        if self.state != State::Polling {
            return WatchStep::Waiting;
        }
        if current_block == self.block_at_start {
            // No block has been mined since submission.
            return WatchStep::Waiting;
        }
        if effect_observed {
            self.state = State::Completed;
            return WatchStep::Completed {
                block_number: current_block,
            };
        }
        if current_block > self.block_at_start + self.max_wait_blocks {
            self.state = State::TimedOut;
            return WatchStep::TimedOut;
        }
        WatchStep::Waiting
    }
}

/// Drives a [`TxWatch`] against a block source until it terminates.
///
/// `probe` performs the follow-up read for the expected effect; probe
/// failures count as "not observed" so a flaky read does not abort the
/// watch. `is_stale` is consulted before every sample and turns a rebound
/// connection into an error.
pub async fn run_watch<S, P, Fut>(
    source: &S,
    mut probe: P,
    config: &WatchConfig,
    block_at_start: u64,
    is_stale: impl Fn() -> Option<LedgerError>,
) -> Result<u64, LedgerError>
where
    S: BlockSource,
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, LedgerError>>,
{
    let mut watch = TxWatch::new(block_at_start, config.max_wait_blocks);
    loop {
        futures_timer::Delay::new(config.poll_interval).await;

        if let Some(err) = is_stale() {
            return Err(err);
        }

        let current = source.block_number().await?;
        let observed = if current == block_at_start {
            false
        } else {
            probe().await.unwrap_or_else(|e| {
                tracing::debug!("Effect probe failed, treating as not observed: {e}");
                false
            })
        };

        match watch.on_change(current, observed) {
            WatchStep::Waiting => continue,
            WatchStep::Completed { block_number } => return Ok(block_number),
            WatchStep::TimedOut => {
                tracing::warn!(
                    block_at_start,
                    max_wait_blocks = config.max_wait_blocks,
                    "Transaction effect not observed before the block deadline"
                );
                return Err(LedgerError::WatchTimedOut {
                    waited_blocks: config.max_wait_blocks,
                });
            }
        }
    }
}
