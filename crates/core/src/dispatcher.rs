//! Chunked concurrent account evaluation with per-account isolation.

use alloy::primitives::Address;
use futures::future::join_all;
use liquidator_chain::{AccountLedger, LiquidationInstruction};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AccountCheckError, CheckStage};
use crate::evaluator::evaluate;

/// Number of accounts checked concurrently per chunk.
///
/// Each check costs two read calls, and the remote provider budgets call
/// units per second (660 CU/s at 26 CU per `eth_call` is roughly 25 calls
/// per second), so 25 concurrent checks keeps a chunk inside that budget.
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Report of one dispatch pass over the account universe.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Instructions for eligible accounts, in evaluation order.
    pub instructions: Vec<LiquidationInstruction>,
    /// Accounts whose checks completed, eligible or not.
    pub accounts_evaluated: usize,
    /// Accounts skipped after a failed check.
    pub accounts_failed: usize,
}

impl DispatchReport {
    /// Accounts found eligible, derived from the batch itself.
    pub fn accounts_eligible(&self) -> usize {
        self.instructions.len()
    }
}

/// Partitions accounts into fixed-size chunks and evaluates each chunk's
/// accounts concurrently, chunk after chunk.
pub struct BatchDispatcher {
    ledger: Arc<dyn AccountLedger>,
    chunk_size: usize,
}

impl BatchDispatcher {
    /// Create a dispatcher with the default chunk size.
    pub fn new(ledger: Arc<dyn AccountLedger>) -> Self {
        Self {
            ledger,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Evaluate every account and collect instructions for the eligible ones.
    ///
    /// Chunks run strictly one after another; accounts within a chunk run
    /// concurrently, so no more than `chunk_size` checks are ever in flight.
    /// A failing account is logged and skipped; it never aborts its chunk or
    /// the run.
    pub async fn dispatch(&self, accounts: &[Address]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for chunk in accounts.chunks(self.chunk_size) {
            let outcomes =
                join_all(chunk.iter().map(|&account| self.check_account(account))).await;

            for outcome in outcomes {
                match outcome {
                    Ok(Some(instruction)) => {
                        report.accounts_evaluated += 1;
                        report.instructions.push(instruction);
                    }
                    Ok(None) => report.accounts_evaluated += 1,
                    Err(err) => {
                        report.accounts_failed += 1;
                        warn!(
                            account = %err.account,
                            stage = %err.stage,
                            error = %err.source,
                            "Skipping account after failed check"
                        );
                    }
                }
            }

            debug!(
                chunk_len = chunk.len(),
                evaluated = report.accounts_evaluated,
                eligible = report.accounts_eligible(),
                "Chunk complete"
            );
        }

        info!(
            evaluated = report.accounts_evaluated,
            eligible = report.accounts_eligible(),
            failed = report.accounts_failed,
            "Dispatch complete"
        );
        report
    }

    /// Check one account and encode an instruction if it is liquidatable.
    ///
    /// Only the first base-token position reported by the ledger is targeted
    /// per run; an account with several positions is liquidated one position
    /// per invocation.
    async fn check_account(
        &self,
        account: Address,
    ) -> Result<Option<LiquidationInstruction>, AccountCheckError> {
        let result = evaluate(self.ledger.as_ref(), account).await?;
        if !result.liquidatable {
            return Ok(None);
        }

        let base_tokens = self
            .ledger
            .base_tokens(account)
            .await
            .map_err(|e| AccountCheckError::new(account, CheckStage::Positions, e))?;

        let Some(&base_token) = base_tokens.first() else {
            return Err(AccountCheckError::no_positions(account));
        };

        info!(account = %account, base_token = %base_token, "Account is liquidatable");
        Ok(Some(self.ledger.encode_liquidation(account, base_token)))
    }
}
