//! Run controller: enumerate, dispatch, report.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use liquidator_api::AccountSource;
use liquidator_chain::LiquidationInstruction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::dispatcher::BatchDispatcher;

/// Delay between enumeration attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Outcome of one scanner run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Ready-to-submit instructions, one per eligible account.
    pub instructions: Vec<LiquidationInstruction>,
    /// Accounts whose checks completed.
    pub accounts_evaluated: usize,
    /// Accounts skipped after failures.
    pub accounts_failed: usize,
}

impl RunOutcome {
    /// Eligible-account count, derived from the batch.
    pub fn accounts_eligible(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the caller has anything to execute.
    pub fn should_exec(&self) -> bool {
        !self.instructions.is_empty()
    }

    /// Human-readable summary for single-decision invocation modes.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} evaluated accounts liquidatable ({} skipped)",
            self.accounts_eligible(),
            self.accounts_evaluated,
            self.accounts_failed,
        )
    }
}

/// One-shot liquidation scanner.
///
/// Stateless across invocations: every run re-enumerates the account
/// universe and re-evaluates it from scratch. No cursors, counters or
/// account lists survive a run.
pub struct Liquidator {
    source: Arc<dyn AccountSource>,
    dispatcher: BatchDispatcher,
    retry_delay: Duration,
    max_enumeration_attempts: Option<u32>,
}

impl Liquidator {
    /// Create a scanner over an account source and a dispatcher.
    pub fn new(source: Arc<dyn AccountSource>, dispatcher: BatchDispatcher) -> Self {
        Self {
            source,
            dispatcher,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_enumeration_attempts: None,
        }
    }

    /// Override the delay between enumeration attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Cap enumeration attempts.
    ///
    /// `None` retries until the indexing service answers, matching the
    /// historical behavior; a cap turns a permanently dead service into a
    /// failed run instead of a hung one.
    pub fn with_max_enumeration_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_enumeration_attempts = attempts;
        self
    }

    /// Run one scan: enumerate, evaluate, collect instructions.
    ///
    /// Zero eligible accounts is a normal outcome with an empty batch.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunOutcome> {
        let accounts = self.enumerate_accounts().await?;
        info!(accounts = accounts.len(), "Account universe enumerated");

        let report = self.dispatcher.dispatch(&accounts).await;
        let outcome = RunOutcome {
            instructions: report.instructions,
            accounts_evaluated: report.accounts_evaluated,
            accounts_failed: report.accounts_failed,
        };

        info!(
            eligible = outcome.accounts_eligible(),
            evaluated = outcome.accounts_evaluated,
            failed = outcome.accounts_failed,
            "Run complete"
        );
        Ok(outcome)
    }

    /// Enumerate the account universe with fixed-delay retry.
    ///
    /// The whole two-category fetch retries as a unit: evaluation must never
    /// start from a partial universe, or at-risk accounts would be silently
    /// skipped.
    async fn enumerate_accounts(&self) -> Result<Vec<Address>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.source.list_all_accounts().await {
                Ok(accounts) => return Ok(accounts),
                Err(err) => {
                    if let Some(max) = self.max_enumeration_attempts {
                        if attempt >= max {
                            return Err(err).with_context(|| {
                                format!("account enumeration failed after {attempt} attempts")
                            });
                        }
                    }
                    warn!(
                        attempt,
                        error = %err,
                        retry_in = ?self.retry_delay,
                        "Account enumeration failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, I256};
    use async_trait::async_trait;
    use liquidator_chain::AccountLedger;
    use smallvec::{smallvec, SmallVec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source failing a scripted number of times before answering.
    struct FlakySource {
        accounts: Vec<Address>,
        failures_before_success: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AccountSource for FlakySource {
        async fn list_all_accounts(&self) -> Result<Vec<Address>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures_before_success {
                anyhow::bail!("connection refused");
            }
            Ok(self.accounts.clone())
        }
    }

    /// Ledger marking every account eligible (or none).
    struct UniformLedger {
        eligible: bool,
    }

    #[async_trait]
    impl AccountLedger for UniformLedger {
        async fn margin_requirement_for_liquidation(&self, _account: Address) -> Result<I256> {
            Ok(I256::try_from(100).unwrap())
        }

        async fn account_value(&self, _account: Address) -> Result<I256> {
            let value = if self.eligible { 99 } else { 101 };
            Ok(I256::try_from(value).unwrap())
        }

        async fn base_tokens(&self, _account: Address) -> Result<SmallVec<[Address; 4]>> {
            Ok(smallvec![Address::repeat_byte(0xee)])
        }

        fn encode_liquidation(
            &self,
            account: Address,
            _base_token: Address,
        ) -> LiquidationInstruction {
            LiquidationInstruction {
                to: Address::repeat_byte(0xcc),
                data: Bytes::from(account.to_vec()),
            }
        }
    }

    fn accounts(n: u8) -> Vec<Address> {
        (1..=n).map(Address::repeat_byte).collect()
    }

    fn liquidator(source: FlakySource, eligible: bool) -> (Arc<FlakySource>, Liquidator) {
        let source = Arc::new(source);
        let dispatcher = BatchDispatcher::new(Arc::new(UniformLedger { eligible }));
        let liquidator = Liquidator::new(source.clone(), dispatcher);
        (source, liquidator)
    }

    #[tokio::test(start_paused = true)]
    async fn enumeration_retries_until_success_with_fixed_delay() {
        let (source, liquidator) = liquidator(
            FlakySource {
                accounts: accounts(10),
                failures_before_success: 2,
                attempts: AtomicUsize::new(0),
            },
            true,
        );

        let started = tokio::time::Instant::now();
        let outcome = liquidator.run().await.expect("run succeeds after retries");

        assert_eq!(source.attempts.load(Ordering::SeqCst), 3);
        assert!(
            started.elapsed() >= Duration::from_secs(6),
            "two retries must wait 3s each"
        );
        assert_eq!(outcome.accounts_evaluated, 10);
        assert_eq!(outcome.accounts_eligible(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn capped_enumeration_surfaces_the_last_error() {
        let (source, liquidator) = liquidator(
            FlakySource {
                accounts: accounts(5),
                failures_before_success: usize::MAX,
                attempts: AtomicUsize::new(0),
            },
            true,
        );
        let liquidator = liquidator.with_max_enumeration_attempts(Some(2));

        let err = liquidator.run().await.unwrap_err();
        assert_eq!(source.attempts.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("after 2 attempts"));
    }

    #[tokio::test]
    async fn zero_eligible_accounts_is_a_normal_empty_run() {
        let (_, liquidator) = liquidator(
            FlakySource {
                accounts: accounts(30),
                failures_before_success: 0,
                attempts: AtomicUsize::new(0),
            },
            false,
        );

        let outcome = liquidator.run().await.expect("empty run is not an error");

        assert!(outcome.instructions.is_empty());
        assert!(!outcome.should_exec());
        assert_eq!(outcome.accounts_evaluated, 30);
        assert_eq!(outcome.accounts_eligible(), 0);
    }

    #[tokio::test]
    async fn summary_reports_the_counters() {
        let (_, liquidator) = liquidator(
            FlakySource {
                accounts: accounts(4),
                failures_before_success: 0,
                attempts: AtomicUsize::new(0),
            },
            true,
        );

        let outcome = liquidator.run().await.expect("run");
        assert!(outcome.should_exec());
        assert_eq!(outcome.summary(), "4 of 4 evaluated accounts liquidatable (0 skipped)");
    }
}
