//! Per-account liquidation eligibility.

use alloy::primitives::Address;
use liquidator_chain::AccountLedger;
use tracing::debug;

use crate::error::{AccountCheckError, CheckStage};

/// Outcome of one account's eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityResult {
    /// Account that was checked.
    pub account: Address,
    /// Whether the account is currently liquidatable.
    pub liquidatable: bool,
}

/// Decide whether an account is liquidatable.
///
/// Issues the margin-requirement and account-value reads concurrently; both
/// must land before the decision. The comparison is strict: an account
/// sitting exactly at its requirement is not liquidatable.
pub async fn evaluate<L>(
    ledger: &L,
    account: Address,
) -> Result<EligibilityResult, AccountCheckError>
where
    L: AccountLedger + ?Sized,
{
    let (requirement, value) = tokio::try_join!(
        async {
            ledger
                .margin_requirement_for_liquidation(account)
                .await
                .map_err(|e| AccountCheckError::new(account, CheckStage::MarginRequirement, e))
        },
        async {
            ledger
                .account_value(account)
                .await
                .map_err(|e| AccountCheckError::new(account, CheckStage::AccountValue, e))
        },
    )?;

    let liquidatable = value < requirement;
    debug!(
        account = %account,
        value = %value,
        requirement = %requirement,
        liquidatable,
        "Evaluated account"
    );

    Ok(EligibilityResult {
        account,
        liquidatable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::I256;
    use anyhow::Result;
    use async_trait::async_trait;
    use liquidator_chain::LiquidationInstruction;
    use smallvec::SmallVec;

    fn i256(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    /// Ledger answering with fixed values.
    struct FixedLedger {
        requirement: I256,
        value: I256,
        fail_value_query: bool,
    }

    #[async_trait]
    impl AccountLedger for FixedLedger {
        async fn margin_requirement_for_liquidation(&self, _account: Address) -> Result<I256> {
            Ok(self.requirement)
        }

        async fn account_value(&self, _account: Address) -> Result<I256> {
            if self.fail_value_query {
                anyhow::bail!("execution reverted");
            }
            Ok(self.value)
        }

        async fn base_tokens(&self, _account: Address) -> Result<SmallVec<[Address; 4]>> {
            Ok(SmallVec::new())
        }

        fn encode_liquidation(
            &self,
            _account: Address,
            _base_token: Address,
        ) -> LiquidationInstruction {
            unreachable!("evaluation never encodes")
        }
    }

    async fn liquidatable_with(requirement: i64, value: i64) -> bool {
        let ledger = FixedLedger {
            requirement: i256(requirement),
            value: i256(value),
            fail_value_query: false,
        };
        evaluate(&ledger, Address::ZERO)
            .await
            .expect("evaluation")
            .liquidatable
    }

    #[tokio::test]
    async fn value_below_requirement_is_liquidatable() {
        assert!(liquidatable_with(100, 99).await);
    }

    #[tokio::test]
    async fn value_at_requirement_is_not_liquidatable() {
        assert!(!liquidatable_with(100, 100).await);
    }

    #[tokio::test]
    async fn value_above_requirement_is_not_liquidatable() {
        assert!(!liquidatable_with(100, 101).await);
    }

    #[tokio::test]
    async fn negative_value_compares_signed() {
        assert!(liquidatable_with(0, -1).await);
    }

    #[tokio::test]
    async fn query_failure_carries_account_and_stage() {
        let ledger = FixedLedger {
            requirement: i256(100),
            value: i256(0),
            fail_value_query: true,
        };
        let account = Address::repeat_byte(0x42);

        let err = evaluate(&ledger, account).await.unwrap_err();
        assert_eq!(err.account, account);
        assert_eq!(err.stage, CheckStage::AccountValue);
    }
}
