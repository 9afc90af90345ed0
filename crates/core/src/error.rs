//! Structured errors for per-account checks.

use alloy::primitives::Address;
use std::fmt;

/// Stage of a per-account check that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStage {
    /// Reading the margin requirement for liquidation.
    MarginRequirement,
    /// Reading the current account value.
    AccountValue,
    /// Listing the account's base-token positions.
    Positions,
    /// Encoding the liquidation instruction.
    Encoding,
}

impl fmt::Display for CheckStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MarginRequirement => "margin-requirement query",
            Self::AccountValue => "account-value query",
            Self::Positions => "base-token query",
            Self::Encoding => "instruction encoding",
        };
        f.write_str(name)
    }
}

/// Failure of a single account's check.
///
/// Carries the account and stage as explicit fields so the dispatcher can
/// log and skip without inspecting the cause.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed for {account}")]
pub struct AccountCheckError {
    /// Account whose check failed.
    pub account: Address,
    /// Stage that failed.
    pub stage: CheckStage,
    /// Underlying cause.
    #[source]
    pub source: anyhow::Error,
}

impl AccountCheckError {
    /// Wrap a remote-query failure with its account and stage.
    pub fn new(account: Address, stage: CheckStage, source: anyhow::Error) -> Self {
        Self {
            account,
            stage,
            source,
        }
    }

    /// An eligible account reported no base-token position to liquidate.
    pub fn no_positions(account: Address) -> Self {
        Self {
            account,
            stage: CheckStage::Encoding,
            source: anyhow::anyhow!("no base-token positions reported"),
        }
    }
}
