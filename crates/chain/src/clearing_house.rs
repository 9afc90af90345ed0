//! Typed clearing-house access and liquidation-instruction encoding.

use alloy::primitives::{Address, Bytes, I256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

use crate::bindings::{IAccountBalance, IClearingHouse};

/// Ready-to-submit liquidation call for one account/base-token pair.
///
/// The scanner never signs or sends this; ownership moves to the caller,
/// which hands it to the external executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationInstruction {
    /// Contract the executor should call.
    pub to: Address,
    /// ABI-encoded `liquidate(address,address)` calldata.
    pub data: Bytes,
}

/// Read-only ledger access needed to judge and encode a liquidation.
///
/// Implemented by [`ClearingHouse`]; core's tests substitute mocks.
#[async_trait]
pub trait AccountLedger: Send + Sync {
    /// Margin threshold below which the account becomes liquidatable.
    async fn margin_requirement_for_liquidation(&self, account: Address) -> Result<I256>;

    /// Current account value.
    async fn account_value(&self, account: Address) -> Result<I256>;

    /// Base tokens the account holds positions in, in ledger order.
    async fn base_tokens(&self, account: Address) -> Result<SmallVec<[Address; 4]>>;

    /// Encode the liquidation call for one account/base-token pair.
    fn encode_liquidation(&self, account: Address, base_token: Address) -> LiquidationInstruction;
}

/// Encode the `liquidate(address,address)` call against a clearing house.
pub fn encode_liquidation(
    clearing_house: Address,
    account: Address,
    base_token: Address,
) -> LiquidationInstruction {
    let call = IClearingHouse::liquidateCall {
        trader: account,
        baseToken: base_token,
    };
    LiquidationInstruction {
        to: clearing_house,
        data: Bytes::from(call.abi_encode()),
    }
}

/// Clearing-house wrapper over an injected provider.
///
/// The provider handle is shared, immutable and read-only; concurrent
/// evaluations clone the `Arc`, never the connection.
#[derive(Debug, Clone)]
pub struct ClearingHouse<P> {
    provider: Arc<P>,
    /// Clearing house address (liquidation entry point).
    address: Address,
    /// Account-balance module, resolved from the clearing house at connect time.
    account_balance: Address,
}

impl<P: Provider + Clone + 'static> ClearingHouse<P> {
    /// Connect to a deployed clearing house.
    ///
    /// Resolves the account-balance module address with a one-time read call.
    pub async fn connect(address: Address, provider: Arc<P>) -> Result<Self> {
        let contract = IClearingHouse::new(address, &*provider);
        let account_balance = contract
            .getAccountBalance()
            .call()
            .await
            .context("resolving account-balance module")?
            ._0;

        info!(
            clearing_house = %address,
            account_balance = %account_balance,
            "Connected to clearing house"
        );

        Ok(Self {
            provider,
            address,
            account_balance,
        })
    }

    /// Clearing house address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Account-balance module address.
    pub fn account_balance(&self) -> Address {
        self.account_balance
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> AccountLedger for ClearingHouse<P> {
    async fn margin_requirement_for_liquidation(&self, account: Address) -> Result<I256> {
        let contract = IAccountBalance::new(self.account_balance, &*self.provider);
        let requirement = contract
            .getMarginRequirementForLiquidation(account)
            .call()
            .await
            .context("getMarginRequirementForLiquidation")?;
        Ok(requirement._0)
    }

    async fn account_value(&self, account: Address) -> Result<I256> {
        let contract = IClearingHouse::new(self.address, &*self.provider);
        let value = contract
            .getAccountValue(account)
            .call()
            .await
            .context("getAccountValue")?;
        Ok(value._0)
    }

    async fn base_tokens(&self, account: Address) -> Result<SmallVec<[Address; 4]>> {
        let contract = IAccountBalance::new(self.account_balance, &*self.provider);
        let tokens = contract
            .getBaseTokens(account)
            .call()
            .await
            .context("getBaseTokens")?;

        debug!(account = %account, count = tokens._0.len(), "Fetched base tokens");
        Ok(tokens._0.into_iter().collect())
    }

    fn encode_liquidation(&self, account: Address, base_token: Address) -> LiquidationInstruction {
        encode_liquidation(self.address, account, base_token)
    }
}
