//! Liquidator chain interaction layer.
//!
//! This crate provides:
//! - `sol!` contract bindings for the clearing house and account-balance module
//! - Typed read-only ledger queries behind the [`AccountLedger`] seam
//! - Liquidation-instruction ABI encoding
//!
//! The scanner only reads. Transaction signing and submission live with the
//! external executor that consumes the encoded instructions.

mod bindings;
mod clearing_house;

pub use bindings::{IAccountBalance, IClearingHouse};
pub use clearing_house::{
    encode_liquidation, AccountLedger, ClearingHouse, LiquidationInstruction,
};
