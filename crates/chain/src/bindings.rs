//! Contract interfaces for the clearing house and its account-balance module.
//!
//! Only the read entry points the scanner needs, plus the liquidation call it
//! encodes for the external executor.

use alloy::sol;

sol! {
    /// Clearing house: liquidation entry point and account valuation.
    #[sol(rpc)]
    interface IClearingHouse {
        function getAccountBalance() external view returns (address);
        function getAccountValue(address trader) external view returns (int256);
        function liquidate(address trader, address baseToken) external;
    }

    /// Account-balance module: per-account margin bookkeeping.
    #[sol(rpc)]
    interface IAccountBalance {
        function getBaseTokens(address trader) external view returns (address[] memory);
        function getMarginRequirementForLiquidation(address trader) external view returns (int256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use alloy::sol_types::SolCall;

    #[test]
    fn liquidate_call_encodes() {
        let call = IClearingHouse::liquidateCall {
            trader: Address::ZERO,
            baseToken: Address::ZERO,
        };

        let encoded = call.abi_encode();
        // selector + two abi-padded address words
        assert_eq!(encoded.len(), 4 + 32 * 2);
        assert_eq!(&encoded[..4], IClearingHouse::liquidateCall::SELECTOR.as_slice());
    }

    #[test]
    fn read_calls_encode() {
        let call = IAccountBalance::getMarginRequirementForLiquidationCall {
            trader: Address::ZERO,
        };
        assert!(!call.abi_encode().is_empty());

        let call = IClearingHouse::getAccountValueCall {
            trader: Address::ZERO,
        };
        assert!(!call.abi_encode().is_empty());
    }
}
