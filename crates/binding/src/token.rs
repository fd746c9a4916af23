//! ERC20 token contract bindings.

use alloy_sol_types::sol;

sol! {
    /// Standard ERC20 token interface
    #[sol(rpc)]
    interface IERC20 {
        /// Emitted when tokens are transferred
        event Transfer(
            address indexed from,
            address indexed to,
            uint256 value
        );

        /// Get token balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Transfer tokens to recipient
        function transfer(address recipient, uint256 amount) external returns (bool);

        /// Get token name
        function name() external view returns (string memory);

        /// Get token symbol
        function symbol() external view returns (string memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn test_transfer_selector() {
        // keccak256("transfer(address,uint256)")[..4]
        assert_eq!(IERC20::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_transfer_calldata_layout() {
        let call = IERC20::transferCall {
            recipient: Address::repeat_byte(0xde),
            amount: U256::from(100),
        };
        let data = call.abi_encode();

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[16..36], Address::repeat_byte(0xde).as_slice());
        assert_eq!(data[67], 100);
    }

    #[test]
    fn test_transfer_event_signature() {
        assert_eq!(
            IERC20::Transfer::SIGNATURE,
            "Transfer(address,address,uint256)"
        );
    }
}
