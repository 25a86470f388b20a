//! MIM OFT bridge and ERC20 contract bindings
//!
//! Uses alloy's sol! macro to generate type-safe bindings. The bridge is the
//! Abracadabra MIM proxy OFT (LayerZero OFT v2 interface); only the functions
//! the bridger calls are declared.

#![allow(clippy::too_many_arguments)]

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use alloy::sol;

sol! {
    /// MIM OFT v2 bridge interface
    #[sol(rpc)]
    contract MimBridge {
        /// LayerZero call parameters for sendFrom
        struct LzCallParams {
            address refundAddress;
            address zroPaymentAddress;
            bytes adapterParams;
        }

        /// Quote the LayerZero messaging fee for a send
        function estimateSendFee(
            uint16 dstChainId,
            bytes32 toAddress,
            uint256 amount,
            bool useZro,
            bytes adapterParams
        ) external view returns (uint256 nativeFee, uint256 zroFee);

        /// Debit `amount` from `from` and relay it to `toAddress` on `dstChainId`
        function sendFrom(
            address from,
            uint16 dstChainId,
            bytes32 toAddress,
            uint256 amount,
            LzCallParams callParams
        ) external payable;
    }
}

sol! {
    /// Minimal ERC20 interface
    #[sol(rpc)]
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// LayerZero relayer adapter params version carrying a native airdrop
const ADAPTER_PARAMS_VERSION: u16 = 2;

/// Destination gas requested from the relayer when none is configured
pub const DEFAULT_DST_GAS: u64 = 100_000;

/// Left-pad an EVM address to 32 bytes (OFT `toAddress` encoding)
pub fn address_to_bytes32(address: Address) -> FixedBytes<32> {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(address.as_slice());
    FixedBytes::from(bytes)
}

/// Build version-2 adapter params: `version ‖ dst_gas ‖ airdrop amount (0) ‖ airdrop address`
pub fn adapter_params(dst_gas: u64, airdrop_address: Address) -> Bytes {
    let mut out = Vec::with_capacity(2 + 32 + 32 + 20);
    out.extend_from_slice(&ADAPTER_PARAMS_VERSION.to_be_bytes());
    out.extend_from_slice(&U256::from(dst_gas).to_be_bytes::<32>());
    out.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
    out.extend_from_slice(airdrop_address.as_slice());
    out.into()
}
