//! Fuzz tests for the half-balance send policy
//!
//! Property-based testing of the amount computation and of the send
//! operation's reaction to arbitrary balances.

use crate::support::client_with_wallet;
use alloy_primitives::U256;
use mpc_client_core::SendOutcome;
use mpc_client_core::chain::{format_units, half_of, is_valid_address};
use proptest::prelude::*;

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Generate a balance anywhere in the U256 range
fn balance_strategy() -> impl Strategy<Value = U256> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| U256::from_be_bytes::<32>(bytes))
}

/// Generate a small balance in wei
fn small_balance_strategy() -> impl Strategy<Value = u128> {
    0u128..=1_000_000_000_000_000_000_000u128 // Up to 1000 ETH
}

// ============================================================================
// Amount Properties
// ============================================================================

proptest! {
    #[test]
    fn fuzz_half_never_exceeds_balance(balance in balance_strategy()) {
        let amount = half_of(balance);
        prop_assert!(amount <= balance);
        prop_assert!(amount + amount <= balance);
    }

    #[test]
    fn fuzz_half_rounds_toward_zero(balance in balance_strategy()) {
        let amount = half_of(balance);
        let remainder = balance - amount - amount;
        prop_assert!(remainder <= U256::from(1u8));
    }

    #[test]
    fn fuzz_half_is_zero_only_below_two(balance in small_balance_strategy()) {
        let amount = half_of(U256::from(balance));
        prop_assert_eq!(amount.is_zero(), balance < 2);
    }

    #[test]
    fn fuzz_format_units_round_trips_whole_part(wei in small_balance_strategy()) {
        let formatted = format_units(U256::from(wei), 18);
        let whole: u128 = formatted.split('.').next().unwrap().parse().unwrap();
        prop_assert_eq!(whole, wei / 1_000_000_000_000_000_000);
    }

    #[test]
    fn fuzz_address_validation(s in "\\PC*") {
        let valid = is_valid_address(&s);
        if valid {
            prop_assert!(s.starts_with("0x"));
            prop_assert_eq!(s.len(), 42);
        }
    }

    #[test]
    fn fuzz_hex_addresses_are_valid(s in "0x[a-fA-F0-9]{40}") {
        prop_assert!(is_valid_address(&s));
    }
}

// ============================================================================
// Send Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fuzz_send_moves_exactly_half(balance in small_balance_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        runtime.block_on(async {
            let (sdk, client, wallet) = client_with_wallet().await;
            sdk.set_balance(U256::from(balance));

            let outcome = client.send_ethereum_transaction().await.unwrap();
            let sent = sdk.sent();

            if balance < 2 {
                assert!(matches!(outcome, SendOutcome::NoFunds { ref address } if address == wallet.address()));
                assert!(sent.is_empty());
            } else {
                assert_eq!(sent.len(), 1);
                assert_eq!(sent[0].value, U256::from(balance / 2));
            }
            assert!(!client.is_busy());
        });
    }
}
