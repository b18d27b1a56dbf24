//! Test data generators for integration tests.

use ledger_types::{Address, Name128, PublicKey, Symbol};
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for unique name generation.
static NAME_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Parse a canonical 128-bit name.
pub fn name(s: &str) -> Name128 {
    s.parse().expect("valid test name")
}

/// Generate a unique test name with a short prefix.
pub fn unique_name(prefix: &str) -> Name128 {
    let counter = NAME_COUNTER.fetch_add(1, Ordering::SeqCst);
    name(&format!("{}{}", prefix, counter))
}

/// A deterministic public-key address from a seed byte.
pub fn test_address(seed: u8) -> Address {
    let mut bytes = [seed; 33];
    bytes[0] = 0x02;
    bytes[32] = seed.wrapping_mul(7);
    Address::PublicKey(PublicKey(bytes))
}

/// A five-decimal symbol with the given id.
pub fn test_symbol(id: u32) -> Symbol {
    Symbol::new(5, id).expect("valid test symbol")
}

/// An encoded balance blob; the store treats it as opaque bytes.
pub fn balance_bytes(amount: i64) -> Vec<u8> {
    amount.to_le_bytes().to_vec()
}
