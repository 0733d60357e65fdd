//! Shared addresses and identities

use covera_core::identifiers::Address;
use covera_core::types::Identity;

/// External wallet account used by most tests
pub fn alice() -> Address {
    Address::new("0xa11ce00000000000000000000000000000000001")
}

/// Second external account
pub fn bob() -> Address {
    Address::new("0xb0b0000000000000000000000000000000000002")
}

/// Address a local key fixture claims
pub fn carol() -> Address {
    Address::new("0xca40100000000000000000000000000000000003")
}

/// Identity backed by the mock wallet's first account
pub fn external_identity() -> Identity {
    Identity::external(alice())
}

/// Identity claiming a local key (not registered with any provider)
pub fn local_identity() -> Identity {
    Identity::local(carol())
}
