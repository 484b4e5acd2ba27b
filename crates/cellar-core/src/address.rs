//! Account addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric account address, written `#n`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Address {
    fn from(n: u64) -> Self {
        Self(n)
    }
}
