//! Helpers for testing the KAS wallet crates: random data, transaction fixtures and an in-memory
//! stand-in for the custodial service and the node.

use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::Address;
use arbitrary::{Arbitrary, Unstructured};
use rand::{rngs::OsRng, RngCore};

pub mod fake;
pub mod tx;

pub use fake::FakeKas;

const ARB_GEN_LEN: usize = 1 << 20; // 1 MiB

/// Produces arbitrary instances of types from a buffer of random bytes.
pub struct ArbitraryGenerator {
    buf: Vec<u8>,
    off: AtomicUsize,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::new_with_size(ARB_GEN_LEN)
    }

    pub fn new_with_size(n: usize) -> Self {
        let mut buf = vec![0; n];
        OsRng.fill_bytes(&mut buf);
        let off = AtomicUsize::new(0);
        ArbitraryGenerator { buf, off }
    }

    pub fn generate<'a, T: Arbitrary<'a> + Clone>(&'a self) -> T {
        // The offset moves past the bytes consumed so consecutive calls yield different values.
        let off = self.off.load(Ordering::Relaxed);
        let mut u = Unstructured::new(&self.buf[off..]);
        let prev_off = u.len();
        let inst = T::arbitrary(&mut u).expect("failed to generate arbitrary instance");
        let additional_off = prev_off - u.len();
        self.off.store(off + additional_off, Ordering::Relaxed);
        inst
    }

    /// A random address.
    pub fn address(&self) -> Address {
        Address::from(self.generate::<[u8; 20]>())
    }
}
