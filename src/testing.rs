//! Deterministic generators for driving dice checks in tests and demos.

use rand::{Error, RngCore};

/// An RNG that replays a fixed sequence of unit-interval fractions.
///
/// Each `gen::<f64>()` call consumes the next fraction; once the
/// sequence is exhausted the last fraction repeats. Useful for forcing
/// a specific d20 roll: a fraction of 0.74 always rolls 15.
pub struct SequenceRng {
    bits: Vec<u64>,
    next: usize,
}

impl SequenceRng {
    /// Build from unit-interval fractions. Panics if the slice is empty
    /// or any fraction falls outside [0, 1).
    pub fn from_fractions(fractions: &[f64]) -> SequenceRng {
        assert!(!fractions.is_empty(), "SequenceRng needs at least one fraction");
        let bits = fractions
            .iter()
            .map(|&fraction| {
                assert!(
                    (0.0..1.0).contains(&fraction),
                    "fraction {fraction} outside [0, 1)"
                );
                // The standard f64 sampler keeps the top 53 of these bits.
                ((fraction * (1u64 << 53) as f64) as u64) << 11
            })
            .collect();
        SequenceRng { bits, next: 0 }
    }
}

impl RngCore for SequenceRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let value = self.bits[self.next];
        if self.next + 1 < self.bits.len() {
            self.next += 1;
        }
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
