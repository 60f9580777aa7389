/*!

Fixed-bit-width packed vector (§4.1, PV).

Same word-level get/set-bit arithmetic as the teacher's `BitMap` in
`src/bitmap.rs`, generalized from one bit per slot to an arbitrary `b`-bit
field per slot, with fields allowed to straddle a 64-bit word boundary.

*/

use super::{mask, Incrementable, Vector, VectorCore, VectorMut};
use mem_dbg::{MemDbg, MemSize};

/// A vector of `len` fixed-width unsigned integers packed into `u64` words.
#[derive(Clone, Debug, MemDbg, MemSize)]
pub struct PackedVec {
    words: Vec<u64>,
    len: usize,
    bit_width: usize,
}

impl PackedVec {
    /// Creates a new all-zero vector of `len` slots, each `bit_width` bits
    /// wide (0..=64).
    pub fn new(len: usize, bit_width: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(bit_width <= 64, "bit_width {bit_width} exceeds 64");
        let total_bits = len
            .checked_mul(bit_width)
            .ok_or_else(|| anyhow::anyhow!("len * bit_width overflows usize"))?;
        // One extra word so a field straddling the final word boundary never
        // reads/writes out of bounds.
        let num_words = total_bits.div_ceil(64) + 1;
        Ok(Self {
            words: vec![0u64; num_words],
            len,
            bit_width,
        })
    }

    #[inline(always)]
    fn word_and_bit(&self, i: usize) -> (usize, usize) {
        let pos = i * self.bit_width;
        (pos / 64, pos % 64)
    }
}

impl VectorCore for PackedVec {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn bit_width(&self) -> usize {
        self.bit_width
    }
}

impl Vector for PackedVec {
    #[inline(always)]
    fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.len, "index {i} out of bounds ({})", self.len);
        if self.bit_width == 0 {
            return 0;
        }
        let (word_idx, bit_idx) = self.word_and_bit(i);
        let mut value = self.words[word_idx] >> bit_idx;
        if bit_idx + self.bit_width > 64 {
            value |= self.words[word_idx + 1] << (64 - bit_idx);
        }
        value & mask(self.bit_width)
    }
}

impl VectorMut for PackedVec {
    #[inline(always)]
    fn set(&mut self, i: usize, v: u64) {
        debug_assert!(i < self.len, "index {i} out of bounds ({})", self.len);
        if self.bit_width == 0 {
            return;
        }
        let (word_idx, bit_idx) = self.word_and_bit(i);
        let v = v & mask(self.bit_width);
        let low_mask = mask(self.bit_width) << bit_idx;
        self.words[word_idx] = (self.words[word_idx] & !low_mask) | (v << bit_idx);
        if bit_idx + self.bit_width > 64 {
            let bits_in_next = bit_idx + self.bit_width - 64;
            let high_mask = mask(bits_in_next);
            self.words[word_idx + 1] =
                (self.words[word_idx + 1] & !high_mask) | (v >> (self.bit_width - bits_in_next));
        }
    }

    fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

impl Incrementable for PackedVec {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn get_set_roundtrip_small() {
        for bit_width in 1..=64 {
            let len = 37;
            let mut v = PackedVec::new(len, bit_width).unwrap();
            let mut rng = SmallRng::seed_from_u64(bit_width as u64);
            let top = if bit_width == 64 {
                u64::MAX
            } else {
                (1u64 << bit_width) - 1
            };
            let values: Vec<u64> = (0..len).map(|_| rng.gen_range(0..=top)).collect();
            for (i, &val) in values.iter().enumerate() {
                v.set(i, val);
            }
            for (i, &val) in values.iter().enumerate() {
                assert_eq!(v.get(i), val, "bit_width={bit_width} i={i}");
            }
        }
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut v = PackedVec::new(100, 13).unwrap();
        for i in 0..100 {
            v.set(i, (i * 3) as u64 & mask(13));
        }
        v.clear();
        for i in 0..100 {
            assert_eq!(v.get(i), 0);
        }
    }

    #[test]
    fn inc_default_impl() {
        let mut v = PackedVec::new(10, 8).unwrap();
        for _ in 0..5 {
            v.inc(3);
        }
        assert_eq!(v.get(3), 5);
    }

    #[test]
    fn zero_width_is_always_zero() {
        let mut v = PackedVec::new(5, 0).unwrap();
        v.set(2, 9999);
        assert_eq!(v.get(2), 0);
    }
}
