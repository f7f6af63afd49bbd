// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// history.rs
//
// This file contains the packed global branch-history register and its
// constant-time compression into 64 bits for table indexing.

/// Maximum tracked history length in bits.
pub const MAX_HIST_BITS: usize = 320;

const HIST_WORDS: usize = MAX_HIST_BITS / 64;

// Odd 64-bit mixing constants for folding history words
const MIX_1: u64 = 0x9e37_79b9_7f4a_7c15;
const MIX_2: u64 = 0xc2b2_ae3d_27d4_eb4f;
const MIX_3: u64 = 0x517c_c1b7_2722_0a95;
const MIX_4: u64 = 0x3243_f6a8_885a_308d;

/// Mask selecting the low `bits` bits, valid for any `bits` including >= 64.
fn low_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else if bits == 0 {
        0
    } else {
        (1u64 << bits) - 1
    }
}

/// Global branch-history register: the last `MAX_HIST_BITS` outcomes as a
/// packed bit sequence, LSB of word 0 = most recent branch.
#[derive(Debug, Clone, Default)]
pub struct GlobalHistory {
    words: [u64; HIST_WORDS],
}

impl GlobalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift the newest outcome in at the LSB, carrying across words.
    pub fn shift_in(&mut self, taken: bool) {
        for i in (1..HIST_WORDS).rev() {
            self.words[i] = (self.words[i] << 1) | (self.words[i - 1] >> 63);
        }
        self.words[0] = (self.words[0] << 1) | u64::from(taken);
    }

    /// Outcome of the branch `index` steps in the past (0 = most recent).
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < MAX_HIST_BITS);
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Compress the youngest `len` bits into 64 bits. Constant time per
    /// call, no shift reaches the word width, and the result is mixed with
    /// `len` so equal bit contents at different lengths hash apart.
    pub fn compress(&self, len: usize) -> u64 {
        let len = len.min(MAX_HIST_BITS);
        let [w0, w1, w2, w3, w4] = self.words;

        if len <= 64 {
            let x0 = w0 & low_mask(len);
            let mut h = x0 ^ (x0 >> 2) ^ (x0 >> 5);
            h ^= (len as u64).wrapping_mul(MIX_1);
            return h;
        }

        if len <= 128 {
            let x1 = w1 & low_mask(len - 64);
            let mut h = w0 ^ x1.wrapping_mul(MIX_1);
            h ^= h >> 17;
            h ^= (len as u64).wrapping_mul(0x85eb_ca6b);
            return h;
        }

        if len <= 192 {
            let x2 = w2 & low_mask(len - 128);
            let mut h = w0 ^ w1.wrapping_mul(MIX_1) ^ x2.wrapping_mul(MIX_2);
            h ^= h >> 13;
            h ^= (len as u64).wrapping_mul(0x27d4_eb2d);
            return h;
        }

        if len <= 256 {
            let x3 = w3 & low_mask(len - 192);
            let mut h = w0
                ^ w1.wrapping_mul(MIX_1)
                ^ w2.wrapping_mul(MIX_2)
                ^ x3.wrapping_mul(MIX_3);
            h ^= h >> 11;
            h ^= (len as u64).wrapping_mul(0x1b87_3593);
            return h;
        }

        let x4 = w4 & low_mask(len - 256);
        let mut h = w0
            ^ w1.wrapping_mul(MIX_1)
            ^ w2.wrapping_mul(MIX_2)
            ^ w3.wrapping_mul(MIX_3)
            ^ x4.wrapping_mul(MIX_4);
        h ^= h >> 15;
        h ^= (len as u64).wrapping_mul(0xcc9e_2d51);
        h
    }
}
