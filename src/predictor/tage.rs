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

// tage.rs
//
// This file contains the TAGE conditional branch predictor: a bimodal base
// table plus a bank of tagged tables with geometrically growing history
// lengths. The longest matching table provides the prediction; the next
// match (or the base) is the alternate. A 4-bit meta counter decides
// whether newly allocated, low-confidence providers should defer to the
// alternate.

use super::history::{GlobalHistory, MAX_HIST_BITS};
use crate::errors::SimulatorError;

/// `br_flags` bit marking a conditional branch.
pub const BR_CONDITIONAL: u32 = 1;

/// Upper bound on the tagged-table bank size.
pub const MAX_TABLES: usize = 8;

/// Signed 3-bit prediction counter range.
pub const CTR_MIN: i8 = -4;
pub const CTR_MAX: i8 = 3;

/// 2-bit usefulness counter ceiling.
pub const U_MAX: u8 = 3;

/// Branch metadata supplied by the harness for each prediction.
#[derive(Debug, Clone, Copy)]
pub struct BranchInfo {
    pub address: u32,
    pub br_flags: u32,
}

impl BranchInfo {
    pub fn conditional(address: u32) -> Self {
        Self {
            address,
            br_flags: BR_CONDITIONAL,
        }
    }

    pub fn unconditional(address: u32) -> Self {
        Self {
            address,
            br_flags: 0,
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.br_flags & BR_CONDITIONAL != 0
    }
}

/// Usefulness-aging policy for the tagged tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingPolicy {
    /// Age one table every 2^17 branches, rotating through the bank.
    SingleTable,
    /// Age every table every 2^15 branches.
    AllTables,
}

/// TAGE geometry and variant knobs.
#[derive(Debug, Clone)]
pub struct TageConfig {
    pub num_tables: usize,
    pub base_bits: u32,
    pub table_bits: u32,
    pub tag_bits: u32,
    /// History length per tagged table, shortest first.
    pub hist_lens: Vec<usize>,
    /// Initial bimodal counter value (1 = weakly not taken, 2 = weakly taken).
    pub base_init: u8,
    pub aging: AgingPolicy,
}

impl TageConfig {
    /// 7 tagged tables over 200 bits of history; 16K-entry base.
    pub fn new() -> Self {
        Self {
            num_tables: 7,
            base_bits: 14,
            table_bits: 12,
            tag_bits: 10,
            hist_lens: vec![4, 8, 16, 32, 64, 128, 200],
            base_init: 2,
            aging: AgingPolicy::SingleTable,
        }
    }

    /// 8 tagged tables over 320 bits of history; 64K-entry base initialized
    /// weakly not taken.
    pub fn large() -> Self {
        Self {
            num_tables: 8,
            base_bits: 16,
            table_bits: 14,
            tag_bits: 12,
            hist_lens: vec![5, 12, 25, 52, 105, 170, 240, 320],
            base_init: 1,
            aging: AgingPolicy::SingleTable,
        }
    }

    pub fn with_aging(mut self, aging: AgingPolicy) -> Self {
        self.aging = aging;
        self
    }

    pub fn with_base_init(mut self, init: u8) -> Self {
        self.base_init = init;
        self
    }

    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.num_tables == 0 || self.num_tables > MAX_TABLES {
            return Err(SimulatorError::InvalidConfiguration(format!(
                "number of tagged tables must be in 1..={}",
                MAX_TABLES
            )));
        }
        if self.hist_lens.len() != self.num_tables {
            return Err(SimulatorError::InvalidConfiguration(
                "one history length is required per tagged table".to_string(),
            ));
        }
        if self.hist_lens.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimulatorError::InvalidConfiguration(
                "history lengths must be strictly increasing".to_string(),
            ));
        }
        if *self.hist_lens.last().unwrap_or(&0) > MAX_HIST_BITS {
            return Err(SimulatorError::InvalidConfiguration(format!(
                "history length exceeds the {}-bit history register",
                MAX_HIST_BITS
            )));
        }
        if self.base_bits == 0 || self.base_bits > 24 || self.table_bits == 0 || self.table_bits > 24 {
            return Err(SimulatorError::InvalidConfiguration(
                "table index widths must be in 1..=24 bits".to_string(),
            ));
        }
        if self.tag_bits == 0 || self.tag_bits > 16 {
            return Err(SimulatorError::InvalidConfiguration(
                "tag width must be in 1..=16 bits".to_string(),
            ));
        }
        if self.base_init > 3 {
            return Err(SimulatorError::InvalidConfiguration(
                "base counter initial value must be in 0..=3".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TageConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One tagged-table entry. The prediction counter saturates in
/// [`CTR_MIN`, `CTR_MAX`] and the usefulness counter in [0, `U_MAX`];
/// explicit widths instead of bitfield packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TageEntry {
    pub tag: u16,
    pub ctr: i8,
    pub u: u8,
}

impl TageEntry {
    pub fn predict_taken(&self) -> bool {
        self.ctr >= 0
    }

    /// Low usefulness and a near-neutral counter mark a fresh installation.
    pub fn newly_allocated(&self) -> bool {
        self.u == 0 && self.ctr.abs() <= 1
    }

    /// Saturating step of the prediction counter toward the outcome.
    pub fn nudge_ctr(&mut self, taken: bool) {
        if taken {
            if self.ctr < CTR_MAX {
                self.ctr += 1;
            }
        } else if self.ctr > CTR_MIN {
            self.ctr -= 1;
        }
    }

    pub fn inc_u(&mut self) {
        if self.u < U_MAX {
            self.u += 1;
        }
    }

    pub fn dec_u(&mut self) {
        if self.u > 0 {
            self.u -= 1;
        }
    }
}

/// Prediction record returned by value; the harness hands it back to
/// [`TagePredictor::update`] once the branch resolves.
#[derive(Debug, Clone, Copy)]
pub struct TagePrediction {
    pub taken: bool,
    pub target: u32,
    conditional: bool,
    base_idx: usize,
    idx: [usize; MAX_TABLES],
    tag: [u16; MAX_TABLES],
    provider: Option<usize>,
    alt: Option<usize>,
}

impl TagePrediction {
    fn not_conditional() -> Self {
        Self {
            taken: true,
            target: 0,
            conditional: false,
            base_idx: 0,
            idx: [0; MAX_TABLES],
            tag: [0; MAX_TABLES],
            provider: None,
            alt: None,
        }
    }

    pub fn provider_table(&self) -> Option<usize> {
        self.provider
    }
}

/// TAGE predictor state: global history, bimodal base, tagged bank, and the
/// use-alt-on-newly-allocated meta counter.
pub struct TagePredictor {
    pub config: TageConfig,
    pub history: GlobalHistory,
    pub base: Vec<u8>,
    pub tables: Vec<Vec<TageEntry>>,
    pub use_alt_on_na: u8,
    pub clock: u64,
}

impl TagePredictor {
    pub fn new(config: TageConfig) -> Result<Self, SimulatorError> {
        config.validate()?;

        let base = vec![config.base_init; 1usize << config.base_bits];
        let tables =
            vec![vec![TageEntry::default(); 1usize << config.table_bits]; config.num_tables];

        Ok(Self {
            config,
            history: GlobalHistory::new(),
            base,
            tables,
            use_alt_on_na: 8,
            clock: 0,
        })
    }

    fn base_predict(&self, base_idx: usize) -> bool {
        self.base[base_idx] >= 2
    }

    pub fn predict(&self, info: &BranchInfo) -> TagePrediction {
        if !info.is_conditional() {
            // Non-conditional branches are always taken; no target is modeled
            return TagePrediction::not_conditional();
        }

        let pc = info.address;
        let base_idx = ((pc >> 2) as usize) & (self.base.len() - 1);

        // One history compression per table feeds both the index and the tag
        let mut idx = [0usize; MAX_TABLES];
        let mut tag = [0u16; MAX_TABLES];
        for i in 0..self.config.num_tables {
            let h = self.history.compress(self.config.hist_lens[i]);

            let fold = (h ^ (h >> 32)) as u32;
            idx[i] = ((pc ^ fold ^ (pc >> self.config.table_bits)) as usize)
                & ((1usize << self.config.table_bits) - 1);

            let tag_fold = ((h >> 16) ^ (h >> 40)) as u32;
            tag[i] = ((pc ^ tag_fold ^ (pc >> (self.config.tag_bits + 1)))
                & ((1u32 << self.config.tag_bits) - 1)) as u16;
        }

        // Longest matching history provides; the next match is the alternate
        let mut provider = None;
        let mut alt = None;
        for i in (0..self.config.num_tables).rev() {
            if self.tables[i][idx[i]].tag == tag[i] {
                if provider.is_none() {
                    provider = Some(i);
                } else {
                    alt = Some(i);
                    break;
                }
            }
        }

        let taken = match provider {
            Some(p) => {
                let provider_entry = self.tables[p][idx[p]];
                let alt_pred = match alt {
                    Some(a) => self.tables[a][idx[a]].predict_taken(),
                    None => self.base_predict(base_idx),
                };

                if provider_entry.newly_allocated() && self.use_alt_on_na < 8 {
                    alt_pred
                } else {
                    provider_entry.predict_taken()
                }
            },
            None => self.base_predict(base_idx),
        };

        TagePrediction {
            taken,
            target: 0,
            conditional: true,
            base_idx,
            idx,
            tag,
            provider,
            alt,
        }
    }

    pub fn update(&mut self, prediction: &TagePrediction, taken: bool, _target: u32) {
        if !prediction.conditional {
            // Non-conditional branches still enter the global history
            self.history.shift_in(taken);
            return;
        }

        // Bimodal base counter, saturating in 0..=3
        let base_ctr = &mut self.base[prediction.base_idx];
        if taken {
            if *base_ctr < 3 {
                *base_ctr += 1;
            }
        } else if *base_ctr > 0 {
            *base_ctr -= 1;
        }

        if let Some(p) = prediction.provider {
            let provider_idx = prediction.idx[p];
            let provider_pred = self.tables[p][provider_idx].predict_taken();
            let alt_pred = match prediction.alt {
                Some(a) => self.tables[a][prediction.idx[a]].predict_taken(),
                None => self.base_predict(prediction.base_idx),
            };

            self.tables[p][provider_idx].nudge_ctr(taken);

            // Usefulness moves only when provider and alternate disagree
            if provider_pred != alt_pred {
                let provider_entry = &mut self.tables[p][provider_idx];
                if provider_pred == taken {
                    provider_entry.inc_u();
                } else {
                    provider_entry.dec_u();
                }

                if let Some(a) = prediction.alt {
                    let alt_entry = &mut self.tables[a][prediction.idx[a]];
                    if alt_pred == taken {
                        alt_entry.inc_u();
                    } else {
                        alt_entry.dec_u();
                    }
                }
            }

            // Train the meta counter on newly allocated providers backed by
            // a tagged alternate, judged on the post-update entry state
            if self.tables[p][provider_idx].newly_allocated() && prediction.alt.is_some() {
                let provider_correct = provider_pred == taken;
                let alt_correct = alt_pred == taken;
                if provider_correct != alt_correct {
                    if alt_correct {
                        if self.use_alt_on_na > 0 {
                            self.use_alt_on_na -= 1;
                        }
                    } else if self.use_alt_on_na < 15 {
                        self.use_alt_on_na += 1;
                    }
                }
            }
        }

        // On misprediction, allocate up to two not-useful entries in tables
        // with longer history than the provider
        if prediction.taken != taken {
            let start = prediction.provider.map_or(0, |p| p + 1);
            let mut allocated = 0;
            for i in start..self.config.num_tables {
                if allocated == 2 {
                    break;
                }
                let entry = &mut self.tables[i][prediction.idx[i]];
                if entry.u == 0 {
                    entry.tag = prediction.tag[i];
                    entry.ctr = if taken { 0 } else { -1 };
                    entry.u = 0;
                    allocated += 1;
                }
            }
        }

        // Periodic usefulness aging
        self.clock += 1;
        match self.config.aging {
            AgingPolicy::SingleTable => {
                if self.clock & 0x1_FFFF == 0 {
                    let table = ((self.clock >> 17) as usize) % self.config.num_tables;
                    for entry in &mut self.tables[table] {
                        entry.dec_u();
                    }
                }
            },
            AgingPolicy::AllTables => {
                if self.clock & 0x7FFF == 0 {
                    for table in &mut self.tables {
                        for entry in table {
                            entry.dec_u();
                        }
                    }
                }
            },
        }

        self.history.shift_in(taken);
    }
}
