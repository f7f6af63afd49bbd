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

// simulator.rs
//
// This file contains the cycle-accurate driver for the out-of-order pipeline
// simulator. Each tick runs the stages in reverse dataflow order (consumer
// before producer) so an instruction can never traverse two stages in one
// cycle:
//
//   state-update -> execute-writeback -> execute-fire -> schedule ->
//   dispatch -> fetch
//
// Instructions flow fetch -> dispatch queue -> reservation station ->
// functional unit -> result bus -> retirement, one cycle per stage minimum.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};

use log::{debug, trace};
use serde::Serialize;

use super::components::{
    FuPool, FuType, InstructionRecord, ProcInstruction, RegisterStatus, RsEntry, NUM_REGS,
};
use super::config::ProcConfig;
use crate::errors::SimulatorError;

/// Host-supplied instruction stream; `None` signals end of trace.
pub trait InstructionSource {
    fn read_instruction(&mut self) -> Option<ProcInstruction>;
}

/// Instruction source backed by an owned instruction list.
pub struct VecSource {
    iter: std::vec::IntoIter<ProcInstruction>,
}

impl VecSource {
    pub fn new(instructions: Vec<ProcInstruction>) -> Self {
        Self {
            iter: instructions.into_iter(),
        }
    }
}

impl InstructionSource for VecSource {
    fn read_instruction(&mut self) -> Option<ProcInstruction> {
        self.iter.next()
    }
}

/// Aggregate counters reported after a run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcStats {
    pub cycle_count: u64,
    pub retired_instruction: u64,
    pub avg_inst_fired: f32,
    pub avg_inst_retired: f32,
    pub avg_disp_size: f32,
    pub max_disp_size: u64,
}

impl fmt::Display for ProcStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Processor Statistics:")?;
        writeln!(f, "  Cycles: {}", self.cycle_count)?;
        writeln!(f, "  Instructions Retired: {}", self.retired_instruction)?;
        writeln!(f, "  Avg Instructions Fired Per Cycle: {:.6}", self.avg_inst_fired)?;
        writeln!(f, "  Avg Instructions Retired Per Cycle: {:.6}", self.avg_inst_retired)?;
        writeln!(f, "  Avg Dispatch Queue Size: {:.6}", self.avg_disp_size)?;
        write!(f, "  Max Dispatch Queue Size: {}", self.max_disp_size)
    }
}

/// Out-of-order pipeline simulator. Owns every piece of machine state; the
/// stage methods receive mutable borrows through `self`.
pub struct ProcSimulator {
    pub config: ProcConfig,

    // Hardware resources
    pub rs: Vec<RsEntry>,
    pub fu_pools: [FuPool; FuType::COUNT],
    pub reg_file: Vec<RegisterStatus>,
    pub dispatch_queue: VecDeque<ProcInstruction>,
    fetch_buffer: Vec<ProcInstruction>,

    // Per-tag records, indexed by tag (slot 0 unused)
    pub records: Vec<InstructionRecord>,

    // Front-end state
    next_tag: u64,
    no_more_fetch: bool,

    // Counters
    pub cycle: u64,
    total_disp_size: u64,
    max_disp_size: u64,
    total_inst_fired: u64,
    total_inst_retired: u64,
}

impl ProcSimulator {
    pub fn new(config: ProcConfig) -> Result<Self, SimulatorError> {
        config.validate()?;

        let rs = vec![RsEntry::default(); config.rs_capacity()];
        let fu_pools = [
            FuPool::new(config.num_k0_units),
            FuPool::new(config.num_k1_units),
            FuPool::new(config.num_k2_units),
        ];

        Ok(Self {
            fetch_buffer: Vec::with_capacity(config.fetch_width),
            config,
            rs,
            fu_pools,
            reg_file: vec![RegisterStatus::default(); NUM_REGS],
            dispatch_queue: VecDeque::new(),
            records: vec![InstructionRecord::default()],
            next_tag: 1,
            no_more_fetch: false,
            cycle: 0,
            total_disp_size: 0,
            max_disp_size: 0,
            total_inst_fired: 0,
            total_inst_retired: 0,
        })
    }

    /// Run until the trace is exhausted and every instruction has retired.
    pub fn run(&mut self, source: &mut dyn InstructionSource) {
        while self.step(source) {}
        debug!(
            "simulation finished after {} cycles, {} instructions retired",
            self.cycle, self.total_inst_retired
        );
    }

    /// Execute one cycle. Returns false once all instructions are done, in
    /// which case no cycle was consumed.
    pub fn step(&mut self, source: &mut dyn InstructionSource) -> bool {
        if self.all_instructions_done() {
            return false;
        }

        self.cycle += 1;

        // Snapshot free slots before retirement: schedule may not use slots
        // freed by this cycle's state-update, preserving one cycle per stage.
        let rs_free_start = self.rs.iter().filter(|e| e.is_free()).count();

        self.stage_state_update();
        self.stage_execute_writeback();
        self.stage_execute_fire();
        self.stage_schedule(rs_free_start);
        self.stage_dispatch();
        self.stage_fetch(source);

        // Dispatch-queue statistics are sampled at end of cycle
        let disp_size = self.dispatch_queue.len() as u64;
        self.total_disp_size += disp_size;
        if disp_size > self.max_disp_size {
            self.max_disp_size = disp_size;
        }

        true
    }

    /// Trace exhausted, dispatch queue drained, reservation station empty,
    /// and all functional units idle.
    fn all_instructions_done(&self) -> bool {
        self.no_more_fetch
            && self.dispatch_queue.is_empty()
            && self.rs.iter().all(|e| e.is_free())
            && self.fu_pools.iter().all(|pool| !pool.any_busy())
    }

    // ----------------- FETCH -----------------
    fn stage_fetch(&mut self, source: &mut dyn InstructionSource) {
        self.fetch_buffer.clear();
        if self.no_more_fetch {
            return;
        }

        for _ in 0..self.config.fetch_width {
            let mut inst = match source.read_instruction() {
                Some(inst) => inst,
                None => {
                    self.no_more_fetch = true;
                    break;
                },
            };

            inst.tag = self.next_tag;
            self.next_tag += 1;

            debug_assert_eq!(self.records.len() as u64, inst.tag);
            self.records.push(InstructionRecord {
                inst,
                fetch_cycle: self.cycle,
                ..Default::default()
            });

            self.fetch_buffer.push(inst);
        }
    }

    // ----------------- DISPATCH -----------------
    fn stage_dispatch(&mut self) {
        for inst in self.fetch_buffer.drain(..) {
            self.records[inst.tag as usize].disp_cycle = self.cycle;
            self.dispatch_queue.push_back(inst);
        }
    }

    // ----------------- SCHEDULE (dispatch queue -> RS) -----------------
    fn stage_schedule(&mut self, rs_free_start: usize) {
        let mut used_this_cycle = 0;

        while used_this_cycle < rs_free_start && !self.dispatch_queue.is_empty() {
            let slot = match self.rs.iter().position(RsEntry::is_free) {
                Some(slot) => slot,
                None => break,
            };
            let inst = match self.dispatch_queue.pop_front() {
                Some(inst) => inst,
                None => break,
            };
            used_this_cycle += 1;

            self.records[inst.tag as usize].sched_cycle = self.cycle;
            trace!("cycle {}: scheduled tag {} into RS slot {}", self.cycle, inst.tag, slot);

            let entry = &mut self.rs[slot];
            entry.inst = inst;
            entry.issued = false;
            entry.completed = false;
            entry.fu_index = None;
            entry.fu_type = FuType::from_op_code(inst.op_code);

            for s in 0..2 {
                let reg = inst.src_reg[s];
                if reg < 0 || self.reg_file[reg as usize].ready {
                    entry.src_ready[s] = true;
                    entry.src_tag[s] = 0;
                } else {
                    entry.src_ready[s] = false;
                    entry.src_tag[s] = self.reg_file[reg as usize].producer_tag;
                }
            }

            // Claim the destination: the youngest writer becomes producer of
            // record, even over an older in-flight writer (WAW)
            if inst.dest_reg >= 0 {
                let dest = inst.dest_reg as usize;
                self.reg_file[dest].ready = false;
                self.reg_file[dest].producer_tag = inst.tag;
            }
        }

        debug_assert!(used_this_cycle <= rs_free_start);
    }

    // ----------------- EXECUTE-FIRE (RS -> FU) -----------------
    fn stage_execute_fire(&mut self) {
        let mut ready: Vec<usize> = (0..self.rs.len())
            .filter(|&i| self.rs[i].is_ready_to_fire())
            .collect();

        // Service in tag order (oldest first)
        ready.sort_by_key(|&i| self.rs[i].inst.tag);

        for idx in ready {
            let fu_type = self.rs[idx].fu_type;
            let pool = &mut self.fu_pools[fu_type.index()];
            if let Some(fu_idx) = pool.first_free() {
                let tag = self.rs[idx].inst.tag;
                pool.units[fu_idx].fire(tag);

                let entry = &mut self.rs[idx];
                entry.issued = true;
                entry.fu_index = Some(fu_idx);
                self.records[tag as usize].exec_cycle = self.cycle;
                self.total_inst_fired += 1;

                trace!(
                    "cycle {}: fired tag {} on {:?} unit {}",
                    self.cycle, tag, fu_type, fu_idx
                );
            }
            // No free unit of this type: the entry stays and retries next cycle
        }
    }

    // ----------------- EXECUTE-WRITEBACK (FUs -> result buses) -----------------
    fn stage_execute_writeback(&mut self) {
        // All unit-latency results are eligible the cycle after firing
        let mut completed: Vec<(usize, usize, u64)> = Vec::new();
        for (type_idx, pool) in self.fu_pools.iter().enumerate() {
            for (fu_idx, fu) in pool.units.iter().enumerate() {
                debug_assert_eq!(fu.busy, fu.inst_tag != 0);
                if fu.busy && fu.cycles_left == 1 {
                    completed.push((type_idx, fu_idx, fu.inst_tag));
                }
            }
        }

        // First-fired, oldest instructions win bus arbitration
        completed.sort_by_key(|&(_, _, tag)| (self.records[tag as usize].exec_cycle, tag));

        let broadcasts = completed.len().min(self.config.result_buses);
        for &(type_idx, fu_idx, tag) in completed.iter().take(broadcasts) {
            if let Some(entry) = self.rs.iter_mut().find(|e| e.inst.tag == tag) {
                entry.completed = true;
                self.records[tag as usize].state_cycle = self.cycle;
            }
            self.fu_pools[type_idx].units[fu_idx].release();
            trace!("cycle {}: broadcast tag {}", self.cycle, tag);
        }
        // Candidates beyond the bus count stall with their unit still busy
    }

    // ----------------- STATE-UPDATE (retirement + wakeup) -----------------
    fn stage_state_update(&mut self) {
        let mut retiring: Vec<usize> = (0..self.rs.len())
            .filter(|&i| self.rs[i].completed && self.rs[i].inst.tag != 0)
            .collect();

        // Retire oldest first so producer-of-record checks see consistent state
        retiring.sort_by_key(|&i| self.rs[i].inst.tag);

        for idx in retiring {
            let inst = self.rs[idx].inst;
            self.total_inst_retired += 1;

            if inst.dest_reg >= 0 {
                let dest = inst.dest_reg as usize;
                let latest = self.reg_file[dest].producer_tag;

                // Only the youngest writer of record clears the ready bit
                if latest == inst.tag {
                    self.reg_file[dest].ready = true;
                }

                // Wake consumers whose tag lies in the producer chain between
                // the retiring writer and the writer of record
                for entry in self.rs.iter_mut() {
                    if entry.inst.tag == 0 {
                        continue;
                    }
                    for s in 0..2 {
                        if entry.inst.src_reg[s] == inst.dest_reg
                            && (latest == inst.tag
                                || (entry.inst.tag > inst.tag && entry.inst.tag <= latest))
                        {
                            entry.src_ready[s] = true;
                        }
                    }
                }
            }

            self.rs[idx].reset();
            trace!("cycle {}: retired tag {}", self.cycle, inst.tag);
        }
    }

    // ----------------- RESULTS -----------------

    pub fn stats(&self) -> ProcStats {
        let cycles = self.cycle as f32;
        let (avg_inst_fired, avg_inst_retired, avg_disp_size) = if self.cycle > 0 {
            (
                self.total_inst_fired as f32 / cycles,
                self.total_inst_retired as f32 / cycles,
                self.total_disp_size as f32 / cycles,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        ProcStats {
            // The final cycle only drains retirement bookkeeping
            cycle_count: self.cycle.saturating_sub(1),
            retired_instruction: self.total_inst_retired,
            avg_inst_fired,
            avg_inst_retired,
            avg_disp_size,
            max_disp_size: self.max_disp_size,
        }
    }

    pub fn record(&self, tag: u64) -> Option<&InstructionRecord> {
        self.records.get(tag as usize)
    }

    /// Number of instructions fetched so far.
    pub fn instructions_fetched(&self) -> u64 {
        self.next_tag - 1
    }

    /// Write the per-instruction timing table: one tab-separated line per
    /// tag, in tag order.
    pub fn write_timing<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (tag, record) in self.records.iter().enumerate().skip(1) {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                tag,
                record.fetch_cycle,
                record.disp_cycle,
                record.sched_cycle,
                record.exec_cycle,
                record.state_cycle
            )?;
        }
        Ok(())
    }
}
