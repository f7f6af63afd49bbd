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

// components.rs
//
// This file contains the hardware data model for the out-of-order pipeline
// simulator: instruction records, reservation-station entries, functional
// units, and the register-status table.

/// Number of architectural registers tracked by the register-status table.
pub const NUM_REGS: usize = 128;

/// Functional-unit class, selected by opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuType {
    K0 = 0,
    K1 = 1,
    K2 = 2,
}

impl FuType {
    pub const COUNT: usize = 3;

    /// Opcode routing: 0 -> K0; 1 and -1 -> K1; anything else -> K2.
    pub fn from_op_code(op_code: i32) -> Self {
        match op_code {
            0 => FuType::K0,
            1 | -1 => FuType::K1,
            _ => FuType::K2,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One instruction from the trace. Register index -1 means "none".
///
/// The tag is assigned by the fetch stage, monotonically from 1; tag 0 is
/// reserved to mark an empty reservation-station slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcInstruction {
    pub tag: u64,
    pub address: u64,
    pub op_code: i32,
    pub dest_reg: i32,
    pub src_reg: [i32; 2],
}

impl ProcInstruction {
    pub fn new(address: u64, op_code: i32, dest_reg: i32, src0: i32, src1: i32) -> Self {
        Self {
            tag: 0,
            address,
            op_code,
            dest_reg,
            src_reg: [src0, src1],
        }
    }
}

/// Per-tag timing record. A stage stamp of 0 means the instruction had not
/// reached that stage when the simulation ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionRecord {
    pub inst: ProcInstruction,
    pub fetch_cycle: u64,
    pub disp_cycle: u64,
    pub sched_cycle: u64,
    pub exec_cycle: u64,
    pub state_cycle: u64,
}

/// Register-status entry: either the register holds a committed value
/// (`ready`), or `producer_tag` names the youngest in-flight writer.
#[derive(Debug, Clone, Copy)]
pub struct RegisterStatus {
    pub ready: bool,
    pub producer_tag: u64,
}

impl Default for RegisterStatus {
    fn default() -> Self {
        Self {
            ready: true,
            producer_tag: 0,
        }
    }
}

/// Reservation-station entry. A slot is free iff `inst.tag == 0`.
#[derive(Debug, Clone, Copy)]
pub struct RsEntry {
    pub inst: ProcInstruction,
    pub src_ready: [bool; 2],
    pub src_tag: [u64; 2],
    pub issued: bool,
    pub fu_type: FuType,
    pub fu_index: Option<usize>,
    pub completed: bool,
}

impl RsEntry {
    pub fn is_free(&self) -> bool {
        self.inst.tag == 0
    }

    /// Occupied, not yet sent to a functional unit, and both sources ready.
    pub fn is_ready_to_fire(&self) -> bool {
        self.inst.tag != 0 && !self.issued && self.src_ready[0] && self.src_ready[1]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for RsEntry {
    fn default() -> Self {
        Self {
            inst: ProcInstruction::default(),
            src_ready: [false, false],
            src_tag: [0, 0],
            issued: false,
            fu_type: FuType::K0,
            fu_index: None,
            completed: false,
        }
    }
}

/// A single unit-latency functional unit. `busy` iff `inst_tag != 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuUnit {
    pub busy: bool,
    pub inst_tag: u64,
    pub cycles_left: u32,
}

impl FuUnit {
    pub fn fire(&mut self, tag: u64) {
        debug_assert!(!self.busy && tag != 0);
        self.busy = true;
        self.inst_tag = tag;
        self.cycles_left = 1;
    }

    pub fn release(&mut self) {
        debug_assert!(self.busy == (self.inst_tag != 0));
        self.busy = false;
        self.inst_tag = 0;
        self.cycles_left = 0;
    }
}

/// Pool of functional units of one class.
#[derive(Debug, Clone, Default)]
pub struct FuPool {
    pub units: Vec<FuUnit>,
}

impl FuPool {
    pub fn new(num_units: usize) -> Self {
        Self {
            units: vec![FuUnit::default(); num_units],
        }
    }

    /// Lowest-index free unit, for deterministic assignment.
    pub fn first_free(&self) -> Option<usize> {
        self.units.iter().position(|fu| !fu.busy)
    }

    pub fn any_busy(&self) -> bool {
        self.units.iter().any(|fu| fu.busy)
    }
}
