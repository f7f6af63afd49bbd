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

// trace.rs
//
// This file contains the trace-file readers consumed by the simulators:
// the instruction trace for the out-of-order pipeline, the resolved branch
// trace for the predictor, and the hex-per-byte program format for the
// single-cycle CPU. It also provides seeded random trace generators used
// by benchmarks and property tests.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::SimulatorError;
use crate::ooo_simulator::components::{ProcInstruction, NUM_REGS};
use crate::predictor::BranchRecord;

fn parse_error(line: usize, message: impl Into<String>) -> SimulatorError {
    SimulatorError::TraceParse {
        line,
        message: message.into(),
    }
}

/// Read an instruction trace:
/// `<address-hex> <op_code> <dest_reg> <src_reg0> <src_reg1>` per line,
/// register index -1 meaning "none".
pub fn read_proc_trace<P: AsRef<Path>>(path: P) -> Result<Vec<ProcInstruction>, SimulatorError> {
    let reader = BufReader::new(File::open(path)?);
    let mut instructions = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(parse_error(
                line_no,
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }

        let address = u64::from_str_radix(fields[0].trim_start_matches("0x"), 16)
            .map_err(|_| parse_error(line_no, format!("bad address '{}'", fields[0])))?;
        let op_code: i32 = fields[1]
            .parse()
            .map_err(|_| parse_error(line_no, format!("bad op code '{}'", fields[1])))?;

        let mut regs = [0i32; 3];
        for (slot, field) in regs.iter_mut().zip(&fields[2..5]) {
            let reg: i32 = field
                .parse()
                .map_err(|_| parse_error(line_no, format!("bad register '{}'", field)))?;
            if reg < -1 || reg >= NUM_REGS as i32 {
                return Err(parse_error(line_no, format!("register {} out of range", reg)));
            }
            *slot = reg;
        }

        instructions.push(ProcInstruction::new(address, op_code, regs[0], regs[1], regs[2]));
    }

    Ok(instructions)
}

/// Read a resolved branch trace: `<pc-hex> <0|1> [c|u]` per line, the third
/// field marking the branch conditional (default) or unconditional.
pub fn read_branch_trace<P: AsRef<Path>>(path: P) -> Result<Vec<BranchRecord>, SimulatorError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(parse_error(
                line_no,
                format!("expected 2 or 3 fields, found {}", fields.len()),
            ));
        }

        let address = u32::from_str_radix(fields[0].trim_start_matches("0x"), 16)
            .map_err(|_| parse_error(line_no, format!("bad address '{}'", fields[0])))?;
        let taken = match fields[1] {
            "0" => false,
            "1" => true,
            other => return Err(parse_error(line_no, format!("bad outcome '{}'", other))),
        };
        let conditional = match fields.get(2) {
            None | Some(&"c") => true,
            Some(&"u") => false,
            Some(other) => {
                return Err(parse_error(line_no, format!("bad branch kind '{}'", other)))
            },
        };

        records.push(BranchRecord {
            address,
            taken,
            conditional,
        });
    }

    Ok(records)
}

/// Load a hex-per-byte program file: one byte per line as two hex digits,
/// four lines per 32-bit instruction in little-endian byte order.
pub fn load_hex_program<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, SimulatorError> {
    let reader = BufReader::new(File::open(path)?);
    let mut bytes = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let byte = u8::from_str_radix(trimmed, 16)
            .map_err(|_| parse_error(line_no, format!("bad byte '{}'", trimmed)))?;
        bytes.push(byte);
    }

    Ok(bytes)
}

/// Generate a deterministic random instruction trace. The same seed always
/// produces the same trace.
pub fn random_proc_trace(seed: u64, len: usize) -> Vec<ProcInstruction> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut trace = Vec::with_capacity(len);

    for i in 0..len {
        let op_code = rng.gen_range(-1..3);
        let dest_reg = if rng.gen_bool(0.9) {
            rng.gen_range(0..NUM_REGS as i32)
        } else {
            -1
        };
        let mut src_reg = [0i32; 2];
        for src in &mut src_reg {
            *src = if rng.gen_bool(0.75) {
                rng.gen_range(0..NUM_REGS as i32)
            } else {
                -1
            };
        }

        trace.push(ProcInstruction::new(
            0x1000 + 4 * i as u64,
            op_code,
            dest_reg,
            src_reg[0],
            src_reg[1],
        ));
    }

    trace
}

/// Generate a deterministic random branch stream over a small set of branch
/// sites, each with its own taken bias; roughly 5% are unconditional.
pub fn random_branch_trace(seed: u64, len: usize) -> Vec<BranchRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    let num_sites = 64;
    let sites: Vec<(u32, f64)> = (0..num_sites)
        .map(|i| (0x4000_0000 + 16 * i as u32, rng.gen_range(0.0..1.0)))
        .collect();

    (0..len)
        .map(|_| {
            let &(address, bias) = &sites[rng.gen_range(0..num_sites)];
            BranchRecord {
                address,
                taken: rng.gen_bool(bias),
                conditional: rng.gen_bool(0.95),
            }
        })
        .collect()
}
