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

// instructions.rs
//
// This file contains the instruction definitions for the single-cycle CPU.
// It defines the Instruction enum covering the supported RV32I subset and
// the decode_instruction function that extracts fields from a 32-bit word.

/// Supported RV32I subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // R-type
    Add { rd: u32, rs1: u32, rs2: u32 },
    Sub { rd: u32, rs1: u32, rs2: u32 },
    Or { rd: u32, rs1: u32, rs2: u32 },
    Sra { rd: u32, rs1: u32, rs2: u32 },

    // I-type
    Addi { rd: u32, rs1: u32, imm: i32 },
    Ori { rd: u32, rs1: u32, imm: i32 },
    Srai { rd: u32, rs1: u32, shamt: u32 },

    // U-type
    Lui { rd: u32, imm: i32 },

    // Loads / stores
    Lw { rd: u32, rs1: u32, offset: i32 },
    Lbu { rd: u32, rs1: u32, offset: i32 },
    Sw { rs1: u32, rs2: u32, offset: i32 },
    Sh { rs1: u32, rs2: u32, offset: i32 },

    // Control flow
    Bne { rs1: u32, rs2: u32, offset: i32 },
    Jalr { rd: u32, rs1: u32, offset: i32 },

    /// All-zero opcode; terminates the program.
    Halt,
    InvalidInstruction,
}

fn rd(word: u32) -> u32 {
    (word >> 7) & 0x1F
}

fn funct3(word: u32) -> u32 {
    (word >> 12) & 0x7
}

fn rs1(word: u32) -> u32 {
    (word >> 15) & 0x1F
}

fn rs2(word: u32) -> u32 {
    (word >> 20) & 0x1F
}

fn funct7(word: u32) -> u32 {
    word >> 25
}

// Sign-extended I-type immediate, bits [31:20]
fn imm_i(word: u32) -> i32 {
    (word as i32) >> 20
}

// Sign-extended S-type immediate, bits [31:25] and [11:7]
fn imm_s(word: u32) -> i32 {
    (((word as i32) >> 25) << 5) | (((word >> 7) & 0x1F) as i32)
}

// Sign-extended B-type immediate, in bytes
fn imm_b(word: u32) -> i32 {
    (((word as i32) >> 31) << 12)
        | ((((word >> 7) & 0x1) as i32) << 11)
        | ((((word >> 25) & 0x3F) as i32) << 5)
        | ((((word >> 8) & 0xF) as i32) << 1)
}

// U-type immediate, already shifted into the upper 20 bits
fn imm_u(word: u32) -> i32 {
    (word & 0xFFFF_F000) as i32
}

pub fn decode_instruction(word: u32) -> Instruction {
    let opcode = word & 0x7F;
    match opcode {
        0x00 => Instruction::Halt,

        0x33 => match (funct3(word), funct7(word)) {
            (0x0, 0x00) => Instruction::Add {
                rd: rd(word),
                rs1: rs1(word),
                rs2: rs2(word),
            },
            (0x0, 0x20) => Instruction::Sub {
                rd: rd(word),
                rs1: rs1(word),
                rs2: rs2(word),
            },
            (0x6, 0x00) => Instruction::Or {
                rd: rd(word),
                rs1: rs1(word),
                rs2: rs2(word),
            },
            (0x5, 0x20) => Instruction::Sra {
                rd: rd(word),
                rs1: rs1(word),
                rs2: rs2(word),
            },
            _ => Instruction::InvalidInstruction,
        },

        0x13 => match funct3(word) {
            0x0 => Instruction::Addi {
                rd: rd(word),
                rs1: rs1(word),
                imm: imm_i(word),
            },
            0x6 => Instruction::Ori {
                rd: rd(word),
                rs1: rs1(word),
                imm: imm_i(word),
            },
            0x5 if funct7(word) == 0x20 => Instruction::Srai {
                rd: rd(word),
                rs1: rs1(word),
                shamt: rs2(word),
            },
            _ => Instruction::InvalidInstruction,
        },

        0x37 => Instruction::Lui {
            rd: rd(word),
            imm: imm_u(word),
        },

        0x03 => match funct3(word) {
            0x2 => Instruction::Lw {
                rd: rd(word),
                rs1: rs1(word),
                offset: imm_i(word),
            },
            0x4 => Instruction::Lbu {
                rd: rd(word),
                rs1: rs1(word),
                offset: imm_i(word),
            },
            _ => Instruction::InvalidInstruction,
        },

        0x23 => match funct3(word) {
            0x2 => Instruction::Sw {
                rs1: rs1(word),
                rs2: rs2(word),
                offset: imm_s(word),
            },
            0x1 => Instruction::Sh {
                rs1: rs1(word),
                rs2: rs2(word),
                offset: imm_s(word),
            },
            _ => Instruction::InvalidInstruction,
        },

        0x63 => match funct3(word) {
            0x1 => Instruction::Bne {
                rs1: rs1(word),
                rs2: rs2(word),
                offset: imm_b(word),
            },
            _ => Instruction::InvalidInstruction,
        },

        0x67 => Instruction::Jalr {
            rd: rd(word),
            rs1: rs1(word),
            offset: imm_i(word),
        },

        _ => Instruction::InvalidInstruction,
    }
}
