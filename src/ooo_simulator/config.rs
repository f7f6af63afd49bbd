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

// config.rs
//
// This file contains the configuration struct for the out-of-order pipeline
// simulator: result-bus count, functional-unit pool sizes, and fetch width.

use super::components::FuType;
use crate::errors::SimulatorError;

/// Configuration for the out-of-order pipeline simulator.
///
/// The reservation station is sized from the functional-unit pools:
/// `2 * (k0 + k1 + k2)` slots.
#[derive(Debug, Clone)]
pub struct ProcConfig {
    /// Number of result buses available for broadcast per cycle
    pub result_buses: usize,
    /// Number of functional units per opcode class
    pub num_k0_units: usize,
    pub num_k1_units: usize,
    pub num_k2_units: usize,
    /// Number of instructions fetched per cycle
    pub fetch_width: usize,
}

impl ProcConfig {
    pub fn new() -> Self {
        Self {
            result_buses: 2,
            num_k0_units: 1,
            num_k1_units: 1,
            num_k2_units: 1,
            fetch_width: 4,
        }
    }

    pub fn with_result_buses(mut self, num: usize) -> Self {
        self.result_buses = num;
        self
    }

    pub fn with_fu_counts(mut self, k0: usize, k1: usize, k2: usize) -> Self {
        self.num_k0_units = k0;
        self.num_k1_units = k1;
        self.num_k2_units = k2;
        self
    }

    pub fn with_fetch_width(mut self, width: usize) -> Self {
        self.fetch_width = width;
        self
    }

    pub fn fu_count(&self, fu_type: FuType) -> usize {
        match fu_type {
            FuType::K0 => self.num_k0_units,
            FuType::K1 => self.num_k1_units,
            FuType::K2 => self.num_k2_units,
        }
    }

    /// Reservation station capacity: twice the total functional-unit count.
    pub fn rs_capacity(&self) -> usize {
        2 * (self.num_k0_units + self.num_k1_units + self.num_k2_units)
    }

    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.result_buses == 0 {
            return Err(SimulatorError::InvalidConfiguration(
                "at least one result bus is required".to_string(),
            ));
        }
        if self.num_k0_units + self.num_k1_units + self.num_k2_units == 0 {
            return Err(SimulatorError::InvalidConfiguration(
                "at least one functional unit is required".to_string(),
            ));
        }
        if self.fetch_width == 0 {
            return Err(SimulatorError::InvalidConfiguration(
                "fetch width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self::new()
    }
}
