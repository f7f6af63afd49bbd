use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SimulatorError {
    // Configuration errors
    InvalidConfiguration(String),

    // Trace / program input errors
    TraceParse { line: usize, message: String },
    ProgramTooLarge(usize),

    // Execution errors
    InvalidInstruction(u32),
    MemoryOutOfBounds(u32),

    // System errors
    IoError(std::io::Error),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::InvalidConfiguration(reason) => {
                write!(f, "Invalid configuration: {}", reason)
            },
            SimulatorError::TraceParse { line, message } => {
                write!(f, "Trace parse error at line {}: {}", line, message)
            },
            SimulatorError::ProgramTooLarge(bytes) => {
                write!(f, "Program too large for instruction memory: {} bytes", bytes)
            },
            SimulatorError::InvalidInstruction(instr) => {
                write!(f, "Invalid instruction: 0x{:08X}", instr)
            },
            SimulatorError::MemoryOutOfBounds(addr) => {
                write!(f, "Memory access out of bounds: 0x{:08X}", addr)
            },
            SimulatorError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(error: std::io::Error) -> Self {
        SimulatorError::IoError(error)
    }
}
