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

// main.rs
//
// This file contains the main entry point for the simulator suite. It
// provides a command-line interface for the single-cycle CPU, the
// out-of-order pipeline simulator, and the TAGE branch predictor.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use archsim_rust::ooo_simulator::config::ProcConfig;
use archsim_rust::ooo_simulator::simulator::{ProcSimulator, VecSource};
use archsim_rust::predictor::tage::{AgingPolicy, TageConfig, TagePredictor};
use archsim_rust::predictor::run_trace;
use archsim_rust::single_cycle::cpu::Cpu;
use archsim_rust::utils::trace;

#[derive(Parser)]
#[command(name = "archsim_rust")]
#[command(about = "Computer architecture coursework simulators written in Rust")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the single-cycle CPU on a hex-per-byte program file
    SingleCycle {
        /// Program file: one hex byte per line, four lines per instruction
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Run the out-of-order pipeline simulator on an instruction trace
    Proc {
        /// Instruction trace file
        #[arg(short, long)]
        trace: PathBuf,

        /// Number of result buses
        #[arg(short = 'r', long, default_value_t = 2)]
        result_buses: usize,

        /// Number of K0 functional units
        #[arg(long, default_value_t = 1)]
        k0: usize,

        /// Number of K1 functional units
        #[arg(long, default_value_t = 1)]
        k1: usize,

        /// Number of K2 functional units
        #[arg(long, default_value_t = 1)]
        k2: usize,

        /// Instructions fetched per cycle
        #[arg(short = 'f', long, default_value_t = 4)]
        fetch_width: usize,

        /// Print the per-instruction timing table
        #[arg(long)]
        timing: bool,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the TAGE branch predictor on a resolved branch trace
    Predict {
        /// Branch trace file: `<pc-hex> <0|1> [c|u]` per line
        #[arg(short, long)]
        trace: PathBuf,

        /// Use the large 8-table / 320-bit history configuration
        #[arg(long)]
        large: bool,

        /// Age every table every 2^15 branches instead of one table every 2^17
        #[arg(long)]
        all_tables_aging: bool,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.as_str()),
    )
    .init();

    let result = match cli.command {
        Commands::SingleCycle { input } => run_single_cycle(&input),
        Commands::Proc {
            trace,
            result_buses,
            k0,
            k1,
            k2,
            fetch_width,
            timing,
            json,
        } => run_proc(&trace, result_buses, k0, k1, k2, fetch_width, timing, json),
        Commands::Predict {
            trace,
            large,
            all_tables_aging,
            json,
        } => run_predict(&trace, large, all_tables_aging, json),
    };

    if let Err(error) = result {
        eprintln!("{} {}", "error:".red().bold(), error);
        std::process::exit(1);
    }
}

fn run_single_cycle(input: &PathBuf) -> Result<(), Box<dyn Error>> {
    let program = trace::load_hex_program(input)?;
    let mut cpu = Cpu::new(&program)?;
    cpu.run()?;

    let (a0, a1) = cpu.result();
    println!("({},{})", a0, a1);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_proc(
    trace_path: &PathBuf,
    result_buses: usize,
    k0: usize,
    k1: usize,
    k2: usize,
    fetch_width: usize,
    timing: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let config = ProcConfig::new()
        .with_result_buses(result_buses)
        .with_fu_counts(k0, k1, k2)
        .with_fetch_width(fetch_width);

    let instructions = trace::read_proc_trace(trace_path)?;
    let mut source = VecSource::new(instructions);
    let mut simulator = ProcSimulator::new(config)?;
    simulator.run(&mut source);

    if timing {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        simulator.write_timing(&mut handle)?;
        handle.flush()?;
    }

    let stats = simulator.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", "Pipeline simulation complete".green().bold());
        println!("{}", stats);
    }
    Ok(())
}

fn run_predict(
    trace_path: &PathBuf,
    large: bool,
    all_tables_aging: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut config = if large {
        TageConfig::large()
    } else {
        TageConfig::new()
    };
    if all_tables_aging {
        config = config.with_aging(AgingPolicy::AllTables);
    }

    let records = trace::read_branch_trace(trace_path)?;
    let mut predictor = TagePredictor::new(config)?;
    let stats = run_trace(&mut predictor, &records);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", "Prediction complete".green().bold());
        println!("{}", stats);
    }
    Ok(())
}
