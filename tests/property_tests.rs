// tests/property_tests.rs
use proptest::prelude::*;
use quickcheck::TestResult;

use archsim_rust::ooo_simulator::components::ProcInstruction;
use archsim_rust::ooo_simulator::config::ProcConfig;
use archsim_rust::ooo_simulator::simulator::{ProcSimulator, VecSource};
use archsim_rust::predictor::history::{GlobalHistory, MAX_HIST_BITS};
use archsim_rust::predictor::tage::{TageConfig, TagePredictor, CTR_MAX, CTR_MIN, U_MAX};
use archsim_rust::predictor::{run_trace, BranchRecord};
use archsim_rust::utils::trace::{random_branch_trace, random_proc_trace};

// Property-based tests using proptest

fn arb_instruction() -> impl Strategy<Value = ProcInstruction> {
    (-1i32..3, -1i32..16, -1i32..16, -1i32..16)
        .prop_map(|(op, dest, src0, src1)| ProcInstruction::new(0x2000, op, dest, src0, src1))
}

proptest! {
    #[test]
    fn test_pipeline_stage_ordering(
        instructions in proptest::collection::vec(arb_instruction(), 0..60)
    ) {
        let count = instructions.len() as u64;
        let config = ProcConfig::new()
            .with_result_buses(2)
            .with_fu_counts(1, 1, 1)
            .with_fetch_width(2);
        let mut simulator = ProcSimulator::new(config).unwrap();
        let mut source = VecSource::new(instructions);
        simulator.run(&mut source);

        prop_assert_eq!(simulator.stats().retired_instruction, count);

        // Strictly increasing tags, one cycle per stage minimum
        for tag in 1..=count {
            let record = simulator.record(tag).unwrap();
            prop_assert_eq!(record.inst.tag, tag);
            prop_assert!(record.fetch_cycle >= 1);
            prop_assert!(record.disp_cycle > record.fetch_cycle);
            prop_assert!(record.sched_cycle > record.disp_cycle);
            prop_assert!(record.exec_cycle > record.sched_cycle);
            prop_assert!(record.state_cycle > record.exec_cycle);
        }
    }

    #[test]
    fn test_history_round_trips_outcomes(
        outcomes in proptest::collection::vec(any::<bool>(), 1..200)
    ) {
        let mut history = GlobalHistory::new();
        for &taken in &outcomes {
            history.shift_in(taken);
        }

        // bit(0) is the newest outcome, bit(k) the outcome k branches back
        for (age, &taken) in outcomes.iter().rev().enumerate() {
            prop_assert_eq!(history.bit(age), taken);
        }
    }

    #[test]
    fn test_history_compression_deterministic_and_length_clamped(
        outcomes in proptest::collection::vec(any::<bool>(), 0..400),
        len in 0usize..400
    ) {
        let mut history = GlobalHistory::new();
        for &taken in &outcomes {
            history.shift_in(taken);
        }

        prop_assert_eq!(history.compress(len), history.compress(len));
        prop_assert_eq!(history.compress(400), history.compress(MAX_HIST_BITS));
    }

    #[test]
    fn test_tage_counters_bounded_by_arbitrary_outcomes(
        outcomes in proptest::collection::vec(any::<bool>(), 1..500)
    ) {
        let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
        let records: Vec<BranchRecord> = outcomes
            .iter()
            .enumerate()
            .map(|(i, &taken)| BranchRecord {
                address: 0x7000 + 16 * ((i % 8) as u32),
                taken,
                conditional: true,
            })
            .collect();
        run_trace(&mut predictor, &records);

        for counter in &predictor.base {
            prop_assert!(*counter <= 3);
        }
        for table in &predictor.tables {
            for entry in table {
                prop_assert!(entry.ctr >= CTR_MIN && entry.ctr <= CTR_MAX);
                prop_assert!(entry.u <= U_MAX);
            }
        }
        prop_assert!(predictor.use_alt_on_na <= 15);
    }
}

// QuickCheck-based tests

fn qc_pipeline_deterministic(seed: u64) -> bool {
    let trace = random_proc_trace(seed, 80);

    let mut tables = Vec::new();
    for _ in 0..2 {
        let config = ProcConfig::new()
            .with_result_buses(1)
            .with_fu_counts(2, 1, 1)
            .with_fetch_width(3);
        let mut simulator = ProcSimulator::new(config).unwrap();
        let mut source = VecSource::new(trace.clone());
        simulator.run(&mut source);

        let mut buffer = Vec::new();
        simulator.write_timing(&mut buffer).unwrap();
        tables.push(buffer);
    }

    tables[0] == tables[1]
}

fn qc_fetch_respects_width(width: usize) -> TestResult {
    if width == 0 || width > 16 {
        return TestResult::discard();
    }

    let config = ProcConfig::new().with_fetch_width(width);
    let mut simulator = ProcSimulator::new(config).unwrap();
    let mut source = VecSource::new(random_proc_trace(3, 64));
    simulator.run(&mut source);

    // No fetch cycle may carry more instructions than the fetch width
    let mut per_cycle = std::collections::HashMap::new();
    for tag in 1..=64u64 {
        let fetch = simulator.record(tag).unwrap().fetch_cycle;
        *per_cycle.entry(fetch).or_insert(0usize) += 1;
    }
    TestResult::from_bool(per_cycle.values().all(|&count| count <= width))
}

fn qc_predictor_accuracy_is_a_ratio(seed: u64) -> bool {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    let records = random_branch_trace(seed, 500);
    let stats = run_trace(&mut predictor, &records);
    (0.0..=1.0).contains(&stats.accuracy) && stats.mispredictions <= stats.conditional_branches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_quickcheck_tests() {
        quickcheck::QuickCheck::new()
            .tests(10)
            .quickcheck(qc_pipeline_deterministic as fn(u64) -> bool);

        quickcheck::QuickCheck::new()
            .tests(10)
            .quickcheck(qc_fetch_respects_width as fn(usize) -> TestResult);

        quickcheck::QuickCheck::new()
            .tests(5)
            .quickcheck(qc_predictor_accuracy_is_a_ratio as fn(u64) -> bool);
    }
}
