// tests/predictor_tests.rs
use archsim_rust::predictor::tage::{
    AgingPolicy, BranchInfo, TageConfig, TagePredictor, CTR_MAX, CTR_MIN, U_MAX,
};
use archsim_rust::predictor::{run_trace, BranchRecord};
use archsim_rust::utils::trace::random_branch_trace;

/// Test suite for the TAGE branch predictor

fn conditional(address: u32, taken: bool) -> BranchRecord {
    BranchRecord {
        address,
        taken,
        conditional: true,
    }
}

fn assert_state_in_range(predictor: &TagePredictor) {
    for counter in &predictor.base {
        assert!(*counter <= 3);
    }
    for table in &predictor.tables {
        for entry in table {
            assert!(entry.ctr >= CTR_MIN && entry.ctr <= CTR_MAX);
            assert!(entry.u <= U_MAX);
        }
    }
    assert!(predictor.use_alt_on_na <= 15);
}

#[test]
fn all_taken_stream_saturates_base_and_predicts_taken() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();

    let addresses: Vec<u32> = (0..64).map(|i| 0x0040_0000 + 4 * i).collect();
    let records: Vec<BranchRecord> = (0..10_000)
        .map(|i| conditional(addresses[i % addresses.len()], true))
        .collect();

    let stats = run_trace(&mut predictor, &records);
    assert!(stats.accuracy >= 0.99, "accuracy was {}", stats.accuracy);

    // Every touched bimodal counter ends strongly taken
    for &address in &addresses {
        let base_idx = ((address >> 2) as usize) & (predictor.base.len() - 1);
        assert_eq!(predictor.base[base_idx], 3);
    }
}

#[test]
fn identical_streams_produce_identical_predictions() {
    let records = random_branch_trace(7, 20_000);

    let mut predictions = Vec::new();
    for _ in 0..2 {
        let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
        let stream: Vec<bool> = records
            .iter()
            .map(|record| {
                let info = if record.conditional {
                    BranchInfo::conditional(record.address)
                } else {
                    BranchInfo::unconditional(record.address)
                };
                let prediction = predictor.predict(&info);
                predictor.update(&prediction, record.taken, 0);
                prediction.taken
            })
            .collect();
        predictions.push(stream);
    }

    assert_eq!(predictions[0], predictions[1]);
}

#[test]
fn counters_stay_in_range_under_random_updates() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    let records = random_branch_trace(12345, 50_000);
    run_trace(&mut predictor, &records);
    assert_state_in_range(&predictor);
}

#[test]
fn counters_stay_in_range_with_all_tables_aging() {
    let config = TageConfig::new().with_aging(AgingPolicy::AllTables);
    let mut predictor = TagePredictor::new(config).unwrap();
    let records = random_branch_trace(54321, 50_000);
    run_trace(&mut predictor, &records);
    assert_state_in_range(&predictor);
}

#[test]
fn periodic_stream_becomes_fully_predictable() {
    // Period 2 at one branch site: four history bits resolve the phase, so
    // the tagged tables learn the pattern exactly
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    let records: Vec<BranchRecord> = (0..4_000)
        .map(|i| conditional(0x0080_0040, i % 2 == 0))
        .collect();

    let warmup = run_trace(&mut predictor, &records[..3_000]);
    let trained = run_trace(&mut predictor, &records[3_000..]);

    assert!(warmup.mispredictions < 3_000);
    assert_eq!(trained.mispredictions, 0);
}

#[test]
fn short_period_pattern_is_learned() {
    // Period 4 (taken, taken, not-taken, taken), still within the shortest
    // table's history length
    let pattern = [true, true, false, true];
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    let records: Vec<BranchRecord> = (0..4_000)
        .map(|i| conditional(0x0080_0080, pattern[i % pattern.len()]))
        .collect();

    run_trace(&mut predictor, &records[..3_000]);
    let trained = run_trace(&mut predictor, &records[3_000..]);
    assert_eq!(trained.mispredictions, 0);
}

#[test]
fn non_conditional_branches_predict_taken_and_skip_training() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();

    let info = BranchInfo::unconditional(0x1234_5678);
    let prediction = predictor.predict(&info);
    assert!(prediction.taken);
    assert_eq!(prediction.target, 0);

    // Updating with a non-conditional record only shifts history
    let base_before = predictor.base.clone();
    predictor.update(&prediction, false, 0);
    assert_eq!(predictor.base, base_before);
    assert!(!predictor.history.bit(0));
    assert_eq!(predictor.clock, 0);
}

#[test]
fn unconditional_branches_do_not_count_toward_accuracy() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    let records = vec![
        BranchRecord {
            address: 0x100,
            taken: false,
            conditional: false,
        },
        conditional(0x200, true),
        conditional(0x200, true),
    ];

    let stats = run_trace(&mut predictor, &records);
    assert_eq!(stats.branches, 3);
    assert_eq!(stats.conditional_branches, 2);
}

#[test]
fn single_table_aging_decrements_only_the_rotating_table() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();
    predictor.clock = 0x1_FFFF;
    predictor.tables[0][5].u = 3;
    predictor.tables[1][5].u = 3;

    let info = BranchInfo::conditional(0x4000);
    let prediction = predictor.predict(&info);
    predictor.update(&prediction, true, 0);

    // clock reaches 2^17: table (clock >> 17) % 7 == 1 ages, table 0 does not
    assert_eq!(predictor.clock, 0x2_0000);
    assert_eq!(predictor.tables[0][5].u, 3);
    assert_eq!(predictor.tables[1][5].u, 2);
}

#[test]
fn all_tables_aging_decrements_every_table() {
    let config = TageConfig::new().with_aging(AgingPolicy::AllTables);
    let mut predictor = TagePredictor::new(config).unwrap();
    predictor.clock = 0x7FFF;
    for table in 0..7 {
        predictor.tables[table][9].u = 2;
    }

    let info = BranchInfo::conditional(0x4000);
    let prediction = predictor.predict(&info);
    predictor.update(&prediction, true, 0);

    assert_eq!(predictor.clock, 0x8000);
    for table in 0..7 {
        assert_eq!(predictor.tables[table][9].u, 1);
    }
}

#[test]
fn large_configuration_exercises_long_histories() {
    let mut predictor = TagePredictor::new(TageConfig::large()).unwrap();
    assert_eq!(predictor.tables.len(), 8);
    assert_eq!(predictor.base.len(), 1 << 16);
    // Base starts weakly not taken in the large variant
    assert!(predictor.base.iter().all(|&counter| counter == 1));

    let records: Vec<BranchRecord> =
        (0..2_000u32).map(|i| conditional(0x9000 + 8 * i, true)).collect();
    let stats = run_trace(&mut predictor, &records);
    assert_state_in_range(&predictor);
    assert!(stats.branches == 2_000);
}

#[test]
fn config_rejects_bad_geometry() {
    let mut config = TageConfig::new();
    config.num_tables = 9;
    assert!(TagePredictor::new(config).is_err());

    let mut config = TageConfig::new();
    config.hist_lens = vec![4, 8, 8, 32, 64, 128, 200];
    assert!(TagePredictor::new(config).is_err());

    let mut config = TageConfig::new();
    config.hist_lens = vec![4, 8, 16, 32, 64, 128, 400];
    assert!(TagePredictor::new(config).is_err());

    let mut config = TageConfig::new();
    config.hist_lens = vec![4, 8, 16];
    assert!(TagePredictor::new(config).is_err());
}

#[test]
fn misprediction_allocates_above_the_provider() {
    let mut predictor = TagePredictor::new(TageConfig::new()).unwrap();

    // Pick a cold branch site with no spurious tag match, so the provider
    // is the base table and allocation starts from the shortest history
    let info = (0..64u32)
        .map(|i| BranchInfo::conditional(0xBEEF_0000 + 4 * i))
        .find(|info| predictor.predict(info).provider_table().is_none())
        .expect("some cold site has no tag match");

    // Base is initialized weakly taken, so a not-taken outcome mispredicts
    let prediction = predictor.predict(&info);
    assert!(prediction.taken);
    predictor.update(&prediction, false, 0);

    let allocated: usize = predictor
        .tables
        .iter()
        .map(|table| table.iter().filter(|entry| entry.ctr == -1).count())
        .sum();
    assert_eq!(allocated, 2);
}
