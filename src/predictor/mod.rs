// mod.rs
pub mod history;
pub mod tage;

use std::fmt;

use serde::Serialize;

use self::tage::{BranchInfo, TagePredictor};

/// One resolved branch from a trace.
#[derive(Debug, Clone, Copy)]
pub struct BranchRecord {
    pub address: u32,
    pub taken: bool,
    pub conditional: bool,
}

/// Aggregate prediction results over a branch stream.
#[derive(Debug, Clone, Serialize)]
pub struct PredictorStats {
    pub branches: u64,
    pub conditional_branches: u64,
    pub mispredictions: u64,
    pub accuracy: f32,
}

impl fmt::Display for PredictorStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Predictor Statistics:")?;
        writeln!(f, "  Branches: {}", self.branches)?;
        writeln!(f, "  Conditional Branches: {}", self.conditional_branches)?;
        writeln!(f, "  Mispredictions: {}", self.mispredictions)?;
        write!(f, "  Accuracy: {:.4}%", self.accuracy * 100.0)
    }
}

/// Drive the predictor over a resolved branch stream: predict, score
/// conditional branches, then train. This is the harness role; only
/// conditional branches count toward accuracy.
pub fn run_trace(predictor: &mut TagePredictor, records: &[BranchRecord]) -> PredictorStats {
    let mut conditional_branches = 0u64;
    let mut mispredictions = 0u64;

    for record in records {
        let info = if record.conditional {
            BranchInfo::conditional(record.address)
        } else {
            BranchInfo::unconditional(record.address)
        };

        let prediction = predictor.predict(&info);
        if record.conditional {
            conditional_branches += 1;
            if prediction.taken != record.taken {
                mispredictions += 1;
            }
        }
        predictor.update(&prediction, record.taken, 0);
    }

    let accuracy = if conditional_branches > 0 {
        (conditional_branches - mispredictions) as f32 / conditional_branches as f32
    } else {
        0.0
    };

    PredictorStats {
        branches: records.len() as u64,
        conditional_branches,
        mispredictions,
        accuracy,
    }
}
