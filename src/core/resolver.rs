/// Dice resolution — one uniform sample becomes a d20 roll, compared
/// against a check's difficulty and critical threshold. Stateless; the
/// session stages what happens with the chosen outcome.

use rand::Rng;

use crate::schema::check::{DiceCheck, Outcome};

/// Sides on the die every check rolls.
pub const DIE_SIDES: u8 = 20;

/// The numeric result of rolling against a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOutcome {
    pub roll: u8,
    pub success: bool,
    pub critical: bool,
}

impl RollOutcome {
    /// The outcome branch this roll selects on a check.
    pub fn branch<'a>(&self, check: &'a DiceCheck) -> &'a Outcome {
        if self.success {
            &check.success
        } else {
            &check.failure
        }
    }
}

/// Roll a d20 from one uniform [0, 1) sample. Always lands in 1..=20.
pub fn roll_d20<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    let unit: f64 = rng.gen();
    (unit * DIE_SIDES as f64).floor() as u8 + 1
}

/// Roll against a check and score the result.
pub fn resolve<R: Rng + ?Sized>(check: &DiceCheck, rng: &mut R) -> RollOutcome {
    score(check, roll_d20(rng))
}

/// Score an already-known roll: success when it meets the difficulty,
/// critical when a success also meets the critical threshold. A failed
/// roll is never critical.
pub fn score(check: &DiceCheck, roll: u8) -> RollOutcome {
    let success = roll >= check.difficulty;
    let critical = success && roll >= check.critical_threshold;
    RollOutcome {
        roll,
        success,
        critical,
    }
}
