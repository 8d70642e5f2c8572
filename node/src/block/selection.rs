use sha2::{Digest, Sha256};

use crate::ledger::stake::StakeTable;

/// Domain separator mixed into every round draw
const ROUND_SEED_PREFIX: &[u8] = b"simchain-round:";

/// Outcome of a validator draw for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub validator: String,
    pub round: u64,
    pub draw: u64,
    pub total_stake: u128,
}

/// Deterministic pseudo-random draw for a round. Every node evaluates the
/// same value without exchanging messages.
pub fn round_draw(round: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(ROUND_SEED_PREFIX);
    hasher.update(round.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Select the validator for `round`, weighting each eligible entry by stake.
///
/// The draw modulo the total eligible stake falls into exactly one entry's
/// cumulative range, walking entries in identifier order. Returns `None` when
/// no entry has a positive stake.
pub fn select_validator(round: u64, stakes: &StakeTable) -> Option<Selection> {
    let total: u128 = stakes.eligible().map(|(_, stake)| u128::from(stake)).sum();
    if total == 0 {
        return None;
    }

    let draw = round_draw(round);
    let mut cursor = u128::from(draw) % total;
    let mut chosen = None;
    for (id, stake) in stakes.eligible() {
        let stake = u128::from(stake);
        if cursor < stake {
            chosen = Some(id);
            break;
        }
        cursor -= stake;
    }

    chosen.map(|validator| Selection {
        validator: validator.to_string(),
        round,
        draw,
        total_stake: total,
    })
}
