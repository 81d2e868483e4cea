//! State codec
//!
//! Keys have the form `"{player_hp}|{player_charge}|{enemy_hp}|{enemy_charge}|{turn}"`.
//! Decimal fields with a separator make the encoding collision-free for every
//! representable state. Decoding is lenient: persisted tables may carry
//! damaged keys, and a missing or unparsable field becomes 0 instead of an
//! error.

use super::state::GameState;
use crate::identifiers::StateKey;

const SEPARATOR: char = '|';

/// Encode a state as its table key.
pub fn encode(state: &GameState) -> StateKey {
    StateKey::new(format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        state.player_hp, state.player_charge, state.enemy_hp, state.enemy_charge, state.turn
    ))
}

/// Decode a key back into a state (best effort).
pub fn decode(key: &str) -> GameState {
    let mut fields = key
        .split(SEPARATOR)
        .map(|field| field.trim().parse::<u32>().unwrap_or(0));
    let mut next = || fields.next().unwrap_or(0);
    GameState {
        player_hp: next(),
        player_charge: next(),
        enemy_hp: next(),
        enemy_charge: next(),
        turn: next(),
    }
}

impl GameState {
    /// Shorthand for [`encode`].
    pub fn key(&self) -> StateKey {
        encode(self)
    }
}
