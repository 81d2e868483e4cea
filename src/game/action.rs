//! Actions and per-turn decisions

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of actions available to each side.
pub const ACTION_COUNT: usize = 3;

/// One of the three moves a side can make in a turn.
///
/// The discriminant doubles as the index into a [`QRow`](crate::q_learning::QRow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Attack = 0,
    Defend = 1,
    Charge = 2,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; ACTION_COUNT] = [Action::Attack, Action::Defend, Action::Charge];

    /// Index of this action within a Q-row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up an action by its Q-row index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Upper-case wire label.
    pub fn label(self) -> &'static str {
        match self {
            Action::Attack => "ATTACK",
            Action::Defend => "DEFEND",
            Action::Charge => "CHARGE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = Error;

    /// Accepts labels in any case, or a numeric index `0..=2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "ATTACK" => Ok(Action::Attack),
            "DEFEND" => Ok(Action::Defend),
            "CHARGE" => Ok(Action::Charge),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(Action::from_index)
                .ok_or_else(|| Error::InvalidAction {
                    value: trimmed.to_string(),
                }),
        }
    }
}

/// An action together with the charge committed to it.
///
/// `spend` only matters for [`Action::Attack`]; the game model clamps it into
/// `[1, attacker_charge]` before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub spend: u32,
}

impl Decision {
    pub fn new(action: Action, spend: u32) -> Self {
        Self { action, spend }
    }

    /// Commit all available charge (at least 1) to the action.
    pub fn full_charge(action: Action, charge: u32) -> Self {
        Self {
            action,
            spend: charge.max(1),
        }
    }
}
