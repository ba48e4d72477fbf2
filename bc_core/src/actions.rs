// Robot action flags and the flat discrete action space built from them
use crate::error::{BcError, Result};
use serde::{Deserialize, Serialize};

const VERTICAL: [RobotAction; 3] = [RobotAction::None, RobotAction::Up, RobotAction::Down];
const HORIZONTAL: [RobotAction; 3] = [RobotAction::None, RobotAction::Left, RobotAction::Right];
const GRIPPER: [RobotAction; 2] = [RobotAction::Open, RobotAction::Close];

/// Size of the flat action space (vertical × horizontal × gripper).
pub const NUM_ACTIONS: usize = VERTICAL.len() * HORIZONTAL.len() * GRIPPER.len();

/// Individual robot control flags. The discriminants are the bit values the
/// environment uses when it reports actions as a flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RobotAction {
    None = 0,
    Up = 1,
    Down = 2,
    Left = 4,
    Right = 8,
    Open = 16,
    Close = 32,
}

/// One flag per control axis: `[vertical, horizontal, gripper]`.
pub type ActionFlags = [RobotAction; 3];

impl RobotAction {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Combined bit mask of a flag triple.
pub fn flags_to_bits(flags: &ActionFlags) -> u8 {
    flags.iter().fold(0, |acc, f| acc | f.bits())
}

/// Convert a structured flag triple into its flat integer action.
pub fn flags_to_action(flags: &ActionFlags) -> Result<u32> {
    let [v, h, g] = *flags;
    let vi = VERTICAL.iter().position(|&a| a == v);
    let hi = HORIZONTAL.iter().position(|&a| a == h);
    let gi = GRIPPER.iter().position(|&a| a == g);
    match (vi, hi, gi) {
        (Some(vi), Some(hi), Some(gi)) => {
            Ok(((vi * HORIZONTAL.len() + hi) * GRIPPER.len() + gi) as u32)
        }
        _ => Err(BcError::InvalidAction(flags_to_bits(flags) as u32)),
    }
}

/// Parse a flat integer action back into its flag triple.
pub fn action_to_flags(action: u32) -> Result<ActionFlags> {
    let idx = action as usize;
    if idx >= NUM_ACTIONS {
        return Err(BcError::InvalidAction(action));
    }
    let gi = idx % GRIPPER.len();
    let hi = (idx / GRIPPER.len()) % HORIZONTAL.len();
    let vi = idx / (GRIPPER.len() * HORIZONTAL.len());
    Ok([VERTICAL[vi], HORIZONTAL[hi], GRIPPER[gi]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_action_is_zero() {
        let flags = [RobotAction::None, RobotAction::None, RobotAction::Open];
        assert_eq!(flags_to_action(&flags).unwrap(), 0);
    }

    #[test]
    fn test_every_action_maps_back_to_itself() {
        for a in 0..NUM_ACTIONS as u32 {
            let flags = action_to_flags(a).unwrap();
            assert_eq!(flags_to_action(&flags).unwrap(), a);
        }
    }

    #[test]
    fn test_out_of_range_action_rejected() {
        assert!(action_to_flags(NUM_ACTIONS as u32).is_err());
        let bad = [RobotAction::Left, RobotAction::None, RobotAction::Open];
        assert!(flags_to_action(&bad).is_err());
    }

    #[test]
    fn test_flag_bits() {
        let flags = [RobotAction::Up, RobotAction::Right, RobotAction::Close];
        assert_eq!(flags_to_bits(&flags), 1 | 8 | 32);
    }
}
