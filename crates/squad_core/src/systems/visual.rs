//! Render-only timers.

use crate::components::VisualState;
use crate::math::Fixed;

/// Decay flash timers toward zero.
#[must_use]
pub fn decay_visual_state(visual: VisualState, delta: Fixed) -> VisualState {
    let delta = delta.max(Fixed::ZERO);
    VisualState {
        hit_flash: (visual.hit_flash - delta).max(Fixed::ZERO),
        attack_flash: (visual.attack_flash - delta).max(Fixed::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_stops_at_zero() {
        let visual = VisualState {
            hit_flash: Fixed::from_num(0.25),
            attack_flash: Fixed::from_num(0.05),
        };
        let decayed = decay_visual_state(visual, Fixed::from_num(0.125));
        assert_eq!(decayed.hit_flash, Fixed::from_num(0.125));
        assert_eq!(decayed.attack_flash, Fixed::ZERO);
        assert_eq!(decay_visual_state(decayed, Fixed::ONE), VisualState::default());
    }
}
