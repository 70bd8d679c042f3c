// Motion state, directional output patterns and speed-to-duty conversion
//
// The drive is a two-side (tank) layout: each side has a forward and a backward
// direction output, and both sides share one duty cycle.

use serde::Serialize;

use crate::hardware::Actuator;

/// Observable motion state of the vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    #[default]
    Stopped,
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackLeft,
    BackRight,
}

/// Motion or stop directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackLeft,
    BackRight,
}

impl Directive {
    /// State tag reached by applying this directive
    pub fn state(self) -> VehicleState {
        match self {
            Directive::Stop => VehicleState::Stopped,
            Directive::Forward => VehicleState::Forward,
            Directive::Backward => VehicleState::Backward,
            Directive::Left => VehicleState::Left,
            Directive::Right => VehicleState::Right,
            Directive::ForwardLeft => VehicleState::ForwardLeft,
            Directive::ForwardRight => VehicleState::ForwardRight,
            Directive::BackLeft => VehicleState::BackLeft,
            Directive::BackRight => VehicleState::BackRight,
        }
    }

    /// Directional output pattern for this directive
    ///
    /// Diagonal directives reuse the straight patterns: with a single shared duty
    /// cycle only the state tag tells them apart.
    pub fn pattern(self) -> DirectionPattern {
        match self {
            Directive::Stop => DirectionPattern::ALL_LOW,
            Directive::Forward | Directive::ForwardLeft | Directive::ForwardRight => {
                DirectionPattern::new(true, false, true, false)
            }
            Directive::Backward | Directive::BackLeft | Directive::BackRight => {
                DirectionPattern::new(false, true, false, true)
            }
            // Spin in place: left side back, right side forward
            Directive::Left => DirectionPattern::new(false, true, true, false),
            Directive::Right => DirectionPattern::new(true, false, false, true),
        }
    }
}

/// Levels of the four directional outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionPattern {
    pub left_fwd: bool,
    pub left_bkd: bool,
    pub right_fwd: bool,
    pub right_bkd: bool,
}

impl DirectionPattern {
    pub const ALL_LOW: DirectionPattern = DirectionPattern {
        left_fwd: false,
        left_bkd: false,
        right_fwd: false,
        right_bkd: false,
    };

    pub const fn new(left_fwd: bool, left_bkd: bool, right_fwd: bool, right_bkd: bool) -> Self {
        Self {
            left_fwd,
            left_bkd,
            right_fwd,
            right_bkd,
        }
    }

    /// Returns levels as array [left_fwd, left_bkd, right_fwd, right_bkd]
    pub fn as_array(&self) -> [bool; 4] {
        [self.left_fwd, self.left_bkd, self.right_fwd, self.right_bkd]
    }
}

/// Drive speed in percent, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeedPercent(u8);

impl SpeedPercent {
    pub const ZERO: SpeedPercent = SpeedPercent(0);
    pub const FULL: SpeedPercent = SpeedPercent(100);

    /// Build from any integer, clamped to 0..=100
    pub fn clamped(pct: i32) -> Self {
        Self(pct.clamp(0, 100) as u8)
    }

    /// Speed step for a decimal digit (digit * 10)
    pub fn from_digit(digit: u8) -> Option<Self> {
        (digit <= 9).then(|| Self(digit * 10))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Duty value for this speed: round(pct / 100 * max_duty)
    pub fn duty(self, max_duty: u16) -> u16 {
        let duty = (f32::from(self.0) / 100.0) * f32::from(max_duty);
        (duty.round() as u32).min(u32::from(max_duty)) as u16
    }
}

impl Default for SpeedPercent {
    fn default() -> Self {
        Self(crate::config::DEFAULT_SPEED_PERCENT)
    }
}

/// Holds the current motion state and drives the directional outputs
#[derive(Debug, Default)]
pub struct StateMachine {
    state: VehicleState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Apply a directive: write its output pattern and take its state tag
    ///
    /// The transition does not depend on the current state.
    pub fn apply<A: Actuator + ?Sized>(&mut self, directive: Directive, actuator: &mut A) -> VehicleState {
        actuator.set_direction(directive.pattern());
        self.state = directive.state();
        self.state
    }

    /// Force STOPPED (used by the safety supervisor and shutdown)
    pub fn force_stop<A: Actuator + ?Sized>(&mut self, actuator: &mut A) -> VehicleState {
        self.apply(Directive::Stop, actuator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedBoard;

    const ALL_DIRECTIVES: [Directive; 9] = [
        Directive::Stop,
        Directive::Forward,
        Directive::Backward,
        Directive::Left,
        Directive::Right,
        Directive::ForwardLeft,
        Directive::ForwardRight,
        Directive::BackLeft,
        Directive::BackRight,
    ];

    #[test]
    fn test_directive_patterns() {
        let expected = [
            (Directive::Stop, [false, false, false, false], VehicleState::Stopped),
            (Directive::Forward, [true, false, true, false], VehicleState::Forward),
            (Directive::Backward, [false, true, false, true], VehicleState::Backward),
            (Directive::Left, [false, true, true, false], VehicleState::Left),
            (Directive::Right, [true, false, false, true], VehicleState::Right),
            (Directive::ForwardLeft, [true, false, true, false], VehicleState::ForwardLeft),
            (Directive::ForwardRight, [true, false, true, false], VehicleState::ForwardRight),
            (Directive::BackLeft, [false, true, false, true], VehicleState::BackLeft),
            (Directive::BackRight, [false, true, false, true], VehicleState::BackRight),
        ];

        for (directive, pins, state) in expected {
            let mut board = SimulatedBoard::new();
            let mut machine = StateMachine::new();
            assert_eq!(machine.apply(directive, &mut board), state);
            assert_eq!(machine.state(), state);
            assert_eq!(
                board.outputs().direction.as_array(),
                pins,
                "wrong pattern for {:?}",
                directive
            );
        }
    }

    #[test]
    fn test_all_directives_covered() {
        assert_eq!(ALL_DIRECTIVES.len(), 9);
        for directive in ALL_DIRECTIVES {
            // Only Stop drives everything low
            let all_low = directive.pattern() == DirectionPattern::ALL_LOW;
            assert_eq!(all_low, directive == Directive::Stop);
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut board = SimulatedBoard::new();
        let mut machine = StateMachine::new();
        machine.apply(Directive::Forward, &mut board);

        machine.apply(Directive::Stop, &mut board);
        let once = (machine.state(), board.outputs().direction);
        machine.apply(Directive::Stop, &mut board);
        assert_eq!((machine.state(), board.outputs().direction), once);
    }

    #[test]
    fn test_initial_state_is_stopped() {
        assert_eq!(StateMachine::new().state(), VehicleState::Stopped);
        assert_eq!(SpeedPercent::default().get(), 50);
    }

    #[test]
    fn test_speed_digits_to_duty() {
        for digit in 0..=9u8 {
            let speed = SpeedPercent::from_digit(digit).unwrap();
            assert_eq!(speed.get(), digit * 10);
            let expected = ((f32::from(digit) * 10.0 / 100.0) * 1023.0).round() as u16;
            assert_eq!(speed.duty(1023), expected);
        }
        assert_eq!(SpeedPercent::from_digit(3).unwrap().duty(1023), 307);
        assert_eq!(SpeedPercent::FULL.duty(1023), 1023);
        assert_eq!(SpeedPercent::ZERO.duty(1023), 0);
        assert!(SpeedPercent::from_digit(10).is_none());
    }

    #[test]
    fn test_speed_clamped() {
        assert_eq!(SpeedPercent::clamped(-20).get(), 0);
        assert_eq!(SpeedPercent::clamped(250).get(), 100);
        assert_eq!(SpeedPercent::clamped(42).get(), 42);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&VehicleState::ForwardLeft).unwrap();
        assert_eq!(json, "\"forward_left\"");
    }
}
