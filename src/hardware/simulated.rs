// In-memory board used when no GPIO/PWM layer is attached
//
// Outputs are recorded so they can be inspected; sensor lines are shared flags
// that can be driven from another task (or a test) through a SensorHandle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::{Actuator, SensorError, SensorLine, SensorLines};
use crate::vehicle::DirectionPattern;

/// Snapshot of every output level on the simulated board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardOutputs {
    pub direction: DirectionPattern,
    pub duty_left: u16,
    pub duty_right: u16,
    pub horn: bool,
    pub headlight: bool,
    pub released: bool,
}

/// Simulated actuation board
#[derive(Debug, Default)]
pub struct SimulatedBoard {
    outputs: BoardOutputs,
    horn_pulses: usize,
    duty_writes: Vec<u16>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> BoardOutputs {
        self.outputs
    }

    /// Number of low-to-high horn transitions so far
    pub fn horn_pulses(&self) -> usize {
        self.horn_pulses
    }

    /// Every duty value written, oldest first
    pub fn duty_writes(&self) -> &[u16] {
        &self.duty_writes
    }
}

impl Actuator for SimulatedBoard {
    fn set_direction(&mut self, pattern: DirectionPattern) {
        debug!("Direction outputs: {:?}", pattern.as_array());
        self.outputs.direction = pattern;
    }

    fn set_duty(&mut self, duty: u16) {
        debug!("Duty: {}", duty);
        self.outputs.duty_left = duty;
        self.outputs.duty_right = duty;
        self.duty_writes.push(duty);
    }

    fn set_horn(&mut self, on: bool) {
        if on && !self.outputs.horn {
            self.horn_pulses += 1;
        }
        self.outputs.horn = on;
    }

    fn headlight(&self) -> bool {
        self.outputs.headlight
    }

    fn set_headlight(&mut self, on: bool) {
        debug!("Headlight: {}", if on { "on" } else { "off" });
        self.outputs.headlight = on;
    }

    fn release(&mut self) {
        info!("Releasing PWM outputs");
        self.outputs.duty_left = 0;
        self.outputs.duty_right = 0;
        self.outputs.released = true;
    }
}

#[derive(Debug, Default)]
struct LineState {
    control: AtomicBool,
    operator: AtomicBool,
    faulty: AtomicBool,
}

/// Simulated sensor lines
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensors {
    lines: Arc<LineState>,
}

/// Drives the levels of a SimulatedSensors instance
#[derive(Debug, Clone)]
pub struct SensorHandle {
    lines: Arc<LineState>,
}

impl SimulatedSensors {
    /// Both lines start inactive
    pub fn new() -> Self {
        Self::default()
    }

    /// Both lines held active
    pub fn held_active() -> Self {
        let sensors = Self::new();
        sensors.handle().set_all(true);
        sensors
    }

    pub fn handle(&self) -> SensorHandle {
        SensorHandle {
            lines: Arc::clone(&self.lines),
        }
    }
}

impl SensorHandle {
    pub fn set(&self, line: SensorLine, active: bool) {
        let flag = match line {
            SensorLine::ControlSignal => &self.lines.control,
            SensorLine::OperatorPresent => &self.lines.operator,
        };
        flag.store(active, Ordering::Relaxed);
    }

    pub fn set_all(&self, active: bool) {
        self.set(SensorLine::ControlSignal, active);
        self.set(SensorLine::OperatorPresent, active);
    }

    /// Make every read fail until cleared
    pub fn set_faulty(&self, faulty: bool) {
        self.lines.faulty.store(faulty, Ordering::Relaxed);
    }
}

impl SensorLines for SimulatedSensors {
    fn read(&mut self, line: SensorLine) -> Result<bool, SensorError> {
        if self.lines.faulty.load(Ordering::Relaxed) {
            return Err(SensorError::Read {
                line,
                reason: "injected fault".to_string(),
            });
        }
        let level = match line {
            SensorLine::ControlSignal => self.lines.control.load(Ordering::Relaxed),
            SensorLine::OperatorPresent => self.lines.operator.load(Ordering::Relaxed),
        };
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horn_pulses_count_rising_edges() {
        let mut board = SimulatedBoard::new();
        board.set_horn(true);
        board.set_horn(true);
        board.set_horn(false);
        board.set_horn(false);
        board.set_horn(true);
        assert_eq!(board.horn_pulses(), 2);
    }

    #[test]
    fn test_duty_is_shared() {
        let mut board = SimulatedBoard::new();
        board.set_duty(512);
        assert_eq!(board.outputs().duty_left, 512);
        assert_eq!(board.outputs().duty_right, 512);
        assert_eq!(board.duty_writes(), &[512]);
    }

    #[test]
    fn test_sensor_handle_drives_lines() {
        let mut sensors = SimulatedSensors::new();
        let handle = sensors.handle();
        assert_eq!(sensors.read(SensorLine::ControlSignal), Ok(false));

        handle.set(SensorLine::ControlSignal, true);
        assert_eq!(sensors.read(SensorLine::ControlSignal), Ok(true));
        assert_eq!(sensors.read(SensorLine::OperatorPresent), Ok(false));

        handle.set_faulty(true);
        assert!(sensors.read(SensorLine::ControlSignal).is_err());
    }

    #[test]
    fn test_held_active() {
        let mut sensors = SimulatedSensors::held_active();
        assert_eq!(sensors.read(SensorLine::OperatorPresent), Ok(true));
    }
}
