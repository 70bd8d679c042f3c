// Hardware boundary for the car
//
// Provides:
// - Actuation interface (directional outputs, shared duty, horn, headlight)
// - Sensor lines sampled by the safety watchdog
// - In-memory simulated board for host runs and tests

mod simulated;

pub use simulated::{BoardOutputs, SensorHandle, SimulatedBoard, SimulatedSensors};

use crate::vehicle::DirectionPattern;

/// Write-side hardware interface
///
/// Writes are fire-and-forget: a GPIO/PWM layer has no failure mode the control
/// loop could act on.
pub trait Actuator {
    /// Set the four directional outputs
    fn set_direction(&mut self, pattern: DirectionPattern);

    /// Set the duty cycle on both drive sides
    fn set_duty(&mut self, duty: u16);

    fn set_horn(&mut self, on: bool);

    /// Current headlight level (read back from the output)
    fn headlight(&self) -> bool;

    fn set_headlight(&mut self, on: bool);

    /// Release the PWM outputs (only called during shutdown)
    fn release(&mut self);
}

/// Safety-relevant input lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLine {
    /// RF receiver data line: high while the remote is transmitting
    ControlSignal,
    /// Operator presence (eye) sensor: high while the operator is attentive
    OperatorPresent,
}

impl std::fmt::Display for SensorLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorLine::ControlSignal => write!(f, "control signal"),
            SensorLine::OperatorPresent => write!(f, "operator presence"),
        }
    }
}

/// Error types for sensor reads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to read {line} line: {reason}")]
    Read { line: SensorLine, reason: String },
}

/// Read-side hardware interface
pub trait SensorLines {
    /// Instantaneous (non-latched) level of a line; true = active
    fn read(&mut self, line: SensorLine) -> Result<bool, SensorError>;
}
