// Command interpreter: turns tokens into state transitions and accessory actions
//
// Owns the motion state machine, the speed setting and the actuator. The horn
// pulse is awaited in place, so whoever drives the controller (the event loop)
// stalls for the pulse length.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::hardware::Actuator;
use crate::vehicle::{SpeedPercent, StateMachine, VehicleState};

/// Result of handling one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Empty or whitespace-only token
    Ignored,
    Applied(Command),
    Unknown,
}

/// State/speed report emitted after every applied command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: VehicleState,
    pub speed_percent: SpeedPercent,
}

impl StatusReport {
    /// Compact JSON form used as a structured log field
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub struct Controller<A: Actuator> {
    actuator: A,
    machine: StateMachine,
    speed: SpeedPercent,
    max_duty: u16,
    horn_pulse: Duration,
}

impl<A: Actuator> Controller<A> {
    /// Create a controller: STOPPED, all direction outputs low, default speed pushed
    pub fn new(mut actuator: A, config: &Config) -> Self {
        let speed = SpeedPercent::clamped(i32::from(config.default_speed));
        let mut machine = StateMachine::new();
        machine.force_stop(&mut actuator);
        actuator.set_duty(speed.duty(config.max_duty));

        Self {
            actuator,
            machine,
            speed,
            max_duty: config.max_duty,
            horn_pulse: config.horn_pulse,
        }
    }

    pub fn state(&self) -> VehicleState {
        self.machine.state()
    }

    pub fn speed(&self) -> SpeedPercent {
        self.speed
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            state: self.machine.state(),
            speed_percent: self.speed,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Handle one raw token from any transport
    pub async fn handle(&mut self, token: &str) -> Dispatch {
        let token = token.trim();
        if token.is_empty() {
            return Dispatch::Ignored;
        }

        let command = match token.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                return Dispatch::Unknown;
            }
        };

        self.execute(command).await;

        let status = self.status();
        info!(
            status = %status.to_json(),
            "State: {:?} Speed: {}",
            status.state,
            status.speed_percent.get()
        );
        Dispatch::Applied(command)
    }

    /// Execute an already-parsed command
    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::Motion(directive) => {
                self.machine.apply(directive, &mut self.actuator);
            }
            Command::HornOn => self.pulse_horn().await,
            Command::HornOff => self.actuator.set_horn(false),
            Command::ToggleLight => {
                let on = !self.actuator.headlight();
                self.actuator.set_headlight(on);
            }
            Command::EmergencyStop => {
                self.machine.force_stop(&mut self.actuator);
                self.set_speed(SpeedPercent::ZERO);
                warn!("EMERGENCY STOP: all stopped and duty zeroed");
            }
            Command::SetSpeed(speed) => {
                self.set_speed(speed);
                info!("Speed set to {}%", speed.get());
            }
        }
    }

    /// Force STOPPED without touching the speed setting
    pub fn force_stop(&mut self) {
        self.machine.force_stop(&mut self.actuator);
    }

    /// Horn high for the pulse length, then low
    pub async fn pulse_horn(&mut self) {
        self.actuator.set_horn(true);
        tokio::time::sleep(self.horn_pulse).await;
        self.actuator.set_horn(false);
    }

    /// Stop, zero duty and release the outputs, returning the actuator
    pub fn shutdown(mut self) -> A {
        self.machine.force_stop(&mut self.actuator);
        self.actuator.set_duty(0);
        self.actuator.set_horn(false);
        self.actuator.release();
        self.actuator
    }

    fn set_speed(&mut self, speed: SpeedPercent) {
        self.speed = speed;
        self.actuator.set_duty(speed.duty(self.max_duty));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedBoard;
    use crate::vehicle::Directive;
    use tokio::time::Instant;

    fn controller() -> Controller<SimulatedBoard> {
        Controller::new(SimulatedBoard::new(), &Config::default())
    }

    #[tokio::test]
    async fn test_boot_state() {
        let ctl = controller();
        assert_eq!(ctl.state(), VehicleState::Stopped);
        assert_eq!(ctl.speed().get(), 50);
        let outputs = ctl.actuator().outputs();
        assert_eq!(outputs.duty_left, 512);
        assert_eq!(outputs.direction.as_array(), [false; 4]);
    }

    #[tokio::test]
    async fn test_motion_tokens_drive_state() {
        let mut ctl = controller();
        assert_eq!(
            ctl.handle("F").await,
            Dispatch::Applied(Command::Motion(Directive::Forward))
        );
        assert_eq!(ctl.state(), VehicleState::Forward);
        assert_eq!(
            ctl.actuator().outputs().direction.as_array(),
            [true, false, true, false]
        );

        ctl.handle("J").await;
        assert_eq!(ctl.state(), VehicleState::BackRight);

        ctl.handle("S").await;
        assert_eq!(ctl.state(), VehicleState::Stopped);
        // Stop leaves the speed alone
        assert_eq!(ctl.speed().get(), 50);
    }

    #[tokio::test]
    async fn test_speed_tokens() {
        let mut ctl = controller();
        for digit in 0..=9u8 {
            let token = char::from(b'0' + digit).to_string();
            ctl.handle(&token).await;
            assert_eq!(ctl.speed().get(), digit * 10);
            assert_eq!(
                ctl.actuator().outputs().duty_left,
                SpeedPercent::clamped(i32::from(digit) * 10).duty(1023)
            );
        }
        ctl.handle("q").await;
        assert_eq!(ctl.speed().get(), 100);
        assert_eq!(ctl.actuator().outputs().duty_right, 1023);
    }

    #[tokio::test]
    async fn test_emergency_stop_idempotent() {
        let mut ctl = controller();
        ctl.handle("F").await;
        ctl.handle("D").await;
        let once = (ctl.status(), ctl.actuator().outputs());
        ctl.handle("D").await;
        assert_eq!((ctl.status(), ctl.actuator().outputs()), once);
        assert_eq!(ctl.state(), VehicleState::Stopped);
        assert_eq!(ctl.speed(), SpeedPercent::ZERO);
        assert_eq!(ctl.actuator().outputs().duty_left, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_blank_tokens() {
        let mut ctl = controller();
        ctl.handle("B").await;
        let before = ctl.status();
        let writes = ctl.actuator().duty_writes().len();

        assert_eq!(ctl.handle("X").await, Dispatch::Unknown);
        assert_eq!(ctl.handle("   ").await, Dispatch::Ignored);
        assert_eq!(ctl.handle("").await, Dispatch::Ignored);

        assert_eq!(ctl.status(), before);
        assert_eq!(ctl.actuator().duty_writes().len(), writes);
    }

    #[tokio::test]
    async fn test_token_whitespace_trimmed() {
        let mut ctl = controller();
        assert_eq!(
            ctl.handle(" L\r\n").await,
            Dispatch::Applied(Command::Motion(Directive::Left))
        );
    }

    #[tokio::test]
    async fn test_light_toggles() {
        let mut ctl = controller();
        ctl.handle("LIGHT").await;
        assert!(ctl.actuator().outputs().headlight);
        ctl.handle("LIGHT").await;
        assert!(!ctl.actuator().outputs().headlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_horn_pulse_blocks_for_pulse_length() {
        let mut ctl = controller();
        let start = Instant::now();
        ctl.handle("V").await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(ctl.actuator().horn_pulses(), 1);
        assert!(!ctl.actuator().outputs().horn);

        ctl.handle("v").await;
        assert!(!ctl.actuator().outputs().horn);
        assert_eq!(ctl.actuator().horn_pulses(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_outputs() {
        let mut ctl = controller();
        ctl.handle("F").await;
        let board = ctl.shutdown();
        let outputs = board.outputs();
        assert_eq!(outputs.direction.as_array(), [false; 4]);
        assert_eq!(outputs.duty_left, 0);
        assert!(outputs.released);
    }

    #[test]
    fn test_status_report_json() {
        let report = StatusReport {
            state: VehicleState::BackLeft,
            speed_percent: SpeedPercent::clamped(30),
        };
        assert_eq!(
            report.to_json(),
            r#"{"state":"back_left","speed_percent":30}"#
        );
    }

    #[tokio::test]
    async fn test_status_after_dispatch() {
        let mut ctl = controller();
        ctl.handle("I").await;
        ctl.handle("8").await;
        assert_eq!(
            ctl.status().to_json(),
            r#"{"state":"forward_right","speed_percent":80}"#
        );
    }
}
