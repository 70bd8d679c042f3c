// Command token alphabet shared by the serial and HTTP transports
//
// Tokens are case-sensitive. Single characters cover everything except the
// headlight toggle, which is the only multi-character token.

use std::str::FromStr;

use crate::vehicle::{Directive, SpeedPercent};

/// Token that sets speed to 100 percent
pub const FULL_SPEED_TOKEN: &str = "q";

/// Token that toggles the headlight
pub const LIGHT_TOKEN: &str = "LIGHT";

/// Parsed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Motion or stop directive (motors only)
    Motion(Directive),
    /// Pulse the horn
    HornOn,
    /// Horn off immediately
    HornOff,
    ToggleLight,
    /// Stop motors and zero the speed
    EmergencyStop,
    SetSpeed(SpeedPercent),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0:?}")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let command = match token {
            "F" => Command::Motion(Directive::Forward),
            "B" => Command::Motion(Directive::Backward),
            "L" => Command::Motion(Directive::Left),
            "R" => Command::Motion(Directive::Right),
            "G" => Command::Motion(Directive::ForwardLeft),
            "I" => Command::Motion(Directive::ForwardRight),
            "H" => Command::Motion(Directive::BackLeft),
            "J" => Command::Motion(Directive::BackRight),
            "S" => Command::Motion(Directive::Stop),
            "V" => Command::HornOn,
            "v" => Command::HornOff,
            LIGHT_TOKEN => Command::ToggleLight,
            "D" => Command::EmergencyStop,
            FULL_SPEED_TOKEN => Command::SetSpeed(SpeedPercent::FULL),
            _ => match token.as_bytes() {
                [digit @ b'0'..=b'9'] => SpeedPercent::from_digit(digit - b'0')
                    .map(Command::SetSpeed)
                    .ok_or_else(|| CommandError::Unknown(token.to_string()))?,
                _ => return Err(CommandError::Unknown(token.to_string())),
            },
        };
        Ok(command)
    }
}
