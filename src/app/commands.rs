//! Inbound interactive commands.
//!
//! One command per console line, interpreted by the
//! [`CommandDispatcher`](super::dispatcher::CommandDispatcher).

use std::str::FromStr;

use crate::error::InputParseError;

/// Commands accepted on the interactive console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Cancel telemetry if running and leave the loop.
    Exit,
    /// Toggle the external device (LED line).
    Fan,
    /// Print the status block.
    Status,
    /// Prompt for a new telemetry send interval.
    Rate,
    /// Toggle the telemetry sampler.
    Send,
    /// Toggle the PWM ramp.
    Pulse,
}

impl AppCommand {
    /// Every command, in the order shown by the prompt.
    pub const ALL: [Self; 6] = [
        Self::Status,
        Self::Fan,
        Self::Pulse,
        Self::Send,
        Self::Rate,
        Self::Exit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Fan => "fan",
            Self::Status => "status",
            Self::Rate => "rate",
            Self::Send => "send",
            Self::Pulse => "pulse",
        }
    }
}

impl FromStr for AppCommand {
    type Err = InputParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == word)
            .ok_or_else(|| InputParseError {
                input: word.to_string(),
                expected: "a command",
            })
    }
}
