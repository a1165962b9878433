//! Runtime commands typed by the player

use std::str::FromStr;

use crate::config::parse_flag;
use crate::game::constants::limits;

/// A control or settings command, applied between loop iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start, or restart after a game over
    Start,
    /// End the current run without a crash
    Stop,
    /// Tilt threshold in degrees
    Sensitivity(u32),
    Speed(u32),
    /// Set inversion, or toggle it when no value is given
    Invert(Option<bool>),
    Quit,
}

fn ranged_arg(arg: Option<&str>, name: &str, min: u32, max: u32) -> Result<u32, String> {
    let raw = arg.ok_or_else(|| format!("{} needs a value ({}-{})", name, min, max))?;
    let value: u32 = raw
        .parse()
        .map_err(|_| format!("invalid {} '{}'", name, raw))?;
    if !(min..=max).contains(&value) {
        return Err(format!("{} must be {}-{}", name, min, max));
    }
    Ok(value)
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| "empty command".to_string())?;
        let arg = parts.next();

        match verb.to_ascii_lowercase().as_str() {
            "start" | "restart" | "play" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "sens" | "sensitivity" => ranged_arg(
                arg,
                "sensitivity",
                limits::SENSITIVITY_MIN,
                limits::SENSITIVITY_MAX,
            )
            .map(Command::Sensitivity),
            "speed" => ranged_arg(arg, "speed", limits::SPEED_MIN, limits::SPEED_MAX).map(Command::Speed),
            "invert" => match arg {
                None => Ok(Command::Invert(None)),
                Some(raw) => parse_flag(raw)
                    .map(|v| Command::Invert(Some(v)))
                    .ok_or_else(|| format!("invert takes on|off, got '{}'", raw)),
            },
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}
