//! Line classification
//!
//! Every script line maps to exactly one [`Instruction`]. Classification is
//! pure and never fails: anything the engine cannot execute becomes
//! [`Instruction::Unrecognized`] and is reported as a warning at run time.

use std::fmt;

/// Keywords reserved for control flow the engine does not execute yet
pub const RESERVED_KEYWORDS: &[&str] = &[
    "wait_for",
    "cycle",
    "if",
    "throw",
    "log_start",
    "log_stop",
    "log",
];

/// Parsed form of one script line
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Blank,
    Comment,

    /// Delay; `None` when the duration could not be parsed
    Wait { seconds: Option<f64> },

    DeviceCommand(DeviceCommand),

    Unrecognized {
        raw: String,
        reason: UnrecognizedReason,
    },
}

/// `<device>.<command> [args...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub device: String,
    pub command: String,
    pub args: String,
}

/// Why a line was not understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnrecognizedReason {
    /// Control-flow keyword without engine support
    ReservedKeyword(String),
    /// Neither `wait` nor a device command
    NoInstruction,
}

impl Instruction {
    /// Whether the line does anything at run time
    ///
    /// Unrecognized lines count: they move the cursor and get a warning.
    pub fn is_executable(&self) -> bool {
        !matches!(self, Instruction::Blank | Instruction::Comment)
    }
}

impl DeviceCommand {
    /// Literal text handed to the gateway
    pub fn payload(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args)
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.payload())
    }
}

impl fmt::Display for UnrecognizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnrecognizedReason::ReservedKeyword(kw) => {
                write!(f, "'{}' is reserved and not supported", kw)
            }
            UnrecognizedReason::NoInstruction => write!(f, "not an instruction"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Blank => write!(f, "blank"),
            Instruction::Comment => write!(f, "comment"),
            Instruction::Wait { seconds: Some(s) } => write!(f, "wait {}s", s),
            Instruction::Wait { seconds: None } => write!(f, "wait (malformed duration)"),
            Instruction::DeviceCommand(cmd) => write!(f, "command {}", cmd),
            Instruction::Unrecognized { reason, .. } => write!(f, "unrecognized: {}", reason),
        }
    }
}

/// Classify a single script line
pub fn classify(line: &str) -> Instruction {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Instruction::Blank;
    }
    if trimmed.starts_with('#') {
        return Instruction::Comment;
    }

    if let Some(rest) = trimmed.strip_prefix("wait") {
        if rest.starts_with(char::is_whitespace) {
            return Instruction::Wait {
                seconds: parse_seconds(rest.trim()),
            };
        }
    }

    if let Some(keyword) = reserved_keyword(trimmed) {
        return unrecognized(trimmed, UnrecognizedReason::ReservedKeyword(keyword.to_string()));
    }

    // Any dotted line addresses a device. A malformed device part such as
    // `move alpha` or an empty one never matches a connected device, so the
    // run fails on it instead of skipping it.
    match trimmed.split_once('.') {
        Some((device, rest)) => {
            let (command, args) = match rest.split_once(char::is_whitespace) {
                Some((command, args)) => (command, args.trim_start()),
                None => (rest, ""),
            };

            Instruction::DeviceCommand(DeviceCommand {
                device: device.trim().to_string(),
                command: command.to_string(),
                args: args.to_string(),
            })
        }
        None => unrecognized(trimmed, UnrecognizedReason::NoInstruction),
    }
}

fn unrecognized(raw: &str, reason: UnrecognizedReason) -> Instruction {
    Instruction::Unrecognized {
        raw: raw.to_string(),
        reason,
    }
}

/// Finite, non-negative seconds
fn parse_seconds(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

/// Leading identifier, if it is a reserved keyword used as a statement
///
/// `log hello` and `if(x)` are reserved; `log.level 3` addresses a device
/// that happens to be named `log`.
fn reserved_keyword(trimmed: &str) -> Option<&'static str> {
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    let (word, rest) = trimmed.split_at(end);

    if rest.starts_with('.') {
        return None;
    }
    RESERVED_KEYWORDS.iter().copied().find(|kw| *kw == word)
}
