//! `breq check`: classify every line without running anything

use breq_script::{Instruction, Script};

/// Classification report for a script
pub struct CheckReport {
    pub lines: Vec<String>,
    pub executable: usize,
    /// Lines that are sure to warn, be rejected or fail the run
    pub problems: usize,
}

pub fn check(script: &Script) -> CheckReport {
    let mut lines = Vec::with_capacity(script.len());
    let mut executable = 0;
    let mut problems = 0;

    for (index, instruction) in script.instructions() {
        if instruction.is_executable() {
            executable += 1;
        }
        if is_problem(&instruction) {
            problems += 1;
        }

        let raw = script.line(index).unwrap_or_default().trim();
        lines.push(format!("{:>4}  {:<32}  {}", index + 1, raw, instruction));
    }

    CheckReport {
        lines,
        executable,
        problems,
    }
}

fn is_problem(instruction: &Instruction) -> bool {
    match instruction {
        Instruction::Unrecognized { .. } | Instruction::Wait { seconds: None } => true,
        // No registered device can be named like this
        Instruction::DeviceCommand(cmd) => {
            cmd.device.is_empty()
                || cmd.device.contains(char::is_whitespace)
                || cmd.command.is_empty()
        }
        _ => false,
    }
}
