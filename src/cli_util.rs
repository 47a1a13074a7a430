use std::io::{self, Write};

use crate::error::BrainfuckError;

/// Bytes of source shown on either side of the faulting instruction.
const WINDOW_BYTES: usize = 32;

/// Pretty-print a runtime fault with a caret under the offending instruction.
/// If `program` is `Some("brainfuck")`, messages are prefixed with "brainfuck: ...".
pub fn print_runtime_error(program: Option<&str>, code: &[u8], err: &BrainfuckError) {
    let prefix_program = |msg: &str| {
        if let Some(p) = program {
            format!("{p}: {msg}")
        } else {
            msg.to_string()
        }
    };

    match err {
        BrainfuckError::MalformedProgram { ip, kind } => {
            let msg = prefix_program(&format!("Malformed program: {kind}"));
            print_error_with_context(&msg, code, *ip);
        }
        BrainfuckError::TapeBounds { ip, ptr, op } => {
            let msg = prefix_program(&format!(
                "Runtime error: pointer out of bounds (ptr={ptr}, op={op})"
            ));
            print_error_with_context(&msg, code, *ip);
        }
        BrainfuckError::Io { ip, source } => {
            let msg = prefix_program(&format!("I/O error: {source}"));
            print_error_with_context(&msg, code, *ip);
        }
        BrainfuckError::StepLimitExceeded { .. } | BrainfuckError::Canceled => {
            eprintln!("{err}");
            let _ = io::stderr().flush();
        }
    }
}

/// Print `prefix` with the instruction index, then the surrounding source and a caret line.
pub fn print_error_with_context(prefix: &str, code: &[u8], pos: usize) {
    eprintln!("{prefix} at instruction {pos}");
    let (window, caret) = render_context(code, pos);
    eprintln!("  {window}");
    eprintln!("  {caret}");
    let _ = io::stderr().flush();
}

/// Source window around `pos` and a matching caret line.
///
/// One output column per source byte: whitespace becomes a space and any other
/// non-printable or non-ASCII byte becomes `.`, so the caret always lines up.
pub fn render_context(code: &[u8], pos: usize) -> (String, String) {
    let start = pos.saturating_sub(WINDOW_BYTES).min(code.len());
    let end = (pos + WINDOW_BYTES + 1).min(code.len());

    let window: String = code[start..end]
        .iter()
        .map(|&b| match b {
            b if b.is_ascii_whitespace() => ' ',
            b if b.is_ascii_graphic() => b as char,
            _ => '.',
        })
        .collect();

    let mut caret = " ".repeat(pos.saturating_sub(start));
    caret.push('^');
    (window, caret)
}
