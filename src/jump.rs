//! Bracket matching by scanning the program text.
//!
//! There is no precomputed jump table: every taken branch rescans from the
//! bracket to its partner, counting nesting depth on the way.

use crate::error::{BrainfuckError, UnmatchedBracketKind};
use crate::program::Program;

/// Find the bracket matching the one at `from`.
///
/// A `[` scans forward and a `]` scans backward. The depth counter starts at
/// the direction's sign and the scan stops on the byte that brings it back to
/// zero, which is the partner bracket itself.
pub fn resolve_jump(program: &Program, from: usize) -> Result<usize, BrainfuckError> {
    let (dir, kind): (isize, _) = match program.fetch(from) {
        Some(b'[') => (1, UnmatchedBracketKind::Open),
        Some(b']') => (-1, UnmatchedBracketKind::Close),
        other => {
            return Err(BrainfuckError::MalformedProgram {
                ip: from,
                kind: UnmatchedBracketKind::NotABracket(other.map(char::from)),
            });
        }
    };

    let unmatched = || BrainfuckError::MalformedProgram { ip: from, kind };

    let mut depth = dir;
    let mut pos = from;
    while depth != 0 {
        pos = pos.checked_add_signed(dir).ok_or_else(unmatched)?;
        match program.fetch(pos) {
            Some(b'[') => depth += 1,
            Some(b']') => depth -= 1,
            Some(_) => {}
            None => return Err(unmatched()),
        }
    }

    Ok(pos)
}
