//! A small Brainfuck interpreter.
//!
//! Programs run straight from their source bytes against a fixed-size tape of
//! `u8` cells (30,000 by default) with a single data pointer.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; cells wrap modulo 256.
//! - Any byte outside `><+-.,[]` is a comment.
//! - Loops are matched on demand by scanning for the partner bracket with a
//!   nesting counter. An unmatched bracket is a `MalformedProgram` fault when
//!   its branch is taken.
//! - Moving the pointer off the tape either faults or wraps, per [`BoundsPolicy`].
//! - Input `,` reads one byte; at end of input the cell follows [`EofPolicy`].
//! - Output `.` writes the current cell as one raw byte. A normal halt writes a
//!   trailing newline.
//!
//! Quick start:
//!
//! ```no_run
//! use brainfuck::{BoundsPolicy, Interpreter, Program, Tape};
//!
//! let program = Program::load("hello.bf").expect("readable source");
//! let tape = Tape::new(30_000, BoundsPolicy::Error).expect("non-zero size");
//! let mut bf = Interpreter::new(program, tape, std::io::stdin(), std::io::stdout());
//! bf.run().expect("program should run");
//! ```

pub mod cli_util;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod jump;
pub mod program;
pub mod tape;

pub use config::Settings;
pub use error::{BrainfuckError, ConfigError, LoadError, UnmatchedBracketKind};
pub use interpreter::{EofPolicy, Halted, Interpreter, State, StepControl};
pub use jump::resolve_jump;
pub use program::{Op, Program};
pub use tape::{BoundsPolicy, Tape, DEFAULT_TAPE_SIZE};
