//! The execution engine.
//!
//! Behaviors:
//! - Instructions are fetched straight from the program bytes; anything that is
//!   not one of `><+-.,[]` is skipped as a comment.
//! - `[` and `]` find their partner with [`resolve_jump`] each time the branch is
//!   taken. A program with an unmatched bracket only faults if that branch runs.
//! - Output is flushed before every `,` and when the run ends. A normal halt
//!   appends one newline, except in debug mode where the table is the output.
//! - `,` at end of input follows the [`EofPolicy`] (default: store 0).
//! - The dispatch loop is iterative, so long-running or deeply nested loops do
//!   not grow the call stack.
//!
//! ```
//! use brainfuck::{BoundsPolicy, Interpreter, Program, Tape};
//!
//! let program = Program::from("++++++++[>++++++++<-]>.");
//! let tape = Tape::new(2, BoundsPolicy::Error).unwrap();
//! let mut out = Vec::new();
//! let mut bf = Interpreter::new(program, tape, std::io::empty(), &mut out);
//! bf.run().unwrap();
//! drop(bf);
//! assert_eq!(out, vec![64, b'\n']);
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::{BrainfuckError, ConfigError};
use crate::jump::resolve_jump;
use crate::program::{Op, Program};
use crate::tape::Tape;

/// Cells shown per row in the debug table.
const TRACE_WINDOW: usize = 8;

/// What `,` stores when the input is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofPolicy {
    /// Set the current cell to 0.
    #[default]
    Zero,
    /// Leave the current cell as it was.
    Unchanged,
}

impl FromStr for EofPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EofPolicy::Zero),
            "unchanged" | "keep" => Ok(EofPolicy::Unchanged),
            _ => Err(ConfigError::InvalidPolicy {
                what: "eof",
                value: s.to_string(),
                expected: "zero, unchanged",
            }),
        }
    }
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofPolicy::Zero => write!(f, "zero"),
            EofPolicy::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Debug, Default)]
pub struct StepControl {
    pub max_steps: Option<u64>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<u64>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }
}

/// Result of a single [`Interpreter::step`]. A fault is reported as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// Summary of a run that reached the end of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted {
    /// Bytes dispatched, comments included.
    pub cycles: u64,
}

pub struct Interpreter<R, W> {
    program: Program,
    tape: Tape,
    ip: usize,
    input: R,
    output: W,
    eof: EofPolicy,
    control: Option<StepControl>,
    debug: bool,
    cycles: u64,
}

impl<R: Read, W: Write> Interpreter<R, W> {
    pub fn new(program: Program, tape: Tape, input: R, output: W) -> Self {
        Self {
            program,
            tape,
            ip: 0,
            input,
            output,
            eof: EofPolicy::default(),
            control: None,
            debug: false,
            cycles: 0,
        }
    }

    pub fn with_eof_policy(mut self, eof: EofPolicy) -> Self {
        self.eof = eof;
        self
    }

    pub fn with_step_control(mut self, control: StepControl) -> Self {
        self.control = Some(control);
        self
    }

    /// In debug mode the output receives a step-by-step table instead of program I/O:
    /// - `.` is described rather than written
    /// - `,` does not read; it behaves as if input were exhausted
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Execute the instruction at the instruction pointer.
    pub fn step(&mut self) -> Result<State, BrainfuckError> {
        let Some(byte) = self.program.fetch(self.ip) else {
            return Ok(State::Halted);
        };

        if let Some(ctrl) = self.control.as_ref() {
            if ctrl.cancel_flag.load(Ordering::Relaxed) {
                return Err(BrainfuckError::Canceled);
            }
            if let Some(limit) = ctrl.max_steps {
                if self.cycles >= limit {
                    return Err(BrainfuckError::StepLimitExceeded { limit });
                }
            }
        }

        let ip = self.ip;
        let op = Op::decode(byte);
        let (ptr_before, cell_before) = (self.tape.pointer(), self.tape.get());
        let mut action: Option<String> = (self.debug && op.is_some()).then(String::new);

        match op {
            Some(Op::Right) => {
                let ptr = self.tape.move_right(ip)?;
                if let Some(a) = action.as_mut() {
                    *a = format!("Moved pointer head to index {ptr}");
                }
            }
            Some(Op::Left) => {
                let ptr = self.tape.move_left(ip)?;
                if let Some(a) = action.as_mut() {
                    *a = format!("Moved pointer head to index {ptr}");
                }
            }
            Some(Op::Inc) => {
                let after = self.tape.increment();
                if let Some(a) = action.as_mut() {
                    *a = format!("Increment cell[{ptr_before}] from {cell_before} to {after}");
                }
            }
            Some(Op::Dec) => {
                let after = self.tape.decrement();
                if let Some(a) = action.as_mut() {
                    *a = format!("Decrement cell[{ptr_before}] from {cell_before} to {after}");
                }
            }
            Some(Op::Output) => {
                if let Some(a) = action.as_mut() {
                    *a = format!("Output byte {cell_before} (suppressed in debug)");
                } else {
                    self.output
                        .write_all(&[cell_before])
                        .map_err(|source| BrainfuckError::Io { ip, source })?;
                }
            }
            Some(Op::Input) => {
                if let Some(a) = action.as_mut() {
                    self.store_eof();
                    let cell = self.tape.get();
                    *a = format!("Read byte -> simulated EOF ({}), cell is {cell}", self.eof);
                } else {
                    self.read_into_cell(ip)?;
                }
            }
            Some(Op::LoopStart) => {
                if cell_before == 0 {
                    let target = resolve_jump(&self.program, ip)?;
                    log::trace!("jump forward {ip} -> {target}");
                    if let Some(a) = action.as_mut() {
                        *a = format!("Cell is 0; jump forward to matching ']' at IP {target}");
                    }
                    self.ip = target;
                } else if let Some(a) = action.as_mut() {
                    *a = "Enter loop (cell != 0)".to_string();
                }
            }
            Some(Op::LoopEnd) => {
                if cell_before != 0 {
                    let target = resolve_jump(&self.program, ip)?;
                    log::trace!("jump back {ip} -> {target}");
                    if let Some(a) = action.as_mut() {
                        *a = format!("Cell != 0; jump back to matching '[' at IP {target}");
                    }
                    self.ip = target;
                } else if let Some(a) = action.as_mut() {
                    *a = "Exit loop (cell is 0)".to_string();
                }
            }
            None => {}
        }

        if let (Some(action), Some(op)) = (action, op) {
            let window = self.render_tape_window();
            writeln!(
                self.output,
                "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {:<52} | {}",
                self.cycles,
                ip,
                ptr_before,
                cell_before,
                op.as_char(),
                action,
                window
            )
            .map_err(|source| BrainfuckError::Io { ip, source })?;
        }

        self.cycles += 1;
        // A taken jump leaves ip on the partner bracket; this moves past it.
        self.ip += 1;
        Ok(State::Running)
    }

    /// Execute until the end of the program or the first fault.
    ///
    /// Returns a [`Halted`] summary on success. The trailing newline is only
    /// written on success and never after a debug table; pending output is
    /// flushed either way.
    pub fn run(&mut self) -> Result<Halted, BrainfuckError> {
        if self.debug {
            self.write_debug_header()
                .map_err(|source| BrainfuckError::Io { ip: self.ip, source })?;
        }

        loop {
            match self.step() {
                Ok(State::Running) => {}
                Ok(State::Halted) => break,
                Err(err) => {
                    if let Err(e) = self.output.flush() {
                        log::debug!("flush after fault failed: {e}");
                    }
                    log::debug!("faulted after {} cycles: {err}", self.cycles);
                    return Err(err);
                }
            }
        }

        let ip = self.ip;
        if !self.debug {
            self.output
                .write_all(b"\n")
                .map_err(|source| BrainfuckError::Io { ip, source })?;
        }
        self.output
            .flush()
            .map_err(|source| BrainfuckError::Io { ip, source })?;

        log::debug!("halted after {} cycles", self.cycles);
        Ok(Halted { cycles: self.cycles })
    }

    fn write_debug_header(&mut self) -> io::Result<()> {
        writeln!(
            self.output,
            "STEP | IP  | PTR | CELL | INSTR | {:<52} | TAPE",
            "ACTION"
        )?;
        writeln!(
            self.output,
            "-----+-----+-----+------+-------+-{}-+-{}",
            "-".repeat(52),
            "-".repeat(TRACE_WINDOW * 4 + 8)
        )
    }

    /// The block of cells around the data pointer, e.g. `8: 0 [3] 0 0`.
    fn render_tape_window(&self) -> String {
        let (base, cells) = self.tape.window(TRACE_WINDOW);
        let cells: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if base + i == self.tape.pointer() {
                    format!("[{cell}]")
                } else {
                    cell.to_string()
                }
            })
            .collect();
        format!("{base}: {}", cells.join(" "))
    }

    fn read_into_cell(&mut self, ip: usize) -> Result<(), BrainfuckError> {
        // Anything already printed must be visible before we block on input.
        self.output
            .flush()
            .map_err(|source| BrainfuckError::Io { ip, source })?;

        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => {
                    self.store_eof();
                    return Ok(());
                }
                Ok(_) => {
                    self.tape.set(buf[0]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(BrainfuckError::Io { ip, source }),
            }
        }
    }

    fn store_eof(&mut self) {
        match self.eof {
            EofPolicy::Zero => self.tape.set(0),
            EofPolicy::Unchanged => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnmatchedBracketKind;
    use crate::tape::BoundsPolicy;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn interpreter(
        code: &str,
        memory: usize,
        input: &[u8],
    ) -> Interpreter<Cursor<Vec<u8>>, Vec<u8>> {
        let tape = Tape::new(memory, BoundsPolicy::Error).unwrap();
        Interpreter::new(Program::from(code), tape, Cursor::new(input.to_vec()), Vec::new())
    }

    #[test]
    fn eight_times_eight_outputs_64() {
        let mut bf = interpreter("++++++++[>++++++++<-]>.", 2, b"");
        bf.run().unwrap();
        assert_eq!(bf.output(), &vec![64, b'\n']);
        assert_eq!(bf.tape().cells(), &[0, 64]);
    }

    #[test]
    fn hello_world() {
        let code = "
            >++++++++[<+++++++++>-]<.
            >++++[<+++++++>-]<+.
            +++++++..
            +++.
            >>++++++[<+++++++>-]<++.
            ------------.
            >++++++[<+++++++++>-]<+.
            <.
            +++.
            ------.
            --------.
            >>>++++[<++++++++>-]<+.
        ";
        let mut bf = interpreter(code, 30_000, b"");
        bf.run().unwrap();
        assert_eq!(String::from_utf8_lossy(bf.output()), "Hello, World!\n");
    }

    #[test]
    fn comment_bytes_are_ignored() {
        let mut bf = interpreter("add + and + then print .", 1, b"");
        bf.run().unwrap();
        assert_eq!(bf.output(), &vec![2, b'\n']);
    }

    #[test]
    fn increments_wrap_modulo_256() {
        for n in [0usize, 1, 255, 256, 257, 1000] {
            let mut bf = interpreter(&"+".repeat(n), 1, b"");
            bf.run().unwrap();
            assert_eq!(bf.tape().get() as usize, n % 256, "after {n} increments");
        }
    }

    #[test]
    fn decrement_from_zero_wraps() {
        let mut bf = interpreter("-", 1, b"");
        bf.run().unwrap();
        assert_eq!(bf.tape().get(), 255);
    }

    #[test]
    fn deeply_nested_loops_run() {
        let depth = 200;
        // Enter every level with cell 1, clear it at the bottom, then fall through every ']'.
        let code = format!("+{}-{}", "[".repeat(depth), "]".repeat(depth));
        let mut bf = interpreter(&code, 1, b"");
        bf.run().unwrap();
        assert_eq!(bf.tape().get(), 0);

        // With cell 0 the outermost '[' skips the whole nest.
        let code = format!("{}+{}.", "[".repeat(depth), "]".repeat(depth));
        let mut bf = interpreter(&code, 1, b"");
        bf.run().unwrap();
        assert_eq!(bf.output(), &vec![0, b'\n']);
    }

    #[test]
    fn infinite_loop_hits_step_limit() {
        let ctrl = StepControl::new(Some(10_000), Arc::new(AtomicBool::new(false)));
        let mut bf = interpreter("+[]", 1, b"").with_step_control(ctrl);
        let err = bf.run().unwrap_err();
        assert!(matches!(err, BrainfuckError::StepLimitExceeded { limit: 10_000 }));
        assert_eq!(bf.cycles(), 10_000);
        assert!(bf.output().is_empty());
    }

    #[test]
    fn exact_step_limit_still_halts() {
        let ctrl = StepControl::new(Some(3), Arc::new(AtomicBool::new(false)));
        let mut bf = interpreter("+++", 1, b"").with_step_control(ctrl);
        assert_eq!(bf.run().unwrap(), Halted { cycles: 3 });
    }

    #[test]
    fn cancel_flag_stops_execution() {
        let ctrl = StepControl::new(None, Arc::new(AtomicBool::new(true)));
        let mut bf = interpreter("+", 1, b"").with_step_control(ctrl);
        assert!(matches!(bf.run(), Err(BrainfuckError::Canceled)));
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn unmatched_open_bracket_is_malformed() {
        let mut bf = interpreter("[", 10, b"");
        let err = bf.run().unwrap_err();
        assert!(matches!(
            err,
            BrainfuckError::MalformedProgram { ip: 0, kind: UnmatchedBracketKind::Open }
        ));
        assert!(bf.output().is_empty());
    }

    #[test]
    fn unmatched_close_bracket_is_malformed_when_taken() {
        let mut bf = interpreter("+]", 10, b"");
        let err = bf.run().unwrap_err();
        assert!(matches!(
            err,
            BrainfuckError::MalformedProgram { ip: 1, kind: UnmatchedBracketKind::Close }
        ));
    }

    #[test]
    fn untaken_unmatched_bracket_is_not_checked() {
        let mut bf = interpreter("]+[", 10, b"");
        assert!(bf.run().is_ok());
        assert_eq!(bf.tape().get(), 1);
    }

    #[test]
    fn right_past_single_cell_faults_under_error_policy() {
        let mut bf = interpreter(">+", 1, b"");
        let err = bf.run().unwrap_err();
        assert!(matches!(err, BrainfuckError::TapeBounds { ip: 0, ptr: 0, op: '>' }));
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn right_past_single_cell_wraps_under_wrap_policy() {
        let tape = Tape::new(1, BoundsPolicy::Wrap).unwrap();
        let mut bf = Interpreter::new(Program::from(">+"), tape, io::empty(), Vec::new());
        bf.run().unwrap();
        assert_eq!(bf.tape().cells(), &[1]);
    }

    #[test]
    fn left_of_zero_faults() {
        let mut bf = interpreter("<", 10, b"");
        assert!(matches!(bf.run(), Err(BrainfuckError::TapeBounds { op: '<', .. })));
    }

    #[test]
    fn input_is_echoed() {
        let mut bf = interpreter(",.,.", 1, b"Zq");
        bf.run().unwrap();
        assert_eq!(bf.output(), b"Zq\n");
    }

    #[test]
    fn eof_sets_zero_by_default() {
        let mut bf = interpreter("+++,", 1, b"");
        bf.run().unwrap();
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn eof_can_leave_cell_unchanged() {
        let mut bf = interpreter("+++,", 1, b"").with_eof_policy(EofPolicy::Unchanged);
        bf.run().unwrap();
        assert_eq!(bf.tape().get(), 3);
    }

    #[test]
    fn output_is_flushed_before_input_is_read() {
        struct Recorder {
            pending: Vec<u8>,
            flushed: Rc<RefCell<Vec<u8>>>,
        }
        impl Write for Recorder {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.pending.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                self.flushed.borrow_mut().append(&mut self.pending);
                Ok(())
            }
        }

        struct Snoop {
            flushed: Rc<RefCell<Vec<u8>>>,
            seen: Rc<RefCell<Vec<u8>>>,
        }
        impl Read for Snoop {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                *self.seen.borrow_mut() = self.flushed.borrow().clone();
                buf[0] = b'!';
                Ok(1)
            }
        }

        let flushed = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let out = Recorder { pending: Vec::new(), flushed: flushed.clone() };
        let input = Snoop { flushed: flushed.clone(), seen: seen.clone() };

        let tape = Tape::new(1, BoundsPolicy::Error).unwrap();
        let mut bf = Interpreter::new(Program::from("+++.,."), tape, input, out);
        bf.run().unwrap();

        assert_eq!(*seen.borrow(), vec![3]);
        assert_eq!(*flushed.borrow(), vec![3, b'!', b'\n']);
    }

    #[test]
    fn step_reports_running_then_halted() {
        let mut bf = interpreter("+>", 2, b"");
        assert_eq!(bf.step().unwrap(), State::Running);
        assert_eq!((bf.ip(), bf.tape().get()), (1, 1));
        assert_eq!(bf.step().unwrap(), State::Running);
        assert_eq!(bf.tape().pointer(), 1);
        assert_eq!(bf.step().unwrap(), State::Halted);
        assert_eq!(bf.cycles(), 2);
    }

    #[test]
    fn taken_jump_lands_on_partner_bracket() {
        let mut bf = interpreter("[+]-", 1, b"");
        bf.step().unwrap();
        // Landed on ']' at 2, then advanced past it.
        assert_eq!(bf.ip(), 3);
    }

    #[test]
    fn cycles_count_comments() {
        let mut bf = interpreter("a+b", 1, b"");
        assert_eq!(bf.run().unwrap().cycles, 3);
    }

    #[test]
    fn debug_mode_prints_table_instead_of_output() {
        let mut bf = interpreter(">+.,", 2, b"x").with_debug(true);
        bf.run().unwrap();
        let out = String::from_utf8(bf.output().clone()).unwrap();
        assert!(out.starts_with("STEP | IP"));
        assert!(out.contains("Moved pointer head to index 1"));
        assert!(out.contains("Increment cell[1] from 0 to 1"));
        assert!(out.contains("suppressed in debug"));
        assert!(out.contains("simulated EOF"));
        assert!(out.contains("0: 0 [1]"));
        assert_eq!(bf.tape().get(), 0);
    }

    #[test]
    fn debug_table_shows_tape_window_and_no_trailing_newline() {
        let mut bf = interpreter(&format!("{}+", ">".repeat(9)), 12, b"").with_debug(true);
        bf.run().unwrap();
        let out = String::from_utf8(bf.output().clone()).unwrap();
        let last = out.lines().last().unwrap();
        assert!(last.contains("Increment cell[9] from 0 to 1"), "{last}");
        assert!(last.ends_with("| 8: 0 [1] 0 0"), "{last}");
        assert!(out.ends_with("0 0\n"));
    }

    #[test]
    fn fault_is_reported_even_if_flush_fails() {
        struct BrokenPipe;
        impl Write for BrokenPipe {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let tape = Tape::new(1, BoundsPolicy::Error).unwrap();
        let mut bf = Interpreter::new(Program::from("+<"), tape, io::empty(), BrokenPipe);
        assert!(matches!(
            bf.run(),
            Err(BrainfuckError::TapeBounds { ip: 1, ptr: 0, op: '<' })
        ));
    }
}
