use std::fmt;
use std::str::FromStr;

use crate::error::{BrainfuckError, ConfigError};

pub const DEFAULT_TAPE_SIZE: usize = 30_000;

/// What happens when the data pointer is moved past either end of the tape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Fail the run with [`BrainfuckError::TapeBounds`].
    #[default]
    Error,
    /// Wrap around modulo the tape size.
    Wrap,
}

impl FromStr for BoundsPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(BoundsPolicy::Error),
            "wrap" => Ok(BoundsPolicy::Wrap),
            _ => Err(ConfigError::InvalidPolicy {
                what: "bounds",
                value: s.to_string(),
                expected: "error, wrap",
            }),
        }
    }
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsPolicy::Error => write!(f, "error"),
            BoundsPolicy::Wrap => write!(f, "wrap"),
        }
    }
}

/// Fixed-size, zero-initialized byte tape with a single data pointer.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
    policy: BoundsPolicy,
}

impl Tape {
    /// A zeroed tape of `size` cells. Sizes below one, or too large to
    /// allocate, are rejected.
    pub fn new(size: usize, policy: BoundsPolicy) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidMemorySize(size.to_string()));
        }
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(size)
            .map_err(|source| ConfigError::TapeAllocation { size, source })?;
        cells.resize(size, 0);
        Ok(Self {
            cells,
            pointer: 0,
            policy,
        })
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// The `width`-aligned block of cells holding the data pointer, with the
    /// index of its first cell. The last block may be shorter.
    pub fn window(&self, width: usize) -> (usize, &[u8]) {
        let width = width.max(1);
        let base = self.pointer - self.pointer % width;
        let end = base.saturating_add(width).min(self.cells.len());
        (base, &self.cells[base..end])
    }

    pub fn get(&self) -> u8 {
        self.cells[self.pointer]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    pub fn increment(&mut self) -> u8 {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_add(1);
        *cell
    }

    pub fn decrement(&mut self) -> u8 {
        let cell = &mut self.cells[self.pointer];
        *cell = cell.wrapping_sub(1);
        *cell
    }

    /// `>`; `ip` is only used to attribute a bounds fault.
    pub fn move_right(&mut self, ip: usize) -> Result<usize, BrainfuckError> {
        if self.pointer + 1 < self.cells.len() {
            self.pointer += 1;
        } else {
            match self.policy {
                BoundsPolicy::Wrap => self.pointer = 0,
                BoundsPolicy::Error => {
                    return Err(BrainfuckError::TapeBounds {
                        ip,
                        ptr: self.pointer,
                        op: '>',
                    });
                }
            }
        }
        Ok(self.pointer)
    }

    /// `<`; `ip` is only used to attribute a bounds fault.
    pub fn move_left(&mut self, ip: usize) -> Result<usize, BrainfuckError> {
        if self.pointer > 0 {
            self.pointer -= 1;
        } else {
            match self.policy {
                BoundsPolicy::Wrap => self.pointer = self.cells.len() - 1,
                BoundsPolicy::Error => {
                    return Err(BrainfuckError::TapeBounds {
                        ip,
                        ptr: self.pointer,
                        op: '<',
                    });
                }
            }
        }
        Ok(self.pointer)
    }
}
