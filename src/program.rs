use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// One of the eight Brainfuck instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Right,
    Left,
    Inc,
    Dec,
    Output,
    Input,
    LoopStart,
    LoopEnd,
}

impl Op {
    /// Decode a source byte. Anything outside `><+-.,[]` is a comment and yields `None`.
    pub fn decode(byte: u8) -> Option<Op> {
        match byte {
            b'>' => Some(Op::Right),
            b'<' => Some(Op::Left),
            b'+' => Some(Op::Inc),
            b'-' => Some(Op::Dec),
            b'.' => Some(Op::Output),
            b',' => Some(Op::Input),
            b'[' => Some(Op::LoopStart),
            b']' => Some(Op::LoopEnd),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Op::Right => '>',
            Op::Left => '<',
            Op::Inc => '+',
            Op::Dec => '-',
            Op::Output => '.',
            Op::Input => ',',
            Op::LoopStart => '[',
            Op::LoopEnd => ']',
        }
    }
}

/// A loaded program: an immutable, position-addressable byte buffer.
///
/// The position one past the last byte acts as the end-of-program sentinel;
/// [`Program::fetch`] reports it as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    source: Box<[u8]>,
}

impl Program {
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into().into_boxed_slice(),
        }
    }

    /// Read the whole file at `path`. Bytes are taken as-is; the file does not need to be UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded {} bytes from {}", bytes.len(), path.display());
        Ok(Self::new(bytes))
    }

    /// Byte at `ip`, or `None` once `ip` reaches the sentinel.
    pub fn fetch(&self, ip: usize) -> Option<u8> {
        self.source.get(ip).copied()
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.source
    }
}

impl From<&str> for Program {
    fn from(code: &str) -> Self {
        Self::new(code.as_bytes())
    }
}

impl From<String> for Program {
    fn from(code: String) -> Self {
        Self::new(code.into_bytes())
    }
}
