//! The binary assembly container.
//!
//! The container is a flat sequence of little-endian 8-byte words:
//!
//! ```text
//! word 0          (magic:i32@0 = 0xF000, version:i32@4 = 1)
//! word 1          op_count:i32
//! op_count × 2    (opcode:i32, operand word)
//! 1               proc_count:i32                 ┐ optional
//! proc_count × 2  (address:i32, num_args:i32)    ┘
//! 1               string_count:i32               ┐ optional
//! per string      len:i32, then len UTF-16 units ┘ one unit per word
//! ```
//!
//! A buffer that ends right after the instruction section (or right after
//! the procedure section) decodes with the missing tables empty.

use std::{fmt::Write, fs, path::Path};

use object::Value;

use crate::{Instruction, Op};

pub const MAGIC_NUMBER: i32 = 0xF000;
pub const VERSION: i32 = 1;

/// Entry of the procedure table, referenced by dense id from `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcInfo {
    /// Index of the procedure's first instruction.
    pub address: u32,
    pub num_args: u32,
}

impl ProcInfo {
    pub const fn new(address: u32, num_args: u32) -> Self {
        Self { address, num_args }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Assembly length {len} is not a multiple of 8 bytes.")]
    Misaligned { len: usize },

    #[error("Invalid assembly file (magic number 0x{found:X}).")]
    BadMagic { found: i32 },

    #[error("Invalid assembly file (unsupported version {found}).")]
    UnsupportedVersion { found: i32 },

    #[error("Assembly ended inside the {section} section.")]
    Truncated { section: &'static str },

    #[error("Negative {section} count {count}.")]
    NegativeCount { section: &'static str, count: i32 },

    #[error("Instruction {index} has unknown opcode {id}.")]
    UnknownOpcode { index: usize, id: i32 },

    #[error("String {index} is not valid UTF-16.")]
    InvalidString { index: usize },

    #[error("{count} unexpected words after the string table.")]
    TrailingWords { count: usize },

    #[error("Procedure {id} was declared but never bound.")]
    UnboundProcedure { id: u32 },

    #[error("Could not access `{path}`: {message}")]
    Io { path: String, message: String },
}

/// A loaded program: instructions, procedure table and string table.
///
/// Immutable once built; the interpreter only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    instructions: Vec<Instruction>,
    procedures: Vec<ProcInfo>,
    strings: Vec<String>,
}

impl Assembly {
    pub fn new(
        instructions: Vec<Instruction>,
        procedures: Vec<ProcInfo>,
        strings: Vec<String>,
    ) -> Self {
        Self {
            instructions,
            procedures,
            strings,
        }
    }

    #[inline(always)]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[inline(always)]
    pub fn procedures(&self) -> &[ProcInfo] {
        &self.procedures
    }

    #[inline(always)]
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    // ── Serialization ──────────────────────────────────────────────

    pub fn to_bytes(&self) -> Vec<u8> {
        let string_words: usize = self.strings.iter().map(|s| 1 + s.encode_utf16().count()).sum();
        let mut w = WordWriter::with_capacity(
            4 + self.instructions.len() * 2 + self.procedures.len() * 2 + string_words,
        );

        w.word(Value::from_halves(MAGIC_NUMBER, VERSION));

        w.count(self.instructions.len());
        for inst in &self.instructions {
            w.word(Value::from_i32(inst.op as i32));
            w.word(inst.operand);
        }

        w.count(self.procedures.len());
        for proc in &self.procedures {
            w.word(Value::ZERO.with_u32_at(0, proc.address));
            w.word(Value::ZERO.with_u32_at(0, proc.num_args));
        }

        w.count(self.strings.len());
        for s in &self.strings {
            let units: Vec<u16> = s.encode_utf16().collect();
            w.count(units.len());
            for unit in units {
                w.word(Value::from_i32(unit as i32));
            }
        }

        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssemblyError> {
        let mut r = WordReader::new(bytes)?;

        let head = r.next("header")?;
        let magic = head.read_i32_at(0);
        if magic != MAGIC_NUMBER {
            return Err(AssemblyError::BadMagic { found: magic });
        }
        let version = head.read_i32_at(4);
        if version != VERSION {
            return Err(AssemblyError::UnsupportedVersion { found: version });
        }

        let op_count = r.count("instructions")?;
        let mut instructions = Vec::with_capacity(op_count.min(r.remaining() / 2));
        for index in 0..op_count {
            let id = r.next("instructions")?.read_i32_at(0);
            let op = Op::try_from(id).map_err(|id| AssemblyError::UnknownOpcode { index, id })?;
            let operand = r.next("instructions")?;
            instructions.push(Instruction::with_operand(op, operand));
        }

        let mut procedures = Vec::new();
        if !r.is_at_end() {
            let proc_count = r.count("procedures")?;
            procedures.reserve(proc_count.min(r.remaining() / 2));
            for _ in 0..proc_count {
                let address = r.next("procedures")?.read_u32_at(0);
                let num_args = r.next("procedures")?.read_u32_at(0);
                procedures.push(ProcInfo { address, num_args });
            }
        }

        let mut strings = Vec::new();
        if !r.is_at_end() {
            let string_count = r.count("strings")?;
            strings.reserve(string_count.min(r.remaining()));
            for index in 0..string_count {
                let len = r.count("strings")?;
                let mut units = Vec::with_capacity(len.min(r.remaining()));
                for _ in 0..len {
                    let unit = u16::try_from(r.next("strings")?.read_u32_at(0))
                        .map_err(|_| AssemblyError::InvalidString { index })?;
                    units.push(unit);
                }
                let s = String::from_utf16(&units)
                    .map_err(|_| AssemblyError::InvalidString { index })?;
                strings.push(s);
            }
        }

        if !r.is_at_end() {
            return Err(AssemblyError::TrailingWords {
                count: r.remaining(),
            });
        }

        log::debug!(
            "assembly: loaded {} instructions, {} procedures, {} strings",
            instructions.len(),
            procedures.len(),
            strings.len()
        );
        Ok(Self {
            instructions,
            procedures,
            strings,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssemblyError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| AssemblyError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), AssemblyError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| AssemblyError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    // ── Listings ───────────────────────────────────────────────────

    pub fn dump_program(&self) -> String {
        let mut out = String::new();
        for (ip, inst) in self.instructions.iter().enumerate() {
            let _ = writeln!(out, "{ip:>6}: {inst}");
        }
        out
    }

    pub fn dump_proc_table(&self) -> String {
        let mut out = String::new();
        for (i, proc) in self.procedures.iter().enumerate() {
            let _ = writeln!(
                out,
                "proc[{i}] addr: {} numArgs: {}",
                proc.address, proc.num_args
            );
        }
        out
    }

    pub fn dump_strings(&self) -> String {
        let mut out = String::new();
        for (i, s) in self.strings.iter().enumerate() {
            let _ = writeln!(out, "${i}: {s:?}");
        }
        out
    }
}

// ── Word streams ──────────────────────────────────────────────────────

struct WordWriter {
    buf: Vec<u8>,
}

impl WordWriter {
    fn with_capacity(words: usize) -> Self {
        Self {
            buf: Vec::with_capacity(words * Value::SIZE),
        }
    }

    fn word(&mut self, v: Value) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Counts are stored as i32; tables never get near that size.
    fn count(&mut self, n: usize) {
        debug_assert!(n <= i32::MAX as usize, "table too large: {n}");
        self.word(Value::from_i32(n as i32));
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

struct WordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, AssemblyError> {
        if bytes.len() % Value::SIZE != 0 {
            return Err(AssemblyError::Misaligned { len: bytes.len() });
        }
        Ok(Self { bytes, pos: 0 })
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Remaining whole words.
    fn remaining(&self) -> usize {
        (self.bytes.len() - self.pos) / Value::SIZE
    }

    fn next(&mut self, section: &'static str) -> Result<Value, AssemblyError> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + Value::SIZE)
            .ok_or(AssemblyError::Truncated { section })?;
        self.pos += Value::SIZE;
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        Ok(Value::from_le_bytes(word))
    }

    fn count(&mut self, section: &'static str) -> Result<usize, AssemblyError> {
        let count = self.next(section)?.read_i32_at(0);
        usize::try_from(count).map_err(|_| AssemblyError::NegativeCount { section, count })
    }
}
