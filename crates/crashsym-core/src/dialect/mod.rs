//! # Dialect State Machine
//!
//! Three backtrace dialects can be interleaved in one stream:
//!
//! - **Plain**: `bt#NN: pc .. sp .. (dso,offset)` from userspace crash handlers
//! - **Zircon kernel**: `bt#NN: 0xADDR` after a `ZIRCON KERNEL PANIC` line
//! - **ASan**: `{{{bt:NN:0xADDR}}}` from sanitizers, with no DSO named
//!
//! The current [`Mode`] and whether a kernel panic context exists decide
//! which patterns are armed for a line, and [`classify`] applies them in a
//! fixed order, turning each line into exactly one [`LineEvent`]. Kernel
//! patterns are armed for the whole panic context. The plain and ASan
//! patterns are switched off only while a kernel backtrace is open, so a
//! kernel frame is never read twice.
//!
//! ```text
//! Idle --plain frame--> PlainCollecting --end--> Idle
//! Idle --panic--> ZirconArmed --frame--> ZirconCollecting --end--> ZirconArmed
//! Idle --asan frame--> AsanCollecting --blank--> Idle
//! ```
//!
//! A plain or ASan session opened under a panic context returns to
//! `ZirconArmed` when it closes.

mod asan;
mod plain;
mod zircon;

use std::path::PathBuf;

use crate::patterns::{self, PlainFrameLine};
use crate::types::{Address, Dialect, DsoRecord};

/// Which patterns are armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode
{
    /// No backtrace open, no kernel panic in effect.
    #[default]
    Idle,
    /// Collecting a plain backtrace.
    PlainCollecting,
    /// A kernel panic was seen; kernel frames are expected.
    ZirconArmed,
    /// Collecting a kernel backtrace.
    ZirconCollecting,
    /// Collecting a sanitizer backtrace.
    AsanCollecting,
}

impl Mode
{
    /// Dialect of the open session, if any.
    pub const fn collecting(self) -> Option<Dialect>
    {
        match self {
            Mode::PlainCollecting => Some(Dialect::Plain),
            Mode::ZirconCollecting => Some(Dialect::ZirconKernel),
            Mode::AsanCollecting => Some(Dialect::Asan),
            Mode::Idle | Mode::ZirconArmed => None,
        }
    }

    /// Resting mode when no session is open.
    pub const fn resting(kernel_context: bool) -> Self
    {
        if kernel_context {
            Mode::ZirconArmed
        } else {
            Mode::Idle
        }
    }
}

/// What one input line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent
{
    /// Terminates the open session.
    SessionEnd,
    /// `arch: <token>`.
    Architecture(String),
    /// `dso: ...`.
    Dso(DsoRecord),
    /// Kernel panic signature.
    ZirconPanic,
    /// Faulting PC from a kernel register dump.
    ZirconRegister(Address),
    /// Kernel frame.
    ZirconFrame
    {
        /// Frame number.
        number: u32,
        /// Runtime address.
        address: Address,
    },
    /// Plain frame.
    PlainFrame(PlainFrameLine),
    /// Sanitizer frame.
    AsanFrame
    {
        /// Frame number.
        number: u32,
        /// Runtime address.
        address: Address,
    },
    /// Anything else; echoed and otherwise ignored.
    Other,
}

/// Classify `line` under `mode`.
///
/// Order: the end condition of the open session, the architecture, a DSO
/// declaration, the kernel patterns when `kernel_context` is set, then the
/// plain and ASan patterns unless a kernel backtrace is open. The first
/// match wins.
pub fn classify(mode: Mode, kernel_context: bool, line: &str) -> LineEvent
{
    let ends_session = match mode.collecting() {
        Some(Dialect::Plain | Dialect::ZirconKernel) => patterns::is_end_marker(line),
        Some(Dialect::Asan) => patterns::is_asan_end(line),
        None => false,
    };
    if ends_session {
        return LineEvent::SessionEnd;
    }

    if let Some(arch) = patterns::parse_arch(line) {
        return LineEvent::Architecture(arch.to_string());
    }
    if let Some(record) = patterns::parse_dso(line) {
        return LineEvent::Dso(record);
    }
    if patterns::is_zircon_panic(line) {
        return LineEvent::ZirconPanic;
    }

    if kernel_context {
        if let Some((number, address)) = patterns::parse_zircon_frame(line) {
            return LineEvent::ZirconFrame { number, address };
        }
        if let Some(pc) = patterns::parse_zircon_register(line) {
            return LineEvent::ZirconRegister(pc);
        }
    }
    if mode == Mode::ZirconCollecting {
        return LineEvent::Other;
    }

    if let Some(frame) = patterns::parse_plain_frame(line) {
        return LineEvent::PlainFrame(frame);
    }
    if let Some((number, address)) = patterns::parse_asan_frame(line) {
        return LineEvent::AsanFrame { number, address };
    }
    LineEvent::Other
}

/// Kernel panic context.
///
/// Lives from a panic signature until the next one, across any number of
/// kernel backtraces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZirconContext
{
    /// Kernel binary.
    pub elf_path: PathBuf,
    /// Linked address of `__code_start`.
    pub code_start: Address,
    /// Faulting PC waiting for the next kernel frame.
    pub pending_pc: Option<Address>,
}
