//! Backtrace frame types.

use std::fmt;

use super::Address;

/// Backtrace dialect a session was opened by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect
{
    /// Native userspace backtrace: `bt#NN: pc .. sp .. (dso,offset)`.
    Plain,
    /// Kernel panic backtrace: `bt#NN: 0xADDR` after a panic signature.
    ZirconKernel,
    /// Sanitizer backtrace: `{{{bt:NN:0xADDR}}}`, no DSO named.
    Asan,
}

impl fmt::Display for Dialect
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Dialect::Plain => "plain",
            Dialect::ZirconKernel => "zircon",
            Dialect::Asan => "asan",
        };
        write!(f, "{label}")
    }
}

/// Terminal attribute of a frame.
///
/// Every frame carries one of these before it is buffered, so a frame is
/// never printed without either a location or the reason it has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution
{
    /// Resolver output: the first line is the location, the rest the
    /// inlining chain.
    Resolved(Vec<String>),
    /// The frame could not be mapped to source.
    Unknown(String),
}

impl Resolution
{
    /// `true` when the frame was mapped to a source location.
    pub const fn is_resolved(&self) -> bool
    {
        matches!(self, Resolution::Resolved(_))
    }

    /// Lines of this resolution, without any frame label.
    pub fn lines(&self) -> Vec<String>
    {
        match self {
            Resolution::Resolved(lines) if !lines.is_empty() => lines.clone(),
            Resolution::Resolved(_) => vec!["??".to_string()],
            Resolution::Unknown(reason) => vec![format!("unknown, {reason}")],
        }
    }
}

/// One recognised backtrace frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame
{
    /// Frame number as printed in the backtrace (`bt#NN`).
    pub number: u32,
    /// Stack pointer, for dialects that print one.
    pub stack_pointer: Option<Address>,
    /// DSO the frame belongs to, declared or inferred.
    pub dso: Option<String>,
    /// Offset inside the DSO after KASLR adjustment.
    pub offset: Option<Address>,
    /// Where the frame resolved to.
    pub resolution: Resolution,
    /// Faulting program counter printed ahead of this frame.
    pub faulting_pc: Option<Resolution>,
    /// Disassembly of the surrounding function.
    pub disassembly: Vec<String>,
}

impl Frame
{
    /// Create a frame with the given number and resolution.
    pub fn new(number: u32, resolution: Resolution) -> Self
    {
        Self {
            number,
            stack_pointer: None,
            dso: None,
            offset: None,
            resolution,
            faulting_pc: None,
            disassembly: Vec::new(),
        }
    }

    /// Output lines for this frame, in print order.
    ///
    /// ```rust
    /// use crashsym_core::types::{Frame, Resolution};
    ///
    /// let frame = Frame::new(3, Resolution::Unknown("can't find DSO for address 0x10".into()));
    /// assert_eq!(frame.render(), vec!["#03: unknown, can't find DSO for address 0x10"]);
    /// ```
    pub fn render(&self) -> Vec<String>
    {
        let mut out = Vec::new();
        if let Some(pc) = &self.faulting_pc {
            let mut pc_lines = pc.lines().into_iter();
            if let Some(first) = pc_lines.next() {
                out.push(format!("pc: {first}"));
            }
            out.extend(pc_lines);
        }

        let mut lines = self.resolution.lines().into_iter();
        if let Some(first) = lines.next() {
            out.push(format!("#{:02}: {first}", self.number));
        }
        out.extend(lines);
        out.extend(self.disassembly.iter().cloned());
        out
    }
}

/// A DSO declared by a `dso:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsoRecord
{
    /// Name the DSO was loaded under.
    pub name: String,
    /// Build id, lowercase hex.
    pub build_id: String,
    /// Runtime load address.
    pub load_bias: Address,
}
