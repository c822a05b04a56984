//! # External Tools
//!
//! The symbolizer never reads debug info itself. Address-to-line lookups,
//! disassembly and symbol table dumps are delegated to toolchain binaries
//! and only their text output is interpreted.
//!
//! [`ToolRunner`] is the capability the engine depends on; [`SystemTools`]
//! runs the real binaries, tests substitute a fake. [`AddressResolver`]
//! sits on top and owns the interpretation rules: call-site adjustment and
//! rebasing of disassembly.

mod system;

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

pub use self::system::{host_platform, SystemTools, Tool};
use crate::error::{Result, SymbolizeError};
use crate::types::{Address, Architecture};

/// Blocking access to the external toolchain
///
/// Every method runs one tool to completion. A failure (spawn error or
/// non-zero exit) is reported as an error and never retried.
pub trait ToolRunner
{
    /// Resolve `address` in `binary` to `function at file:line`.
    ///
    /// The output may contain continuation lines for inlined callers.
    fn addr2line(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>;

    /// Disassemble the function containing `address`.
    ///
    /// Returns the raw output lines of the debugger.
    fn disassemble(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>;

    /// Dump the symbol table of `binary`.
    fn symbol_table(&self, arch: &Architecture, binary: &Path) -> Result<String>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for Box<T>
{
    fn addr2line(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>
    {
        (**self).addr2line(arch, binary, address)
    }

    fn disassemble(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>
    {
        (**self).disassemble(arch, binary, address)
    }

    fn symbol_table(&self, arch: &Architecture, binary: &Path) -> Result<String>
    {
        (**self).symbol_table(arch, binary)
    }
}

static DISASM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *(0x[0-9a-fA-F]+)( .+)$").unwrap());

static CODE_START_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9a-fA-F]+) [tT] __code_start$").unwrap());

/// Interprets tool output for the engine.
#[derive(Debug)]
pub struct AddressResolver<T>
{
    tools: T,
}

impl<T: ToolRunner> AddressResolver<T>
{
    /// Wrap a tool runner.
    pub fn new(tools: T) -> Self
    {
        Self { tools }
    }

    /// The underlying tool runner.
    pub fn tools(&self) -> &T
    {
        &self.tools
    }

    /// Resolve a return address at its call site.
    ///
    /// Queries `return_address - 1`, which lands inside the call instruction
    /// and gives the right answer for inlined calls and calls to functions
    /// that never return.
    ///
    /// ## Errors
    ///
    /// Propagates tool failures.
    pub fn resolve_call_site(&self, arch: &Architecture, binary: &Path, return_address: Address) -> Result<Vec<String>>
    {
        self.tools.addr2line(arch, binary, return_address.call_site())
    }

    /// Resolve an exact instruction address, such as a faulting PC.
    ///
    /// ## Errors
    ///
    /// Propagates tool failures.
    pub fn resolve_exact(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>
    {
        self.tools.addr2line(arch, binary, address)
    }

    /// Disassemble around `address`, rebasing every instruction by `bias`.
    ///
    /// Lines that do not start with an address (headers, `End of assembler
    /// dump.`) are dropped. The instruction at `address` is marked `=>`.
    ///
    /// ## Errors
    ///
    /// Propagates tool failures.
    pub fn disassemble_at(&self, arch: &Architecture, binary: &Path, address: Address, bias: Address) -> Result<Vec<String>>
    {
        let raw = self.tools.disassemble(arch, binary, address)?;
        Ok(raw
            .iter()
            .filter_map(|line| rebase_disassembly_line(line, address, bias))
            .collect())
    }

    /// Read the linked address of `__code_start` from the kernel.
    ///
    /// ## Errors
    ///
    /// `CodeStartNotFound` when the symbol is missing, or the tool failure.
    pub fn code_start(&self, arch: &Architecture, kernel: &Path) -> Result<Address>
    {
        let table = self.tools.symbol_table(arch, kernel)?;
        parse_code_start(&table).ok_or_else(|| SymbolizeError::CodeStartNotFound(kernel.to_path_buf()))
    }
}

/// Rewrite one disassembly line, or `None` if it carries no address.
fn rebase_disassembly_line(line: &str, current: Address, bias: Address) -> Option<String>
{
    let captures = DISASM_LINE.captures(line)?;
    let address = Address::from_hex(&captures[1]).ok()?;
    let marker = if address == current { "=> " } else { "   " };
    Some(format!("{marker}{}{}", address + bias.value(), &captures[2]))
}

/// Find `__code_start` in an `nm`-style symbol table dump.
pub fn parse_code_start(table: &str) -> Option<Address>
{
    table
        .lines()
        .find_map(|line| CODE_START_LINE.captures(line.trim_end()))
        .and_then(|captures| Address::from_hex(&captures[1]).ok())
}
