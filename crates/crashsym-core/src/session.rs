//! # Session Controller
//!
//! The [`Symbolizer`] reads a crash log line by line, routes every line
//! through the dialect state machine and prints each finished backtrace as
//! a symbolized block:
//!
//! ```text
//! start of symbolized stack:
//! #00: memcpy at string/memcpy.c:42
//! #01: main at app/main.c:7
//! end of symbolized stack
//! ```
//!
//! ## State
//!
//! All state lives in the engine instance; nothing is global. Different
//! pieces have different lifetimes:
//!
//! - **Session** (frames, stack usage): one backtrace, reset on close.
//! - **DSO records**: one DSO list, reset when a `dso:` line follows a non-DSO line.
//! - **Path cache**: one architecture epoch, reset on an architecture change.
//! - **Kernel context**: one panic, reset on the next panic signature.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crashsym_core::config::SymbolizerConfig;
//! use crashsym_core::session::Symbolizer;
//!
//! let config = SymbolizerConfig::builder().build_dir("out/x64").build();
//! let mut symbolizer = Symbolizer::with_system_tools(config);
//! let stdin = std::io::stdin();
//! symbolizer.run(stdin.lock(), std::io::stdout().lock())?;
//! # Ok::<(), crashsym_core::error::SymbolizeError>(())
//! ```

use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::config::SymbolizerConfig;
use crate::dialect::{self, LineEvent, Mode, ZirconContext};
use crate::dso::{DsoDirectory, DsoRecords};
use crate::error::Result;
use crate::kaslr::{self, KaslrAdjuster};
use crate::output::RetryWriter;
use crate::stack::StackUsageTracker;
use crate::tools::{AddressResolver, SystemTools, ToolRunner};
use crate::types::{Address, Architecture, Dialect, DsoRecord, Frame, Resolution};

/// First line of a symbolized block.
pub const BLOCK_START: &str = "start of symbolized stack:";

/// Last line of a symbolized block.
pub const BLOCK_END: &str = "end of symbolized stack";

/// Frames of the backtrace being collected.
#[derive(Debug, Clone, Default)]
pub struct Session
{
    /// Dialect that opened the session.
    pub dialect: Option<Dialect>,
    /// Resolved frames, in input order.
    pub frames: Vec<Frame>,
    /// Stack usage of plain frames.
    pub stack: StackUsageTracker,
}

/// Streaming backtrace symbolizer.
///
/// One instance per input stream. Lines are processed one at a time,
/// including any tool invocation they trigger, before the next is read.
#[derive(Debug)]
pub struct Symbolizer<T>
{
    pub(crate) config: SymbolizerConfig,
    pub(crate) resolver: AddressResolver<T>,
    pub(crate) directory: DsoDirectory,
    pub(crate) records: DsoRecords,
    pub(crate) kaslr: KaslrAdjuster,
    pub(crate) zircon: Option<ZirconContext>,
    pub(crate) mode: Mode,
    session: Session,
    last_line_was_dso: bool,
}

impl Symbolizer<SystemTools>
{
    /// Symbolizer running the configured toolchain binaries.
    pub fn with_system_tools(config: SymbolizerConfig) -> Self
    {
        let tools = SystemTools::from_config(&config);
        Self::new(config, tools)
    }
}

impl<T: ToolRunner> Symbolizer<T>
{
    /// Create a symbolizer using `tools` for every external lookup.
    pub fn new(config: SymbolizerConfig, tools: T) -> Self
    {
        let directory = DsoDirectory::new(
            config.architecture.clone(),
            config.build_dirs.clone(),
            config.app_name.clone(),
        );
        Self {
            config,
            resolver: AddressResolver::new(tools),
            directory,
            records: DsoRecords::new(),
            kaslr: KaslrAdjuster::identity(),
            zircon: None,
            mode: Mode::Idle,
            session: Session::default(),
            last_line_was_dso: false,
        }
    }

    /// Symbolize `input` into `output` until end of input.
    ///
    /// Lines are decoded lossily, so invalid UTF-8 never stops the stream.
    /// A backtrace still open at end of input is flushed.
    ///
    /// ## Errors
    ///
    /// Only I/O errors reading `input` or writing `output` are returned.
    pub fn run<R, W>(&mut self, mut input: R, output: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut out = RetryWriter::new(output);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.strip_suffix('\n').unwrap_or(&text);
            self.process_line(line, &mut out)?;
            out.flush()?;
        }

        self.finish(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Process one line (without its trailing newline).
    ///
    /// ## Errors
    ///
    /// Only errors writing to `out`.
    pub fn process_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()>
    {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if self.config.echo {
            writeln!(out, "{line}")?;
        }

        let event = dialect::classify(self.mode, self.zircon.is_some(), line);
        trace!(mode = ?self.mode, "{event:?}");
        let is_dso = matches!(event, LineEvent::Dso(_));

        match event {
            LineEvent::SessionEnd => self.close_session(out)?,
            LineEvent::Architecture(token) => {
                self.directory.set_architecture(Architecture::parse(&token));
            }
            LineEvent::Dso(record) => self.declare_dso(record, out)?,
            LineEvent::ZirconPanic => {
                self.close_session(out)?;
                self.arm_zircon();
            }
            LineEvent::ZirconRegister(pc) => {
                if let Some(context) = self.zircon.as_mut() {
                    context.pending_pc = Some(pc);
                }
            }
            LineEvent::ZirconFrame { number, address } => {
                self.open_session(Dialect::ZirconKernel, out)?;
                let frame = self.zircon_frame(number, address);
                self.session.frames.push(frame);
            }
            LineEvent::PlainFrame(line) => {
                self.open_session(Dialect::Plain, out)?;
                self.session.stack.record(line.number, line.sp);
                let frame = self.plain_frame(&line);
                self.session.frames.push(frame);
            }
            LineEvent::AsanFrame { number, address } => {
                self.open_session(Dialect::Asan, out)?;
                let frame = self.asan_frame(number, address);
                self.session.frames.push(frame);
            }
            LineEvent::Other => {}
        }

        self.last_line_was_dso = is_dso;
        Ok(())
    }

    /// Flush any open backtrace at end of input.
    ///
    /// ## Errors
    ///
    /// Only errors writing to `out`.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> Result<()>
    {
        self.close_session(out)
    }

    /// Current state machine mode.
    pub fn mode(&self) -> Mode
    {
        self.mode
    }

    /// Current architecture.
    pub fn architecture(&self) -> &Architecture
    {
        self.directory.architecture()
    }

    /// DSO path directory.
    pub fn directory(&self) -> &DsoDirectory
    {
        &self.directory
    }

    /// DSO records of the current list.
    pub fn dso_records(&self) -> &DsoRecords
    {
        &self.records
    }

    /// Kernel panic context, if one is in effect.
    pub fn zircon_context(&self) -> Option<&ZirconContext>
    {
        self.zircon.as_ref()
    }

    /// Current KASLR state.
    pub fn kaslr(&self) -> &KaslrAdjuster
    {
        &self.kaslr
    }

    /// Backtrace being collected.
    pub fn session(&self) -> &Session
    {
        &self.session
    }

    /// The tool runner.
    pub fn tools(&self) -> &T
    {
        self.resolver.tools()
    }

    fn declare_dso<W: Write>(&mut self, record: DsoRecord, out: &mut W) -> Result<()>
    {
        if !self.last_line_was_dso {
            self.records.clear();
        }

        // only the kernel's own load address moves the KASLR bias
        let kernel = self.zircon.as_ref().filter(|_| record.name == self.config.kernel_name);
        if let Some(context) = kernel {
            self.kaslr.bias = Some(record.load_bias);
            if record.load_bias != context.code_start {
                if let Some(offset) = self.kaslr.offset() {
                    writeln!(out, "KASLR offset is {}", kaslr::format_offset(offset))?;
                }
            }
        }

        self.records.insert(record);
        Ok(())
    }

    fn open_session<W: Write>(&mut self, dialect: Dialect, out: &mut W) -> Result<()>
    {
        match self.mode.collecting() {
            Some(open) if open == dialect => return Ok(()),
            Some(_) => self.close_session(out)?,
            None => {}
        }

        self.mode = match dialect {
            Dialect::Plain => Mode::PlainCollecting,
            Dialect::ZirconKernel => Mode::ZirconCollecting,
            Dialect::Asan => Mode::AsanCollecting,
        };
        self.session.dialect = Some(dialect);
        Ok(())
    }

    fn close_session<W: Write>(&mut self, out: &mut W) -> Result<()>
    {
        if self.mode.collecting().is_none() {
            return Ok(());
        }

        let session = std::mem::take(&mut self.session);
        self.mode = Mode::resting(self.zircon.is_some());
        if session.frames.is_empty() {
            return Ok(());
        }
        if let Some(dialect) = session.dialect {
            debug!("{dialect} backtrace with {} frames", session.frames.len());
        }

        writeln!(out, "{BLOCK_START}")?;
        for frame in &session.frames {
            for line in frame.render() {
                writeln!(out, "{line}")?;
            }
        }
        writeln!(out, "{BLOCK_END}")?;

        if session.dialect == Some(Dialect::Plain) {
            if let Some(report) = session.stack.check(self.config.stack_size) {
                for line in report.lines() {
                    writeln!(out, "{line}")?;
                }
            }
        }
        Ok(())
    }

    /// Resolve a return address in `binary`, degrading failures to `Unknown`.
    pub(crate) fn call_site_resolution(&self, binary: &Path, address: Address) -> Resolution
    {
        match self
            .resolver
            .resolve_call_site(self.directory.architecture(), binary, address)
        {
            Ok(lines) => Resolution::Resolved(lines),
            Err(err) => {
                warn!("failed to resolve {address} in {}: {err}", binary.display());
                Resolution::Unknown(format!("failed to resolve {address} in {}", binary.display()))
            }
        }
    }

    /// Resolve an exact instruction address in `binary`.
    pub(crate) fn exact_resolution(&self, binary: &Path, address: Address) -> Resolution
    {
        match self
            .resolver
            .resolve_exact(self.directory.architecture(), binary, address)
        {
            Ok(lines) => Resolution::Resolved(lines),
            Err(err) => {
                warn!("failed to resolve {address} in {}: {err}", binary.display());
                Resolution::Unknown(format!("failed to resolve {address} in {}", binary.display()))
            }
        }
    }
}
