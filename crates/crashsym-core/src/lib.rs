//! # crashsym-core
//!
//! Streaming backtrace recognition and symbolization for crash logs.
//!
//! This crate turns raw crash output into readable stack traces:
//! - Recognises plain userspace, kernel panic and sanitizer backtraces,
//!   even when they are interleaved in one stream
//! - Locates the DSOs named in a backtrace inside the build output
//! - Undoes kernel address randomization before lookups
//! - Flags backtraces that used up (or nearly used up) their stack
//!
//! ## External Tools
//!
//! The crate does not parse ELF or DWARF. Address-to-line lookups,
//! disassembly and symbol tables come from toolchain binaries run through
//! the [`ToolRunner`] capability, and only their text output is read.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crashsym_core::prelude::*;
//!
//! let config = SymbolizerConfig::builder().build_dir("out/default").build();
//! let mut symbolizer = Symbolizer::with_system_tools(config);
//! symbolizer.run(std::io::stdin().lock(), std::io::stdout().lock())?;
//! # Ok::<(), SymbolizeError>(())
//! ```

pub mod config;
pub mod dialect;
pub mod dso;
pub mod error;
pub mod kaslr;
pub mod output;
pub mod patterns;
pub mod prelude;
pub mod session;
pub mod stack;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use config::SymbolizerConfig;
pub use error::{Result, SymbolizeError};
pub use session::Symbolizer;
pub use tools::{SystemTools, ToolRunner};
