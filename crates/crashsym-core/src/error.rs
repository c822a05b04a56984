//! # Error Types
//!
//! General error handling for the symbolizer.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most of these errors never leave the engine: a failure while handling one
//! line is logged and turned into an `unknown, ...` frame so the rest of the
//! stream keeps flowing. Only I/O errors on the input or output stream are
//! returned from [`Symbolizer::run`](crate::session::Symbolizer::run).

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Main error type for symbolizer operations
///
/// ## Error Categories
///
/// 1. **Tool errors**: ToolSpawn, ToolFailed, UnsupportedPlatform
/// 2. **Kernel errors**: KernelNotFound, CodeStartNotFound
/// 3. **Input errors**: InvalidHex
/// 4. **I/O errors**: Io (input and output streams, collaborator files)
#[derive(Error, Debug)]
pub enum SymbolizeError
{
    /// An external tool could not be started
    ///
    /// Usually the tool path is wrong or the toolchain is not installed.
    #[error("failed to run {}: {source}", tool.display())]
    ToolSpawn
    {
        /// Path of the tool that was invoked
        tool: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-zero status
    #[error("{} exited with {status}: {stderr}", tool.display())]
    ToolFailed
    {
        /// Path of the tool that was invoked
        tool: PathBuf,
        /// Exit status reported by the OS
        status: ExitStatus,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// No default tool location is known for the host platform
    ///
    /// Pass an explicit tool path to avoid default discovery.
    #[error("unsupported host platform {os}/{arch}: pass an explicit tool path")]
    UnsupportedPlatform
    {
        /// Host operating system (`std::env::consts::OS`)
        os: &'static str,
        /// Host architecture (`std::env::consts::ARCH`)
        arch: &'static str,
    },

    /// The kernel binary could not be located in any search root
    #[error("can't find kernel binary {0}")]
    KernelNotFound(String),

    /// The kernel symbol table has no `__code_start` entry
    #[error("no __code_start symbol in {}", .0.display())]
    CodeStartNotFound(PathBuf),

    /// A token that should be hexadecimal was not
    #[error("invalid hexadecimal value: {0}")]
    InvalidHex(String),

    /// I/O error (input/output streams, index and manifest files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymbolizeError>`
///
/// ```rust
/// use crashsym_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymbolizeError>;
