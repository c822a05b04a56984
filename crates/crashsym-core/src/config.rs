//! # Symbolizer Configuration
//!
//! Settings the engine consumes but does not own: where build output lives,
//! which tools to run and how much stack a thread is assumed to have.
//!
//! ## Example
//!
//! ```rust
//! use crashsym_core::config::SymbolizerConfig;
//! use crashsym_core::types::Architecture;
//!
//! let config = SymbolizerConfig::builder()
//!     .architecture(Architecture::Arm64)
//!     .build_dir("out/default")
//!     .stack_size(64 * 1024)
//!     .disassemble(true)
//!     .build();
//!
//! assert_eq!(config.stack_size, 64 * 1024);
//! assert!(config.disassemble);
//! ```

use std::path::PathBuf;

use crate::types::Architecture;

/// Default assumed stack size (256 KiB).
pub const DEFAULT_STACK_SIZE: u64 = 256 * 1024;

/// Default toolchain root for tool discovery.
pub const DEFAULT_TOOLCHAIN_DIR: &str = "prebuilt/downloads/gcc";

/// Default name of the kernel binary located on a panic.
pub const DEFAULT_KERNEL_NAME: &str = "zircon.elf";

/// Configuration for a [`Symbolizer`](crate::session::Symbolizer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolizerConfig
{
    /// Architecture assumed until the stream declares one.
    pub architecture: Architecture,
    /// Build output roots, searched in order.
    pub build_dirs: Vec<PathBuf>,
    /// Assumed stack size in bytes.
    pub stack_size: u64,
    /// Disassemble the function around each resolved plain frame.
    pub disassemble: bool,
    /// Explicit address-to-line tool.
    pub addr2line: Option<PathBuf>,
    /// Explicit debugger used for disassembly.
    pub gdb: Option<PathBuf>,
    /// Explicit symbol table dumper.
    pub nm: Option<PathBuf>,
    /// Root for default tool discovery.
    pub toolchain_dir: PathBuf,
    /// Executable name used when a DSO is only known as the application.
    pub app_name: Option<String>,
    /// Echo every input line to the output.
    pub echo: bool,
    /// Kernel binary searched for on a panic signature.
    pub kernel_name: String,
}

impl Default for SymbolizerConfig
{
    fn default() -> Self
    {
        Self {
            architecture: Architecture::current(),
            build_dirs: vec![PathBuf::from(".")],
            stack_size: DEFAULT_STACK_SIZE,
            disassemble: false,
            addr2line: None,
            gdb: None,
            nm: None,
            toolchain_dir: PathBuf::from(DEFAULT_TOOLCHAIN_DIR),
            app_name: None,
            echo: true,
            kernel_name: DEFAULT_KERNEL_NAME.to_string(),
        }
    }
}

impl SymbolizerConfig
{
    /// Start building a configuration from the defaults.
    pub fn builder() -> SymbolizerConfigBuilder
    {
        SymbolizerConfigBuilder::default()
    }
}

/// Fluent builder for [`SymbolizerConfig`].
///
/// Build directories added through [`build_dir`](Self::build_dir) replace
/// the default `.` root; they keep the order they were added in.
#[derive(Debug, Clone, Default)]
pub struct SymbolizerConfigBuilder
{
    config: SymbolizerConfig,
    explicit_build_dirs: Vec<PathBuf>,
}

impl SymbolizerConfigBuilder
{
    /// Initial architecture.
    #[must_use]
    pub fn architecture(mut self, architecture: impl Into<Architecture>) -> Self
    {
        self.config.architecture = architecture.into();
        self
    }

    /// Append a build output root.
    #[must_use]
    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self
    {
        self.explicit_build_dirs.push(dir.into());
        self
    }

    /// Append several build output roots.
    #[must_use]
    pub fn build_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.explicit_build_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Assumed stack size in bytes.
    #[must_use]
    pub fn stack_size(mut self, bytes: u64) -> Self
    {
        self.config.stack_size = bytes;
        self
    }

    /// Disassemble resolved plain frames.
    #[must_use]
    pub fn disassemble(mut self, enabled: bool) -> Self
    {
        self.config.disassemble = enabled;
        self
    }

    /// Explicit address-to-line tool.
    #[must_use]
    pub fn addr2line(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.config.addr2line = Some(path.into());
        self
    }

    /// Explicit debugger for disassembly.
    #[must_use]
    pub fn gdb(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.config.gdb = Some(path.into());
        self
    }

    /// Explicit symbol table dumper.
    #[must_use]
    pub fn nm(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.config.nm = Some(path.into());
        self
    }

    /// Root for default tool discovery.
    #[must_use]
    pub fn toolchain_dir(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.config.toolchain_dir = path.into();
        self
    }

    /// Executable name hint for placeholder DSOs.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self
    {
        self.config.app_name = Some(name.into());
        self
    }

    /// Echo input lines.
    #[must_use]
    pub fn echo(mut self, enabled: bool) -> Self
    {
        self.config.echo = enabled;
        self
    }

    /// Kernel binary name.
    #[must_use]
    pub fn kernel_name(mut self, name: impl Into<String>) -> Self
    {
        self.config.kernel_name = name.into();
        self
    }

    /// Finish the configuration.
    pub fn build(mut self) -> SymbolizerConfig
    {
        if !self.explicit_build_dirs.is_empty() {
            self.config.build_dirs = self.explicit_build_dirs;
        }
        self.config
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults()
    {
        let config = SymbolizerConfig::builder().build();
        assert_eq!(config.build_dirs, vec![PathBuf::from(".")]);
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert!(config.echo);
        assert!(!config.disassemble);
        assert_eq!(config.kernel_name, "zircon.elf");
    }

    #[test]
    fn test_build_dirs_replace_default_in_order()
    {
        let config = SymbolizerConfig::builder()
            .build_dir("/a")
            .build_dirs(["/b", "/c"])
            .build();
        assert_eq!(
            config.build_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
    }
}
