//! Subprocess-backed [`ToolRunner`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::ToolRunner;
use crate::config::SymbolizerConfig;
use crate::error::{Result, SymbolizeError};
use crate::types::{Address, Architecture};

/// Toolchain binaries the symbolizer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool
{
    /// Address-to-line resolver.
    Addr2Line,
    /// Debugger, run in batch mode for disassembly.
    Gdb,
    /// Symbol table dumper.
    Nm,
}

impl Tool
{
    /// Suffix of the toolchain binary (`<prefix>-elf-<suffix>`).
    pub const fn binary_suffix(self) -> &'static str
    {
        match self {
            Tool::Addr2Line => "addr2line",
            Tool::Gdb => "gdb",
            Tool::Nm => "nm",
        }
    }
}

/// Host platform directory name used by prebuilt toolchains.
///
/// ## Errors
///
/// Returns `UnsupportedPlatform` for hosts without prebuilt toolchains.
pub fn host_platform() -> Result<&'static str>
{
    use std::env::consts::{ARCH, OS};

    match (OS, ARCH) {
        ("linux", "x86_64") => Ok("linux-x64"),
        ("linux", "aarch64") => Ok("linux-arm64"),
        ("macos", "x86_64") => Ok("mac-x64"),
        ("macos", "aarch64") => Ok("mac-arm64"),
        (os, arch) => Err(SymbolizeError::UnsupportedPlatform { os, arch }),
    }
}

/// Runs the real toolchain binaries as blocking subprocesses.
///
/// Tool paths are resolved lazily on every call: an explicit override wins,
/// otherwise the path is derived from the toolchain root, the host platform
/// and the current architecture. An unknown host therefore only fails the
/// calls that need a default path.
#[derive(Debug, Clone)]
pub struct SystemTools
{
    addr2line: Option<PathBuf>,
    gdb: Option<PathBuf>,
    nm: Option<PathBuf>,
    toolchain_dir: PathBuf,
}

impl SystemTools
{
    /// Tools as configured.
    pub fn from_config(config: &SymbolizerConfig) -> Self
    {
        Self {
            addr2line: config.addr2line.clone(),
            gdb: config.gdb.clone(),
            nm: config.nm.clone(),
            toolchain_dir: config.toolchain_dir.clone(),
        }
    }

    /// Path of `tool` for `arch`.
    ///
    /// ## Errors
    ///
    /// Returns `UnsupportedPlatform` when no override is set and the host
    /// has no default toolchain location.
    pub fn tool_path(&self, tool: Tool, arch: &Architecture) -> Result<PathBuf>
    {
        let explicit = match tool {
            Tool::Addr2Line => &self.addr2line,
            Tool::Gdb => &self.gdb,
            Tool::Nm => &self.nm,
        };
        if let Some(path) = explicit {
            return Ok(path.clone());
        }

        let host = host_platform()?;
        Ok(self
            .toolchain_dir
            .join(host)
            .join("bin")
            .join(format!("{}-elf-{}", arch.tool_prefix(), tool.binary_suffix())))
    }

    fn run<I, S>(&self, tool: Tool, arch: &Architecture, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = self.tool_path(tool, arch)?;
        let mut command = Command::new(&path);
        command.args(args);
        debug!("running {:?}", command);

        let output = command.output().map_err(|source| SymbolizeError::ToolSpawn {
            tool: path.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(SymbolizeError::ToolFailed {
                tool: path,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ToolRunner for SystemTools
{
    fn addr2line(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>
    {
        // -C demangle, -i inline chain, -p pretty, -f function names, -e binary
        let stdout = self.run(
            Tool::Addr2Line,
            arch,
            [
                OsStr::new("-Cipfe"),
                binary.as_os_str(),
                OsStr::new(&address.to_string()),
            ],
        )?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn disassemble(&self, arch: &Architecture, binary: &Path, address: Address) -> Result<Vec<String>>
    {
        let command = format!("disassemble {address}");
        let stdout = self.run(
            Tool::Gdb,
            arch,
            [
                OsStr::new("--nx"),
                OsStr::new("--batch"),
                OsStr::new("-ex"),
                OsStr::new(&command),
                binary.as_os_str(),
            ],
        )?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn symbol_table(&self, arch: &Architecture, binary: &Path) -> Result<String>
    {
        self.run(Tool::Nm, arch, [binary.as_os_str()])
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_explicit_path_wins()
    {
        let config = SymbolizerConfig::builder().addr2line("/opt/bin/addr2line").build();
        let tools = SystemTools::from_config(&config);
        assert_eq!(
            tools.tool_path(Tool::Addr2Line, &Architecture::X86_64).unwrap(),
            PathBuf::from("/opt/bin/addr2line")
        );
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_default_path_layout()
    {
        let config = SymbolizerConfig::builder().toolchain_dir("/tc").build();
        let tools = SystemTools::from_config(&config);
        assert_eq!(
            tools.tool_path(Tool::Nm, &Architecture::Arm64).unwrap(),
            PathBuf::from("/tc/linux-x64/bin/aarch64-elf-nm")
        );
    }

    #[test]
    fn test_spawn_failure_is_reported()
    {
        let config = SymbolizerConfig::builder()
            .nm("/nonexistent/crashsym-test-nm")
            .build();
        let tools = SystemTools::from_config(&config);
        let err = tools
            .symbol_table(&Architecture::X86_64, Path::new("/nonexistent/zircon.elf"))
            .unwrap_err();
        assert!(matches!(err, SymbolizeError::ToolSpawn { .. }));
    }
}
