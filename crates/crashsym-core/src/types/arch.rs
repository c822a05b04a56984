//! Target architecture.

use std::fmt;
use std::path::PathBuf;

/// Target instruction-set ABI of the backtraces being symbolized
///
/// The architecture selects which toolchain binaries are run and which
/// build directories are searched for DSOs. It starts out as the configured
/// value and changes whenever the stream declares `arch: <token>`.
///
/// ## Example
///
/// ```rust
/// use crashsym_core::types::Architecture;
///
/// assert_eq!(Architecture::parse("x86_64"), Architecture::X86_64);
/// assert_eq!(Architecture::parse("arm64"), Architecture::Arm64);
/// assert_eq!(Architecture::Arm64.build_component(), "arm64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// 64-bit ARM
    Arm64,
    /// Any other architecture, carried by its declared name
    Unknown(String),
}

impl Architecture
{
    /// Parse an architecture token as printed in crash logs.
    pub fn parse(token: &str) -> Self
    {
        match token.trim() {
            "x86_64" | "x64" | "x86-64" => Architecture::X86_64,
            "aarch64" | "arm64" => Architecture::Arm64,
            other => Architecture::Unknown(other.to_string()),
        }
    }

    /// Architecture of the host running the symbolizer
    pub fn current() -> Self
    {
        Architecture::parse(std::env::consts::ARCH)
    }

    /// Name of the build directory component (`build-<component>`)
    pub fn build_component(&self) -> &str
    {
        match self {
            Architecture::X86_64 => "x64",
            Architecture::Arm64 => "arm64",
            Architecture::Unknown(name) => name,
        }
    }

    /// Prefix of the cross toolchain binaries (`<prefix>-elf-addr2line`)
    pub fn tool_prefix(&self) -> &str
    {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "aarch64",
            Architecture::Unknown(name) => name,
        }
    }

    /// Directories to search for DSOs, in priority order.
    ///
    /// For every build root the architecture-specific build directory comes
    /// first, then the root itself.
    pub fn search_roots(&self, build_dirs: &[PathBuf]) -> Vec<PathBuf>
    {
        let component = format!("build-{}", self.build_component());
        build_dirs
            .iter()
            .flat_map(|root| [root.join(&component), root.clone()])
            .collect()
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.tool_prefix())
    }
}

impl From<&str> for Architecture
{
    fn from(token: &str) -> Self
    {
        Architecture::parse(token)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_aliases()
    {
        assert_eq!(Architecture::parse("x64"), Architecture::X86_64);
        assert_eq!(Architecture::parse("aarch64"), Architecture::Arm64);
        assert_eq!(Architecture::parse("riscv64"), Architecture::Unknown("riscv64".to_string()));
    }

    #[test]
    fn test_search_roots_order()
    {
        let roots = Architecture::X86_64.search_roots(&[PathBuf::from("/out/a"), PathBuf::from("/out/b")]);
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/out/a/build-x64"),
                PathBuf::from("/out/a"),
                PathBuf::from("/out/b/build-x64"),
                PathBuf::from("/out/b"),
            ]
        );
    }
}
