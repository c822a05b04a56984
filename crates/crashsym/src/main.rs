use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use crashsym_core::config::{SymbolizerConfig, DEFAULT_KERNEL_NAME, DEFAULT_STACK_SIZE, DEFAULT_TOOLCHAIN_DIR};
use crashsym_core::Symbolizer;
use crashsym_utils::{info, init_logging_with, LogFormat, LogLevel, LogSettings};

/// Symbolizes kernel panic, userspace crash and sanitizer backtraces in a log stream.
#[derive(Parser, Debug)]
#[command(name = "crashsym")]
#[command(version)]
#[command(about = "Symbolizes kernel panic, userspace crash and sanitizer backtraces in a log stream", long_about = None)]
struct Cli
{
    /// Log file to read (default: standard input)
    input: Option<PathBuf>,

    /// Architecture assumed until an `arch:` line is seen (default: host)
    #[arg(short, long, env = "CRASHSYM_ARCH")]
    arch: Option<String>,

    /// Build output directory; repeat to search several, in order
    #[arg(short = 'b', long = "build-dir", env = "CRASHSYM_BUILD_DIR", value_delimiter = ',')]
    build_dirs: Vec<PathBuf>,

    /// Stack size in bytes used for overflow analysis
    #[arg(long, env = "CRASHSYM_STACK_SIZE", default_value_t = DEFAULT_STACK_SIZE)]
    stack_size: u64,

    /// Disassemble the function of each resolved frame
    #[arg(short, long, env = "CRASHSYM_DISASSEMBLE", default_value_t = false)]
    disassemble: bool,

    /// Path of the addr2line binary
    #[arg(long, env = "CRASHSYM_ADDR2LINE")]
    addr2line: Option<PathBuf>,

    /// Path of the gdb binary
    #[arg(long, env = "CRASHSYM_GDB")]
    gdb: Option<PathBuf>,

    /// Path of the nm binary
    #[arg(long, env = "CRASHSYM_NM")]
    nm: Option<PathBuf>,

    /// Toolchain root for default tool discovery
    #[arg(long, env = "CRASHSYM_TOOLCHAIN_DIR", default_value = DEFAULT_TOOLCHAIN_DIR)]
    toolchain_dir: PathBuf,

    /// Executable name used for `<application>` DSOs
    #[arg(long, env = "CRASHSYM_APP_NAME")]
    app_name: Option<String>,

    /// Kernel binary searched for on a kernel panic
    #[arg(long, env = "CRASHSYM_KERNEL_NAME", default_value = DEFAULT_KERNEL_NAME)]
    kernel_name: String,

    /// Echo input lines (default: on unless reading from a terminal)
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_echo")]
    echo: bool,

    /// Do not echo input lines
    #[arg(long, action = ArgAction::SetTrue)]
    no_echo: bool,

    /// Diagnostic log level (overrides RUST_LOG)
    #[arg(long, env = "CRASHSYM_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Diagnostic log format: pretty or json
    #[arg(long, env = "CRASHSYM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Diagnostic log file, in addition to standard error
    #[arg(long, env = "CRASHSYM_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Cli
{
    fn echo(&self) -> bool
    {
        if self.echo {
            true
        } else if self.no_echo {
            false
        } else {
            self.input.is_some() || !io::stdin().is_terminal()
        }
    }

    fn config(&self) -> SymbolizerConfig
    {
        let mut builder = SymbolizerConfig::builder()
            .stack_size(self.stack_size)
            .disassemble(self.disassemble)
            .toolchain_dir(&self.toolchain_dir)
            .kernel_name(&self.kernel_name)
            .echo(self.echo());

        if let Some(arch) = &self.arch {
            builder = builder.architecture(arch.as_str());
        }
        if !self.build_dirs.is_empty() {
            builder = builder.build_dirs(self.build_dirs.iter().cloned());
        }
        if let Some(path) = &self.addr2line {
            builder = builder.addr2line(path);
        }
        if let Some(path) = &self.gdb {
            builder = builder.gdb(path);
        }
        if let Some(path) = &self.nm {
            builder = builder.nm(path);
        }
        if let Some(name) = &self.app_name {
            builder = builder.app_name(name);
        }
        builder.build()
    }
}

fn main()
{
    let cli = Cli::parse();

    let settings = LogSettings {
        level: cli.log_level,
        format: cli.log_format.unwrap_or_default(),
        file: cli.log_file.clone(),
    };
    let _guard = match init_logging_with(&settings) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let config = cli.config();
    info!(
        "symbolizing for {} with build dirs {:?}",
        config.architecture, config.build_dirs
    );
    let mut symbolizer = Symbolizer::with_system_tools(config);
    let stdout = io::stdout().lock();

    match &cli.input {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("can't open {}: {e}", path.display()))?;
            symbolizer.run(BufReader::new(file), stdout)?;
        }
        None => symbolizer.run(io::stdin().lock(), stdout)?,
    }
    Ok(())
}
