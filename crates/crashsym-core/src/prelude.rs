//! Common module for library exports

pub use crate::config::{SymbolizerConfig, SymbolizerConfigBuilder};
pub use crate::error::{Result, SymbolizeError};
pub use crate::session::Symbolizer;
pub use crate::tools::{SystemTools, ToolRunner};
pub use crate::types::{Address, Architecture, Dialect, Frame, Resolution};
