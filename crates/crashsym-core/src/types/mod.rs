//! # Types
//!
//! Plain data types shared by the symbolizer components.
//!
//! These types describe what a backtrace line carries (addresses, frames,
//! DSO declarations) and the target architecture, independently of how the
//! line was recognised or resolved.

pub mod address;
pub mod arch;
pub mod frame;

// Re-export all public types
pub use address::{Address, AddressToken};
pub use arch::Architecture;
pub use frame::{Dialect, DsoRecord, Frame, Resolution};
