//! Logging facilities for Gridstone.
//!
//! Gridstone uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "gridstone_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "gridstone_core::signal";
    /// Keyed value store target.
    pub const DICTIONARY: &str = "gridstone_core::dictionary";
    /// Cross-thread marshaling target.
    pub const DISPATCH: &str = "gridstone_core::dispatch";
    /// Grid engine target.
    pub const GRID: &str = "gridstone::grid";
    /// Inspected object target.
    pub const OBJECT: &str = "gridstone::object";
    /// Property target.
    pub const PROPERTY: &str = "gridstone::property";
    /// Enumeration sub-model target.
    pub const ENUM: &str = "gridstone::enum";
}
