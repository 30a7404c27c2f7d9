//! C1 Config Loader: parses, validates, and normalizes the connection list,
//! and carries the ambient CLI/logging surface (SPEC_FULL.md §2).

pub mod cli;
pub mod dialect;
pub mod logging;
mod numeric;
pub mod source;
pub mod spec;

pub use cli::{Cli, Commands};
pub use dialect::Dialect;
pub use source::{load_connections, server_name, ConfigSources};
pub use spec::{ConfigFile, ConnectionSpec, JournalMode, SslMode};

/// Default Oracle NLS language applied when a connection spec omits one
/// (spec §4.1).
pub const DEFAULT_ORACLE_NLS_LANG: &str = "AMERICAN_AMERICA.AL32UTF8";
