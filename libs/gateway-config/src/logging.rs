//! Structured logging init (SPEC_FULL.md §2).
//!
//! Same `tracing` + `tracing-subscriber` (env-filter, json, local-time)
//! shape as `runtime::logging`, stripped of that module's per-crate
//! multi-file rotation: the stdio transport reserves stdout for JSON-RPC
//! frames, so every diagnostic line is pinned to stderr regardless of
//! transport (see DESIGN.md's "dropped teacher code").

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber. `verbose` mirrors the
/// teacher's `-v`/`-vv` counting convention: 0 leaves `RUST_LOG`/default
/// untouched, 1 forces `debug`, 2+ forces `trace`.
pub fn init(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    // tracing_subscriber::fmt().init() can only run once per process;
    // exercised indirectly via the binary's bootstrap path instead of here.
}
