//! Log output shared by the command-line tools.
//!
//! The library reports recoverable problems through `tracing`; its `log`
//! feature forwards those events here when no subscriber is installed.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Logger configuration: warnings by default, debug output with `--debug`.
/// `RUST_LOG` refines the default.
pub fn builder(debug: bool) -> Builder {
    let default = if debug { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).format_target(true);
    builder
}

pub fn init(debug: bool) {
    // A second initialization is ignored.
    let _ = builder(debug).try_init();
}
