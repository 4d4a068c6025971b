//! Command line interface for mkdmg.

mod args;

pub use args::Args;

use crate::dmg::{EventSink, LogSink, NoopSink, Runner};
use crate::error::Result;
use std::sync::Arc;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    init_logging(args.verbose);

    let sink: Arc<dyn EventSink> = if args.verbose {
        Arc::new(LogSink)
    } else {
        Arc::new(NoopSink)
    };

    let config = args.into_config()?;
    let mut runner = Runner::with_sink(config, sink);
    runner.run().await?;

    Ok(0)
}

/// `RUST_LOG` wins; otherwise `-v` raises the level to info.
fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}
