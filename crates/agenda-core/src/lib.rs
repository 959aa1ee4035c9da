pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod entry;
pub mod error;
pub mod filter;
pub mod grid;
pub mod i18n;
pub mod preferences;
pub mod render;
pub mod seed;
pub mod state;
pub mod store;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting agenda"
  );

  let cfg = config::AgendaConfig::load(
    cli.config.as_deref()
  )?;
  debug!(?cfg, "config loaded");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut store =
    store::DirStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open record store \
           at {}",
          data_dir.display()
        )
      })?;

  let now = cli.now.unwrap_or_else(Utc::now);
  let stdout = std::io::stdout();
  let mut out = stdout.lock();

  commands::dispatch(
    &mut store,
    &cfg,
    &mut out,
    cli.date,
    now,
    cli.command
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
