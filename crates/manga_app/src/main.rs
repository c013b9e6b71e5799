mod cli;
mod config_file;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use manga_engine::{listen_for_interrupts, Engine, RunConfig};
use manga_logging::{init_session, manga_error, SessionOptions};

use crate::cli::{Cli, Command, DownloadArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Download(args) => download(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            manga_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut options = SessionOptions::default();
    if cli.verbose {
        options.terminal_level = LevelFilter::Debug;
    }
    if let Some(path) = &cli.log_file {
        options.log_file = Some(path.clone());
    }
    if let Err(err) = init_session(&options) {
        eprintln!("warning: {err}; logging to the terminal only");
        options.log_file = None;
        let _ = init_session(&options);
    }
}

fn download(args: &DownloadArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => config_file::load_run_config(path)?,
        None => RunConfig::default(),
    };
    args.apply(&mut config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let summary = runtime.block_on(async {
        let engine = Engine::new(config)?;
        let listener = listen_for_interrupts(engine.shutdown_handle());
        let result = engine.run().await;
        listener.abort();
        result
    })?;

    println!("{summary}");
    Ok(())
}
