use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use manga_engine::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "manga", version)]
#[command(about = "Download manga pages from supported sites into local folders")]
pub struct Cli {
    /// Show debug output on the terminal
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Session log file, appended to on every run
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download every source listed in the input file
    Download(DownloadArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct DownloadArgs {
    /// File with one source URL per line
    #[arg(short = 'f', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Root folder for downloaded images
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Concurrent downloads
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Minimum milliseconds between requests to one host
    #[arg(long = "delay-ms", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Attempts per page before giving up on network errors
    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long = "user-agent", value_name = "UA")]
    pub user_agent: Option<String>,

    /// RON file with run settings; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl DownloadArgs {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(workers) = self.workers {
            config.max_concurrency = workers;
        }
        if let Some(delay) = self.delay_ms {
            config.per_host_delay_ms = delay;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = Some(agent.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_flags_parse() {
        let cli = Cli::try_parse_from([
            "manga", "-v", "download", "-f", "list.txt", "-o", "out", "-w", "2", "--delay-ms",
            "900", "--retries", "5",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Download(args) = cli.command;
        let mut config = RunConfig::default();
        args.apply(&mut config);
        assert_eq!(config.input_path, PathBuf::from("list.txt"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.per_host_delay_ms, 900);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.user_agent, None);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let mut config = RunConfig {
            max_concurrency: 9,
            ..RunConfig::default()
        };
        DownloadArgs::default().apply(&mut config);
        assert_eq!(config.max_concurrency, 9);
    }
}
