use clap::Parser;
use friendlink_checker::report::{ReportWriter, Summary};
use friendlink_checker::{Checker, CheckerConfig, Result, load_sites};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Check that friend sites link back to you")]
struct Args {
    /// YAML file listing the sites to check
    #[arg(short, long, default_value = "links.yml")]
    file: PathBuf,

    /// Your own URL, looked for in the friends' link pages
    #[arg(short, long)]
    url: String,

    /// Your previous URL, accepted when the current one is not linked
    #[arg(long = "old-url")]
    old_url: Option<String>,

    /// Title expected next to your link
    #[arg(short, long)]
    title: String,

    /// Number of sites checked at once
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Write one JSON line per site to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Extra anchor text marking a links page, tried after the built-in ones
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Extra path to probe, tried after the built-in ones
    #[arg(long = "path")]
    paths: Vec<String>,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> CheckerConfig {
        let mut config = CheckerConfig::new(self.file, self.url, self.title);
        config.old_link = self.old_url;
        config.concurrency = self.concurrency;
        config.timeout = Duration::from_secs(self.timeout);
        config.report_path = self.report;
        config.extra_keywords = self.keywords;
        config.extra_paths = self.paths;
        config
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: CheckerConfig) -> Result<()> {
    let checker = Checker::new(&config)?;
    let sites = load_sites(&config.config_path)?;
    info!(
        count = sites.len(),
        concurrency = config.concurrency,
        "checking {} sites for links to {}",
        sites.len(),
        config.self_link
    );

    let writer = match &config.report_path {
        Some(path) => {
            let (writer, tx) = ReportWriter::new(path)?;
            Some((tokio::spawn(writer.run()), tx))
        }
        None => None,
    };

    let reports = checker
        .check_all(&sites, writer.as_ref().map(|(_, tx)| tx))
        .await;

    let written = match writer {
        Some((task, tx)) => {
            drop(tx);
            match task.await {
                Ok(result) => result.map(|()| true),
                Err(e) => {
                    error!("report writer task failed: {e}");
                    Ok(false)
                }
            }
        }
        None => Ok(false),
    };

    Summary::from_reports(&reports).log();

    if written? {
        if let Some(path) = &config.report_path {
            info!(path = %path.display(), "report written to {}", path.display());
        }
    }
    Ok(())
}
