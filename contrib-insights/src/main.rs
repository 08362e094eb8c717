//! Command-line interface for the contrib-insights binary.
//!
//! Prints the weekly contributor meeting digests to stdout, stopping at the
//! first failure.

use std::{io, path::PathBuf, process};

use clap::{ArgAction, Parser};
use contrib_insights::{
    DashboardClient, DigestGenerator, Error, GithubSearch, InsightsConfig, OutputFormat,
    ReportWindow, init_tracing, load_config, run_report,
};

/// Command line interface for generating contributor meeting insights.
#[derive(Debug, Parser,)]
#[command(
    name = "contrib-insights",
    version,
    about = "Generate weekly contributor meeting insights"
)]
struct Cli
{
    /// Path to a YAML document overriding the built-in report configuration.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// GitHub token used for search requests; anonymous when omitted.
    #[arg(
        long = "github-token",
        value_name = "TOKEN",
        env = "GITHUB_TOKEN",
        hide_env_values = true
    )]
    github_token: Option<String,>,

    /// Emit one JSON object per digest instead of text lines.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,

    /// Log requests to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Cli
{
    fn output_format(&self,) -> OutputFormat
    {
        if self.json { OutputFormat::Json } else { OutputFormat::Text }
    }

    fn token(&self,) -> Option<&str,>
    {
        self.github_token.as_deref().map(str::trim,).filter(|value| !value.is_empty(),)
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    if let Err(error,) = run().await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, client and output errors.
async fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();
    init_tracing(cli.verbose,);

    let config = resolve_config(&cli,)?;
    let search = GithubSearch::new(&config.github, cli.token(),)?;
    let dashboard = DashboardClient::new(&config.dashboard,)?;
    let generator = DigestGenerator::new(&config, search, dashboard, ReportWindow::current(),);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    run_report(&generator, &mut handle, cli.output_format(),).await
}

fn resolve_config(cli: &Cli,) -> Result<InsightsConfig, Error,>
{
    match cli.config.as_deref() {
        Some(path,) => load_config(path,),
        None => Ok(InsightsConfig::default(),),
    }
}
