//! `storefront2app` command line

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use storefront2app::config::resolve_token;
use storefront2app::{
    AppConfig, BuildConfig, BuildRequest, BuildSummary, CloudBuilder, Error, Event, GitCli,
    Result, run_with_cancellation,
};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "warn";

/// Turn a storefront into installable mobile app shells
#[derive(Debug, Parser)]
#[command(name = "storefront2app", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the generated project in the cloud and download the app binaries
    Build(BuildArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Access token (falls back to GITHUB_TOKEN, then the saved config)
    #[arg(short, long)]
    token: Option<String>,

    /// Repository name (default: derived from the app name)
    #[arg(short, long)]
    repo: Option<String>,

    /// Directory the app binaries are written to
    #[arg(short, long, default_value = "./builds")]
    output: PathBuf,

    /// Create the repository as public
    #[arg(long)]
    public: bool,

    /// Save the token into app.config.json for later builds
    #[arg(long)]
    save_token: bool,

    /// Project directory containing output/ and app.config.json
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// REST API root of the repository host
    #[arg(long)]
    api_url: Option<String>,

    /// Git host the project is pushed to
    #[arg(long)]
    git_url: Option<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build(args) => build(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(
                code = e.error_code(),
                precondition = e.is_precondition(),
                error = ?e,
                "build failed"
            );
            println!("\n  Error: {e}\n");
            ExitCode::FAILURE
        }
    }
}

async fn build(args: BuildArgs) -> Result<()> {
    println!("\n  storefront2app - Cloud Build\n");

    let saved = AppConfig::load(&args.dir).await?;
    let token = resolve_token(
        args.token,
        std::env::var("GITHUB_TOKEN").ok(),
        saved.as_ref(),
    )
    .ok_or(Error::MissingToken)?;

    if args.save_token {
        AppConfig::store_token(&args.dir, &token).await?;
        println!("  Token saved to {}", AppConfig::path(&args.dir).display());
    }

    let mut config = BuildConfig::default();
    if let Some(api_url) = args.api_url {
        config.api.api_base_url = api_url;
    }
    if let Some(git_url) = args.git_url {
        config.api.git_base_url = git_url;
    }

    // Availability is reported by the validation stage
    let git = GitCli::from_path().unwrap_or_else(|| GitCli::new(PathBuf::from("git")));
    let builder = CloudBuilder::new(config, Box::new(git))?;

    let printer = tokio::spawn(print_events(builder.subscribe()));

    let request = BuildRequest {
        working_dir: args.dir,
        token,
        repo: args.repo,
        output_dir: args.output,
        public: args.public,
    };
    let result = run_with_cancellation(&builder, request).await;

    // Closing the channel lets the printer drain and exit
    drop(builder);
    printer.await.ok();

    result.map(|_| ())
}

async fn print_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::StageStarted { stage } => println!("\n  {stage}"),
        Event::Info { message, .. } | Event::Success { message, .. } => {
            println!("        {message}")
        }
        Event::Warning { message, .. } => println!("        warning: {message}"),
        Event::BuildComplete { summary } => print_summary(summary),
        Event::RunUpdate { .. } | Event::ArtifactSaved { .. } => {}
    }
}

fn print_summary(summary: &BuildSummary) {
    println!("\n  Build complete!\n");
    println!("  Artifacts: {}", summary.output_dir.display());
    println!("  Repo:      {}", summary.repo_url);
    println!();
}
