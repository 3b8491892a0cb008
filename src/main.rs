mod completion;
mod config;
mod pr;
mod report;
mod review;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::EnvFilter;

/// PR Reviewer: CLI tool that sends each changed block of a GitHub Pull
/// Request to a text-completion model and reports (or posts) its feedback.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// Local checkout of the repository whose `origin` remote is on GitHub
    #[arg(long = "local")]
    local: PathBuf,

    /// Pull Request number to review
    #[arg(long = "pr")]
    pr: u64,

    /// Post the feedback as inline review comments on the Pull Request
    #[arg(long)]
    post_comments: bool,

    /// Optional output file path for a markdown summary
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Token limit per completion request (overrides the config file)
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("pr_review", local = %cli.local.display(), pr = cli.pr).entered();

    info!("loading configuration");
    let config = config::Config::load()?;
    debug!(
        completion_url = %config.openai.api_url,
        github_api = %config.github.api_url,
        "configuration loaded"
    );

    let options = review::ReviewOptions {
        post_comments: cli.post_comments,
        max_tokens: cli.max_tokens.unwrap_or(config.openai.max_tokens),
        comment_prefix: config.review.comment_prefix.clone(),
    };
    let gateway = pr::GitHubClient::new(&config.github);
    let completion = completion::CompletionClient::new(&config.openai);

    info!(post_comments = options.post_comments, "reviewing pull request");
    let summary = match review::run(&cli.local, cli.pr, &options, &gateway, &completion).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "review aborted");
            return Err(e.into());
        }
    };

    report::output(&summary, cli.output.as_deref())?;
    info!(
        feedback = summary.feedback_count(),
        posted = summary.posted_count(),
        failures = summary.failure_count(),
        "done"
    );

    Ok(())
}
