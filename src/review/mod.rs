pub mod types;

pub use types::{BlockOutcome, BlockResult, FileSummary, PostState, ReviewSummary};

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::completion::{CompletionClient, CompletionError};
use crate::pr::diff::extract_changed_blocks;
use crate::pr::{self, ChangedBlock, ChangedFile, GitHubClient, RemoteError, RepoError, RepoSlug};

/// Failures that stop a run before any block is reviewed.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Could not determine GitHub repository: {0}")]
    Remote(#[from] RemoteError),

    #[error("Could not list pull request files: {0}")]
    ListFiles(#[source] RepoError),
}

/// Something that turns a prompt into review text.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError>;
}

/// The pull request operations a review run needs from the hosting API.
#[async_trait]
pub trait PullRequestGateway: Send + Sync {
    async fn list_changed_files(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, RepoError>;

    async fn post_comment(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
        body: &str,
        path: &str,
        line: usize,
    ) -> Result<(), RepoError>;
}

#[async_trait]
impl Completion for CompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError> {
        self.send(prompt, max_tokens).await
    }
}

#[async_trait]
impl PullRequestGateway for GitHubClient {
    async fn list_changed_files(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, RepoError> {
        GitHubClient::list_changed_files(self, slug, pr_number).await
    }

    async fn post_comment(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
        body: &str,
        path: &str,
        line: usize,
    ) -> Result<(), RepoError> {
        GitHubClient::post_comment(self, slug, pr_number, body, path, line).await
    }
}

/// Per-run settings for the review loop.
#[derive(Debug, Clone)]
pub struct ReviewOptions {
    /// Post feedback as inline comments instead of only reporting it
    pub post_comments: bool,
    pub max_tokens: u32,
    pub comment_prefix: String,
}

/// Review a pull request of the repository checked out at `local_dir`.
///
/// Resolving the repository and listing the files are fatal on failure.
/// After that, a failed completion or comment post is logged and recorded in
/// the summary, and the run moves on to the next block.
pub async fn run(
    local_dir: &Path,
    pr_number: u64,
    options: &ReviewOptions,
    gateway: &dyn PullRequestGateway,
    completion: &dyn Completion,
) -> Result<ReviewSummary, ReviewError> {
    let slug = pr::resolve_remote(local_dir).await?;
    info!(owner = %slug.owner, repo = %slug.repo, "resolved repository");
    review_pull_request(slug, pr_number, options, gateway, completion).await
}

/// The review loop proper, once the repository is known.
pub async fn review_pull_request(
    slug: RepoSlug,
    pr_number: u64,
    options: &ReviewOptions,
    gateway: &dyn PullRequestGateway,
    completion: &dyn Completion,
) -> Result<ReviewSummary, ReviewError> {
    let files = gateway
        .list_changed_files(&slug, pr_number)
        .await
        .map_err(ReviewError::ListFiles)?;
    info!(files = files.len(), "listed changed files");

    let mut summary = ReviewSummary {
        slug,
        pr_number,
        files: Vec::with_capacity(files.len()),
        blocks: Vec::new(),
    };

    for file in &files {
        info!(file = %file.filename, additions = file.additions, deletions = file.deletions, "changed file");
    }

    for file in &files {
        let blocks = match file.patch.as_deref() {
            Some(patch) => extract_changed_blocks(patch),
            None => {
                debug!(file = %file.filename, status = %file.status, "no patch, skipping");
                Vec::new()
            }
        };
        summary.files.push(FileSummary {
            filename: file.filename.clone(),
            status: file.status.clone(),
            additions: file.additions,
            deletions: file.deletions,
            blocks: blocks.len(),
        });

        let span = info_span!("review_file", file = %file.filename, blocks = blocks.len());
        let outcomes = review_file(&summary.slug, pr_number, file, &blocks, options, gateway, completion)
            .instrument(span)
            .await;
        summary.blocks.extend(outcomes);
    }

    info!(
        blocks = summary.blocks.len(),
        feedback = summary.feedback_count(),
        posted = summary.posted_count(),
        failures = summary.failure_count(),
        "review complete"
    );
    Ok(summary)
}

async fn review_file(
    slug: &RepoSlug,
    pr_number: u64,
    file: &ChangedFile,
    blocks: &[ChangedBlock],
    options: &ReviewOptions,
    gateway: &dyn PullRequestGateway,
    completion: &dyn Completion,
) -> Vec<BlockOutcome> {
    let mut outcomes = Vec::with_capacity(blocks.len());

    for block in blocks {
        let prompt = build_prompt(&file.filename, block);
        let result = match completion.complete(&prompt, options.max_tokens).await {
            Err(e) => {
                error!(file = %file.filename, line = block.line, error = %e, "completion request failed");
                BlockResult::Failed {
                    error: e.to_string(),
                }
            }
            Ok(text) if text.is_empty() => {
                debug!(line = block.line, "no feedback");
                BlockResult::NoFeedback
            }
            Ok(text) => {
                info!(line = block.line, feedback = %text, "received feedback");
                let posted = if options.post_comments {
                    let body = comment_body(&options.comment_prefix, &text);
                    match gateway
                        .post_comment(slug, pr_number, &body, &file.filename, block.line)
                        .await
                    {
                        Ok(()) => PostState::Posted,
                        Err(e) => {
                            warn!(file = %file.filename, line = block.line, error = %e, "failed to post comment");
                            PostState::Failed {
                                error: e.to_string(),
                            }
                        }
                    }
                } else {
                    PostState::Skipped
                };
                BlockResult::Feedback { text, posted }
            }
        };
        outcomes.push(BlockOutcome {
            file: file.filename.clone(),
            line: block.line,
            result,
        });
    }

    outcomes
}

/// Prompt asking for a review of one changed block.
pub fn build_prompt(filename: &str, block: &ChangedBlock) -> String {
    format!(
        "Code Review Request: Review the following block in file {} starting at line {}. Suggest any improvements:\n\n{}",
        filename, block.line, block.content
    )
}

/// Body of the inline comment posted for a piece of feedback.
pub fn comment_body(prefix: &str, feedback: &str) -> String {
    format!("{}\n{}", prefix, feedback)
}
