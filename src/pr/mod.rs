pub mod diff;
pub mod remote;
pub mod types;

pub use remote::{resolve_remote, RemoteError};
pub use types::{ChangedBlock, ChangedFile, RepoSlug};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;
use types::{NewReviewComment, PullRequestHead};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Pull request #{number} not found")]
    PullRequestNotFound { number: u64 },

    #[error("Failed to decode GitHub response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

/// Thin client over the GitHub pull request REST endpoints.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    per_page: usize,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            per_page: config.per_page.max(1),
        }
    }

    fn pulls_url(&self, slug: &RepoSlug, pr_number: u64, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}{}",
            self.api_url, slug.owner, slug.repo, pr_number, tail
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("User-Agent", "pr-reviewer")
            .header("Accept", "application/vnd.github+json");
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    /// List every file changed by a pull request, following pagination
    /// until GitHub returns a short page.
    #[instrument(skip(self), fields(owner = %slug.owner, repo = %slug.repo, pr = pr_number))]
    pub async fn list_changed_files(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, RepoError> {
        let url = self.pulls_url(slug, pr_number, "/files");
        let mut files = Vec::new();
        let mut page = 1usize;

        loop {
            debug!(page, per_page = self.per_page, "fetching changed files page");
            let response = self
                .request(Method::GET, &url)
                .query(&[("per_page", self.per_page), ("page", page)])
                .send()
                .await?;
            let batch: Vec<ChangedFile> = decode(check_status(response).await?).await?;
            let short_page = batch.len() < self.per_page;
            files.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }

        debug!(files = files.len(), pages = page, "listed changed files");
        Ok(files)
    }

    /// Fetch the pull request to learn its current head commit.
    #[instrument(skip(self), fields(owner = %slug.owner, repo = %slug.repo, pr = pr_number))]
    pub async fn pull_request_head(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
    ) -> Result<PullRequestHead, RepoError> {
        let response = self
            .request(Method::GET, &self.pulls_url(slug, pr_number, ""))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::PullRequestNotFound { number: pr_number });
        }
        let pr: PullRequestHead = decode(check_status(response).await?).await?;
        debug!(number = pr.number, head = %pr.head.sha, branch = %pr.head.branch, "resolved PR head");
        Ok(pr)
    }

    /// Post a comment anchored to `line` on the new side of `path`.
    ///
    /// The head commit is looked up fresh for every comment, so comments land
    /// on whatever the pull request points at when they are posted.
    #[instrument(skip(self, body), fields(owner = %slug.owner, repo = %slug.repo, pr = pr_number))]
    pub async fn post_comment(
        &self,
        slug: &RepoSlug,
        pr_number: u64,
        body: &str,
        path: &str,
        line: usize,
    ) -> Result<(), RepoError> {
        let pr = self.pull_request_head(slug, pr_number).await?;
        let comment = NewReviewComment {
            body,
            path,
            commit_id: &pr.head.sha,
            line,
            side: "RIGHT",
        };

        let response = self
            .request(Method::POST, &self.pulls_url(slug, pr_number, "/comments"))
            .json(&comment)
            .send()
            .await?;
        check_status(response).await?;
        debug!("review comment created");
        Ok(())
    }
}

/// Turn a non-2xx response into `RepoError::Status`, keeping the body for
/// the log line.
async fn check_status(response: Response) -> Result<Response, RepoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RepoError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RepoError> {
    let body = response.text().await?;
    decode_body(body)
}

fn decode_body<T: DeserializeOwned>(body: String) -> Result<T, RepoError> {
    serde_json::from_str(&body).map_err(|source| RepoError::Decode { source, body })
}
