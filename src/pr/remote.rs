use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::types::RepoSlug;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git remote get-url origin exited with {status}: {stderr}")]
    GitFailed { status: i32, stderr: String },

    #[error("git remote get-url origin printed nothing")]
    EmptyOutput,

    #[error("Unknown git URL format: {url}")]
    UnknownUrlFormat { url: String },
}

/// Find the GitHub owner/repo that the `origin` remote of a local checkout
/// points at.
#[instrument(skip(directory), fields(dir = %directory.display()))]
pub async fn resolve_remote(directory: &Path) -> Result<RepoSlug, RemoteError> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(directory)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RemoteError::GitFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        return Err(RemoteError::EmptyOutput);
    }
    debug!(url = %url, "read origin remote");
    parse_remote_url(&url)
}

/// Parse an SSH (`git@host:owner/repo.git`) or HTTPS
/// (`https://host/owner/repo.git`) remote URL.
pub fn parse_remote_url(url: &str) -> Result<RepoSlug, RemoteError> {
    let unknown = || RemoteError::UnknownUrlFormat {
        url: url.to_string(),
    };

    let host_and_path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')
    } else if let Some(rest) = url.strip_prefix("https://") {
        rest.split_once('/')
    } else {
        None
    };
    let (_host, path) = host_and_path.ok_or_else(unknown)?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(owner: &str, repo: &str) -> RepoSlug {
        RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    #[test]
    fn test_parse_ssh_url() {
        assert_eq!(
            parse_remote_url("git@github.com:owner/repo.git").unwrap(),
            slug("owner", "repo")
        );
    }

    #[test]
    fn test_parse_https_url() {
        assert_eq!(
            parse_remote_url("https://github.com/owner/repo.git").unwrap(),
            slug("owner", "repo")
        );
        assert_eq!(
            parse_remote_url("https://github.com/owner/repo").unwrap(),
            slug("owner", "repo")
        );
    }

    #[test]
    fn test_parse_unknown_urls() {
        for url in [
            "ftp://github.com/owner/repo.git",
            "ssh://git@github.com/owner/repo.git",
            "https://github.com/owner",
            "https://github.com/owner/repo/extra.git",
            "git@github.com:owner/.git",
            "git@github.com",
            "",
        ] {
            assert!(
                matches!(parse_remote_url(url), Err(RemoteError::UnknownUrlFormat { .. })),
                "expected {url:?} to be rejected"
            );
        }
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_resolve_remote_from_checkout() {
        let dir = tempfile::tempdir().unwrap();
        if !git(dir.path(), &["init"]) {
            return; // git not installed
        }
        assert!(git(
            dir.path(),
            &["remote", "add", "origin", "git@github.com:octo/widgets.git"]
        ));

        let resolved = resolve_remote(dir.path()).await.unwrap();
        assert_eq!(resolved, slug("octo", "widgets"));
    }

    #[tokio::test]
    async fn test_resolve_remote_without_origin() {
        let dir = tempfile::tempdir().unwrap();
        if !git(dir.path(), &["init"]) {
            return;
        }
        let err = resolve_remote(dir.path()).await.unwrap_err();
        assert!(matches!(err, RemoteError::GitFailed { .. }));
    }
}
