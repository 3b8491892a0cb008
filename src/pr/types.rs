use serde::Deserialize;

/// A file changed by a pull request, as listed by the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    /// Path of the file in the repository (e.g., "src/auth/config.rs")
    pub filename: String,
    /// Lines added in this file
    #[serde(default)]
    pub additions: usize,
    /// Lines deleted in this file
    #[serde(default)]
    pub deletions: usize,
    /// "added", "modified", "removed", "renamed", ...
    #[serde(default)]
    pub status: String,
    /// Unified diff fragment. Absent for binary or rename-only changes.
    #[serde(default)]
    pub patch: Option<String>,
}

/// One contiguous run of added/removed lines within a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedBlock {
    /// Line in the modified file where the first changed line of the run sits
    pub line: usize,
    /// The changed lines, newline-joined, with their `+`/`-` prefixes
    pub content: String,
}

/// Owner and repository name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The parts of a pull request needed to anchor a review comment.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub number: u64,
    pub head: CommitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    /// Commit the pull request currently points at
    pub sha: String,
    #[serde(rename = "ref", default)]
    pub branch: String,
}

/// Line-anchored review comment on the new side of the diff.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NewReviewComment<'a> {
    pub body: &'a str,
    pub path: &'a str,
    pub commit_id: &'a str,
    pub line: usize,
    pub side: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_file_from_github_json() {
        let json = include_str!("../../tests/fixtures/pull_files.json");
        let files: Vec<ChangedFile> = serde_json::from_str(json).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "example.go");
        assert_eq!(files[0].additions, 10);
        assert_eq!(files[0].deletions, 2);
        assert_eq!(files[0].status, "modified");
        assert!(files[0].patch.as_deref().unwrap().starts_with("@@ -1,2 +1,2 @@"));
        assert!(files[1].patch.is_none());
    }

    #[test]
    fn test_pull_request_head_from_github_json() {
        let json = include_str!("../../tests/fixtures/pull_request.json");
        let pr: PullRequestHead = serde_json::from_str(json).unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.head.sha, "6dcb09b5b57875f334f61aebed695e2e4193db5e");
        assert_eq!(pr.head.branch, "tidy-config");
    }

    #[test]
    fn test_repo_slug_display() {
        let slug = RepoSlug {
            owner: "org".to_string(),
            repo: "repo".to_string(),
        };
        assert_eq!(slug.to_string(), "org/repo");
    }

    #[test]
    fn test_review_comment_serializes_right_side() {
        let comment = NewReviewComment {
            body: "looks off",
            path: "src/lib.rs",
            commit_id: "abc123",
            line: 7,
            side: "RIGHT",
        };
        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["side"], "RIGHT");
        assert_eq!(value["line"], 7);
        assert_eq!(value["commit_id"], "abc123");
        assert_eq!(value["path"], "src/lib.rs");
    }
}
