use crate::review::{BlockResult, PostState, ReviewSummary};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print the run summary to the terminal, and also write it as markdown when
/// an output path is given.
#[instrument(skip(summary), fields(pr = summary.pr_number, blocks = summary.blocks.len()))]
pub fn output(summary: &ReviewSummary, output_path: Option<&Path>) -> Result<(), ReportError> {
    debug!("writing report to terminal");
    print_terminal_report(summary);
    if let Some(path) = output_path {
        debug!(path = %path.display(), "writing report to file");
        write_markdown_report(summary, path)?;
    }
    Ok(())
}

/// Terminal layout:
///
/// Owner: org, Repo: repo | PR #42
/// File: src/lib.rs, Changes: +3 -1
///
/// ═══ src/lib.rs:12 ═══
/// <feedback>
/// [posted]
///
/// ═══ Blocks: 4 | Feedback: 2 | Posted: 2 | Failed: 0 ═══
fn print_terminal_report(summary: &ReviewSummary) {
    println!();
    println!(
        "Owner: {}, Repo: {} | PR #{}",
        summary.slug.owner, summary.slug.repo, summary.pr_number
    );
    for file in &summary.files {
        println!(
            "File: {}, Changes: {} {}",
            file.filename,
            format!("+{}", file.additions).green(),
            format!("-{}", file.deletions).red()
        );
    }
    println!();

    for block in &summary.blocks {
        match &block.result {
            BlockResult::NoFeedback => continue,
            BlockResult::Failed { error } => {
                println!("═══ {}:{} ═══", block.file, block.line);
                println!("{} {}", "review failed:".red().bold(), error);
            }
            BlockResult::Feedback { text, posted } => {
                println!("═══ {}:{} ═══", block.file, block.line);
                println!("{}", text.trim());
                println!("{}", colorize_post_state(posted));
            }
        }
        println!();
    }

    println!(
        "═══ Blocks: {} | Feedback: {} | Posted: {} | Failed: {} ═══",
        summary.blocks.len(),
        summary.feedback_count(),
        summary.posted_count(),
        summary.failure_count()
    );
    println!();
}

/// Markdown rendering of the same summary, one section per reviewed block.
fn write_markdown_report(summary: &ReviewSummary, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render_markdown(summary))?;
    Ok(())
}

fn render_markdown(summary: &ReviewSummary) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Review of {} PR #{}\n\n", summary.slug, summary.pr_number));

    md.push_str("## Files\n\n");
    for file in &summary.files {
        md.push_str(&format!(
            "- `{}` ({}) **+{} -{}**, {} block(s)\n",
            file.filename, file.status, file.additions, file.deletions, file.blocks
        ));
    }
    md.push('\n');

    md.push_str("## Feedback\n\n");
    let mut any = false;
    for block in &summary.blocks {
        match &block.result {
            BlockResult::NoFeedback => {}
            BlockResult::Failed { error } => {
                any = true;
                md.push_str(&format!("### `{}:{}`\n\n", block.file, block.line));
                md.push_str(&format!("**Review failed:** {}\n\n", error));
            }
            BlockResult::Feedback { text, posted } => {
                any = true;
                md.push_str(&format!("### `{}:{}`\n\n", block.file, block.line));
                md.push_str(text.trim());
                md.push_str(&format!("\n\n_{}_\n\n", post_state_label(posted)));
            }
        }
    }
    if !any {
        md.push_str("No feedback.\n\n");
    }

    md.push_str(&format!(
        "**Blocks:** {} | **Feedback:** {} | **Posted:** {} | **Failed:** {}\n",
        summary.blocks.len(),
        summary.feedback_count(),
        summary.posted_count(),
        summary.failure_count()
    ));
    md
}

fn post_state_label(state: &PostState) -> String {
    match state {
        PostState::Posted => "posted".to_string(),
        PostState::Skipped => "not posted".to_string(),
        PostState::Failed { error } => format!("posting failed: {}", error),
    }
}

fn colorize_post_state(state: &PostState) -> colored::ColoredString {
    let label = format!("[{}]", post_state_label(state));
    match state {
        PostState::Posted => label.green().bold(),
        PostState::Skipped => label.dimmed(),
        PostState::Failed { .. } => label.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::RepoSlug;
    use crate::review::{BlockOutcome, FileSummary};

    fn sample_summary() -> ReviewSummary {
        ReviewSummary {
            slug: RepoSlug {
                owner: "org".to_string(),
                repo: "repo".to_string(),
            },
            pr_number: 42,
            files: vec![FileSummary {
                filename: "src/lib.rs".to_string(),
                status: "modified".to_string(),
                additions: 3,
                deletions: 1,
                blocks: 3,
            }],
            blocks: vec![
                BlockOutcome {
                    file: "src/lib.rs".to_string(),
                    line: 12,
                    result: BlockResult::Feedback {
                        text: "\nPrefer `?` over unwrap here.".to_string(),
                        posted: PostState::Posted,
                    },
                },
                BlockOutcome {
                    file: "src/lib.rs".to_string(),
                    line: 30,
                    result: BlockResult::NoFeedback,
                },
                BlockOutcome {
                    file: "src/lib.rs".to_string(),
                    line: 41,
                    result: BlockResult::Failed {
                        error: "Completion API returned 429: slow down".to_string(),
                    },
                },
            ],
        }
    }

    fn empty_summary() -> ReviewSummary {
        ReviewSummary {
            files: vec![],
            blocks: vec![],
            ..sample_summary()
        }
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown(&sample_summary());
        assert!(md.contains("# Review of org/repo PR #42"));
        assert!(md.contains("- `src/lib.rs` (modified) **+3 -1**, 3 block(s)"));
        assert!(md.contains("### `src/lib.rs:12`\n\nPrefer `?` over unwrap here.\n\n_posted_"));
        assert!(!md.contains("src/lib.rs:30"));
        assert!(md.contains("**Review failed:** Completion API returned 429"));
        assert!(md.contains("**Blocks:** 3 | **Feedback:** 1 | **Posted:** 1 | **Failed:** 1"));
    }

    #[test]
    fn test_render_markdown_without_feedback() {
        let md = render_markdown(&empty_summary());
        assert!(md.contains("No feedback."));
    }

    #[test]
    fn test_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.md");
        output(&sample_summary(), Some(path.as_path())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Review of org/repo PR #42"));
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&sample_summary(), None).unwrap();
        output(&empty_summary(), None).unwrap();
    }

    #[test]
    fn test_post_state_label() {
        assert_eq!(post_state_label(&PostState::Skipped), "not posted");
        assert_eq!(
            post_state_label(&PostState::Failed {
                error: "boom".to_string()
            }),
            "posting failed: boom"
        );
    }
}
