use crate::pr::RepoSlug;

/// Everything a run produced, in the order it happened.
#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub slug: RepoSlug,
    pub pr_number: u64,
    pub files: Vec<FileSummary>,
    pub blocks: Vec<BlockOutcome>,
}

impl ReviewSummary {
    pub fn feedback_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b.result, BlockResult::Feedback { .. }))
            .count()
    }

    pub fn posted_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| {
                matches!(
                    b.result,
                    BlockResult::Feedback {
                        posted: PostState::Posted,
                        ..
                    }
                )
            })
            .count()
    }

    /// Blocks whose completion call or comment post failed.
    pub fn failure_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| match &b.result {
                BlockResult::Failed { .. } => true,
                BlockResult::Feedback { posted, .. } => matches!(posted, PostState::Failed { .. }),
                BlockResult::NoFeedback => false,
            })
            .count()
    }
}

/// A changed file as listed for the pull request.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub filename: String,
    pub status: String,
    pub additions: usize,
    pub deletions: usize,
    /// Changed blocks found in the file's patch
    pub blocks: usize,
}

/// What happened to one changed block.
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    pub file: String,
    pub line: usize,
    pub result: BlockResult,
}

#[derive(Debug, Clone)]
pub enum BlockResult {
    Feedback { text: String, posted: PostState },
    /// The model answered with nothing
    NoFeedback,
    /// The completion call failed
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostState {
    Posted,
    /// Comment posting was not enabled for this run
    Skipped,
    Failed { error: String },
}
