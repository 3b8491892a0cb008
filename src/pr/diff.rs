use super::types::ChangedBlock;
use tracing::trace;

/// Running line positions while walking a patch.
///
/// Both counters are seeded from the hunk's new-file start, so `old` only
/// tracks within-hunk movement and is never reported.
#[derive(Debug, Default)]
struct Cursor {
    old: usize,
    new: usize,
}

/// Split one file's unified diff patch into its changed blocks.
///
/// A block is a maximal run of `+`/`-` lines. Context lines and hunk headers
/// close the open block; blocks never span either. Each block carries the
/// new-file line number at which it opened.
///
/// The patch is the per-file fragment GitHub returns for a pull request, so
/// it starts directly with a hunk header:
///   @@ -{old_start},{old_count} +{new_start},{new_count} @@
pub fn extract_changed_blocks(patch: &str) -> Vec<ChangedBlock> {
    let mut blocks = Vec::new();
    let mut cursor = Cursor::default();
    let mut open: Vec<&str> = Vec::new();
    let mut open_line = 0;

    let mut close = |open: &mut Vec<&str>, line: usize, cursor: &Cursor| {
        if open.is_empty() {
            return;
        }
        trace!(line, old_line = cursor.old, lines = open.len(), "closed changed block");
        blocks.push(ChangedBlock {
            line,
            content: open.join("\n"),
        });
        open.clear();
    };

    for line in patch.lines() {
        if line.starts_with("@@") {
            close(&mut open, open_line, &cursor);
            // An unreadable header leaves the counters where they were.
            if let Some(new_start) = parse_new_start(line) {
                cursor.new = new_start;
                cursor.old = new_start;
            }
            continue;
        }

        if line.starts_with('+') || line.starts_with('-') {
            if open.is_empty() {
                open_line = cursor.new;
            }
            open.push(line);
            if line.starts_with('+') {
                cursor.new += 1;
            } else {
                cursor.old += 1;
            }
            continue;
        }

        // "\ No newline at end of file" belongs to the line above it.
        if line.starts_with('\\') {
            continue;
        }

        close(&mut open, open_line, &cursor);
        cursor.old += 1;
        cursor.new += 1;
    }

    close(&mut open, open_line, &cursor);
    blocks
}

/// Read `new_start` out of a hunk header. The count after the comma is
/// optional, as unified diff omits it for single-line ranges.
fn parse_new_start(header: &str) -> Option<usize> {
    let body = header.strip_prefix("@@")?;
    let (ranges, _) = body.split_once("@@")?;
    let mut parts = ranges.split_whitespace();
    let old_part = parts.next()?;
    let new_part = parts.next()?;
    parse_range(old_part, '-')?;
    parse_range(new_part, '+').map(|(start, _)| start)
}

fn parse_range(part: &str, prefix: char) -> Option<(usize, usize)> {
    let range = part.strip_prefix(prefix)?;
    let (start, count) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    Some((start.parse().ok()?, count.parse().ok()?))
}
