//! Parallel task document parser.
//!
//! A parallel document describes N independent tasks as repeated blocks:
//!
//! ```text
//! ---TASK---
//! id: t1
//! backend: codex
//! workdir: /tmp/project
//! reasoning-effort: high
//! ---CONTENT---
//! Do work.
//! ```
//!
//! Header keys are case-insensitive and hyphen/underscore interchangeable;
//! `working_dir`/`workdir` and `reasoning-effort`/`reasoning_effort` are
//! aliases. Unknown keys are ignored for forward compatibility. `id` and
//! `backend` are required. The content section is taken verbatim up to the
//! next `---TASK---` or end of input, with at most one leading and one
//! trailing blank line trimmed.
//!
//! Any malformed block fails the entire parse: task batches launch as a
//! whole, never partially.
//!
//! Non-blank lines before the first `---TASK---` marker are an error, not
//! ignorable preamble: a misspelled first marker would otherwise silently
//! drop that task from the batch.

use crate::error::{Result, WrapperError};

/// Line starting a task block.
pub const TASK_MARKER: &str = "---TASK---";

/// Line separating a block's headers from its content body.
pub const CONTENT_MARKER: &str = "---CONTENT---";

/// One unit of work parsed from a parallel document. Immutable after parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub id: String,
    pub backend: String,
    pub workdir: String,
    pub reasoning_effort: String,
    /// The task prompt body, verbatim.
    pub content: String,
}

/// A parsed parallel document. Block order is preserved; duplicate ids pass
/// through untouched (uniqueness is the consumer's concern).
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub tasks: Vec<TaskDescriptor>,
}

/// Parse a parallel task document.
pub fn parse_parallel_config(input: &str) -> Result<ParallelConfig> {
    let lines: Vec<&str> = input.lines().map(|l| l.trim_end_matches('\r')).collect();

    let mut block_starts = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if line.trim() == TASK_MARKER {
            block_starts.push(idx);
        }
    }

    if block_starts.is_empty() {
        return Err(WrapperError::ParallelParse(format!(
            "no {TASK_MARKER} blocks found"
        )));
    }

    if let Some(line) = lines[..block_starts[0]].iter().find(|l| !l.trim().is_empty()) {
        return Err(WrapperError::ParallelParse(format!(
            "unexpected content before first {TASK_MARKER} marker: {line:?}"
        )));
    }

    let mut tasks = Vec::with_capacity(block_starts.len());
    for (ordinal, &start) in block_starts.iter().enumerate() {
        let end = block_starts
            .get(ordinal + 1)
            .copied()
            .unwrap_or(lines.len());
        let task = parse_block(&lines[start + 1..end], ordinal + 1)?;
        tasks.push(task);
    }

    Ok(ParallelConfig { tasks })
}

fn parse_block(block: &[&str], position: usize) -> Result<TaskDescriptor> {
    let separator = block
        .iter()
        .position(|line| line.trim() == CONTENT_MARKER)
        .ok_or_else(|| {
            WrapperError::ParallelParse(format!(
                "task {position} is unterminated: missing {CONTENT_MARKER} marker"
            ))
        })?;

    let mut task = TaskDescriptor::default();
    for line in &block[..separator] {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(WrapperError::ParallelParse(format!(
                "task {position} has a malformed header line (expected \"key: value\"): {line:?}"
            )));
        };
        // Normalizing hyphens to underscores makes the documented hyphen and
        // underscore spellings of a key interchangeable.
        let key = key.trim().to_lowercase().replace('-', "_");
        let value = value.trim();
        match key.as_str() {
            "id" => task.id = value.to_string(),
            "backend" => task.backend = value.to_string(),
            "working_dir" | "workdir" => task.workdir = value.to_string(),
            "reasoning_effort" => task.reasoning_effort = value.to_string(),
            _ => {} // unknown keys are ignored for forward compatibility
        }
    }

    for (field, value) in [("id", &task.id), ("backend", &task.backend)] {
        if value.is_empty() {
            let label = if task.id.is_empty() {
                format!("task {position}")
            } else {
                format!("task {position} (id {:?})", task.id)
            };
            return Err(WrapperError::ParallelParse(format!(
                "{label} is missing required field {field:?}"
            )));
        }
    }

    let mut content = &block[separator + 1..];
    if content.first().is_some_and(|l| l.trim().is_empty()) {
        content = &content[1..];
    }
    if content.last().is_some_and(|l| l.trim().is_empty()) {
        content = &content[..content.len() - 1];
    }
    task.content = content.join("\n");

    Ok(task)
}
