use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::domain::TestCase;
use crate::core::errors::JudgeError;

/// Collects the test cases found at `path`.
///
/// A directory yields every file directly inside it that ends with
/// `input_extension`. A single file is taken as the only input, and its own
/// extension replaces `input_extension`. The expected output of each input
/// sits next to it with `output_extension` instead.
pub fn discover(
    path: &Path,
    input_extension: &str,
    output_extension: &str,
) -> Result<Vec<TestCase>, JudgeError> {
    if !path.exists() {
        return Err(JudgeError::NotFound(path.to_path_buf()));
    }

    if path.is_file() {
        let input_extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        return Ok(pair(path, &input_extension, output_extension)
            .into_iter()
            .collect());
    }

    let mut cases = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| JudgeError::Scan {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(case) = pair(entry.path(), input_extension, output_extension) {
            cases.push(case);
        }
    }

    cases.sort_by(|a, b| case_order(&a.name, &b.name));
    tracing::debug!(count = cases.len(), path = %path.display(), "discovered test cases");
    Ok(cases)
}

fn pair(input: &Path, input_extension: &str, output_extension: &str) -> Option<TestCase> {
    let file_name = input.file_name()?.to_str()?;
    let name = file_name.strip_suffix(input_extension)?;
    let expected: PathBuf = input.with_file_name(format!("{name}{output_extension}"));

    Some(TestCase {
        name: name.to_string(),
        input: input.to_path_buf(),
        expected,
    })
}

/// Numeric value of an all-digit name that safely fits in an `i64`.
fn numeric_key(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.len() > 19 || (name.len() == 19 && name.starts_with('9')) {
        return None;
    }
    name.parse().ok()
}

/// Numeric names first in numeric order, then everything else by name.
fn case_order(a: &str, b: &str) -> Ordering {
    match (numeric_key(a), numeric_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
