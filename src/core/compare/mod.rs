//! Comparison of expected and actual program output.
//!
//! Both texts are normalized to `\n` line endings and compared line by line.
//! The first difference becomes a [`DiffReport`] whose excerpts are bounded
//! regardless of how large the outputs are.

pub mod report;

use itertools::{EitherOrBoth, Itertools};

pub use report::{DiffReport, Excerpt, LineCounts, Segment};

/// Collapses `\r\n` and lone `\r` into `\n`.
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            chars.next_if_eq(&'\n');
            normalized.push('\n');
        } else {
            normalized.push(ch);
        }
    }
    normalized
}

/// Compares `actual` against `expected`.
///
/// Outside of `strict` mode trailing spaces of every line are ignored. A
/// trailing line feed never counts as an extra empty line.
pub fn compare(expected: &str, actual: &str, strict: bool) -> Result<(), DiffReport> {
    let expected = normalize(expected);
    let actual = normalize(actual);

    if expected.is_empty() != actual.is_empty() {
        return Err(DiffReport {
            line: None,
            expected: report::lone_side(&expected, false),
            actual: report::lone_side(&actual, true),
            line_counts: None,
        });
    }

    let trim = |line: &str| -> String {
        if strict {
            line.to_string()
        } else {
            line.trim_end_matches(' ').to_string()
        }
    };

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let line_counts = LineCounts {
        expected: expected_lines.len(),
        actual: actual_lines.len(),
    };

    for (idx, pair) in expected_lines
        .iter()
        .zip_longest(actual_lines.iter())
        .enumerate()
    {
        let line = Some(idx + 1);
        match pair {
            EitherOrBoth::Both(e, a) => {
                if let Some((expected, actual)) = report::diff_line(&trim(e), &trim(a)) {
                    return Err(DiffReport {
                        line,
                        expected,
                        actual,
                        line_counts: None,
                    });
                }
            }
            EitherOrBoth::Left(e) => {
                return Err(DiffReport {
                    line,
                    expected: report::lone_side(&trim(e), false),
                    actual: Excerpt::empty(),
                    line_counts: Some(line_counts),
                });
            }
            EitherOrBoth::Right(a) => {
                return Err(DiffReport {
                    line,
                    expected: Excerpt::empty(),
                    actual: report::lone_side(&trim(a), true),
                    line_counts: Some(line_counts),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize("\r\r\n\n"), "\n\n\n");
        assert_eq!(normalize("plain"), "plain");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for text in ["a\r\n\r\nb", "\r\r\r", "x\ry\r\nz\n", "", "\n\r"] {
            let once = normalize(text);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_compare_is_reflexive() {
        for text in ["", "1\n", "a b c\n  d  \n", "no newline", "x\r\ny\r\n"] {
            assert_eq!(compare(text, text, false), Ok(()));
            assert_eq!(compare(text, text, true), Ok(()));
        }
    }

    #[test]
    fn test_line_endings_do_not_matter() {
        assert_eq!(compare("1\n2\n", "1\r\n2\r\n", true), Ok(()));
        assert_eq!(compare("1\n2\n", "1\n2", true), Ok(()));
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(compare("", "", false), Ok(()));

        let report = compare("", "abc", false).unwrap_err();
        assert_eq!(report.line, None);
        assert_eq!(report.expected, Excerpt::empty());
        assert_eq!(report.actual.highlighted_text(), "abc");
        assert_eq!(report.line_counts, None);

        let report = compare("abc", "", false).unwrap_err();
        assert_eq!(report.line, None);
        assert_eq!(report.expected.visible_text(), "abc");
        assert_eq!(report.actual, Excerpt::empty());
    }

    #[test]
    fn test_trailing_spaces_policy() {
        assert_eq!(compare("abc\n", "abc \n", false), Ok(()));
        assert_eq!(compare("abc   \n", "abc\n", false), Ok(()));

        let report = compare("abc\n", "abc \n", true).unwrap_err();
        assert_eq!(report.line, Some(1));
        assert_eq!(report.actual.highlighted_text(), " ");
    }

    #[test]
    fn test_embedded_spaces_are_significant() {
        let report = compare("a b\n", "a  b\n", false).unwrap_err();
        assert_eq!(report.line, Some(1));
    }

    #[test]
    fn test_first_differing_line_is_reported() {
        let report = compare("1\n2\n3\n", "1\n2\n4\n", false).unwrap_err();
        assert_eq!(report.line, Some(3));
        assert_eq!(report.expected.visible_text(), "3");
        assert_eq!(report.actual.highlighted_text(), "4");
        assert_eq!(report.line_counts, None);
    }

    #[test]
    fn test_missing_lines_report_counts() {
        let report = compare("1\n2\n3\n", "1\n2\n", false).unwrap_err();
        assert_eq!(report.line, Some(3));
        assert_eq!(report.expected.visible_text(), "3");
        assert_eq!(report.actual, Excerpt::empty());
        assert_eq!(
            report.line_counts,
            Some(LineCounts {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_extra_lines_report_counts() {
        let report = compare("1\n", "1\n2\n3\n", false).unwrap_err();
        assert_eq!(report.line, Some(2));
        assert_eq!(report.expected, Excerpt::empty());
        assert_eq!(report.actual.highlighted_text(), "2");
        assert_eq!(
            report.line_counts,
            Some(LineCounts {
                expected: 1,
                actual: 3
            })
        );
    }

    #[test]
    fn test_empty_line_against_text() {
        let report = compare("a\n\nb\n", "a\nx\nb\n", false).unwrap_err();
        assert_eq!(report.line, Some(2));
        assert_eq!(report.expected, Excerpt::empty());
        assert_eq!(report.actual.highlighted_text(), "x");
    }

    #[test]
    fn test_report_display() {
        let report = compare("7\n", "3\n4\n", false).unwrap_err();
        assert_eq!(
            report.to_string(),
            "first difference at line 1\nexpected:\n7\nactual:\n3\n^"
        );

        let report = compare("1\n2\n", "1\n", false).unwrap_err();
        assert_eq!(
            report.to_string(),
            "first difference at line 2\nexpected:\n2\nactual:\n<empty>\n\
             expected 2 lines, actual 1 lines"
        );
    }
}
