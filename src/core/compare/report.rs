use std::fmt;

use itertools::Itertools;

/// Longest prefix shown verbatim before the first difference.
pub const CONTEXT_SHOW_MAX: usize = 30;
/// Prefix characters kept once the prefix is elided.
pub const CONTEXT_SHOW: usize = 20;
/// Longest divergence window shown in full.
pub const DIFF_SHOW_MAX: usize = 80;
/// Divergence characters kept once the window is elided.
pub const DIFF_SHOW: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    /// Actual characters that do not match the expected ones.
    Highlight(String),
    /// Expected characters with no counterpart in the actual output.
    Missing(usize),
    /// Characters hidden to keep the window bounded.
    Elided(usize),
    /// Hidden characters that exist only in the actual output.
    Excess(usize),
    /// Characters the actual output lacks beyond the shown window.
    Shortfall(usize),
    /// The side has no text at all.
    Empty,
}

/// One side of a [`DiffReport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Excerpt {
    pub segments: Vec<Segment>,
}

impl Excerpt {
    pub fn empty() -> Self {
        Self {
            segments: vec![Segment::Empty],
        }
    }

    /// Text a reader would see, without markers or padding.
    pub fn visible_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Plain(text) | Segment::Highlight(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn highlighted_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Highlight(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Appends a segment, merging it into the previous one when both are
    /// text of the same kind.
    fn push(&mut self, segment: Segment) {
        if let Segment::Plain(text) | Segment::Highlight(text) = &segment {
            if text.is_empty() {
                return;
            }
        }
        if let Some(last) = self.segments.last_mut() {
            match (last, &segment) {
                (Segment::Plain(last), Segment::Plain(text))
                | (Segment::Highlight(last), Segment::Highlight(text)) => {
                    last.push_str(text);
                    return;
                }
                _ => {}
            }
        }
        self.segments.push(segment);
    }

    /// Renders the text line and a caret line marking highlighted columns.
    fn render(&self) -> (String, String) {
        let mut text = String::new();
        let mut marks = String::new();
        for segment in &self.segments {
            let (shown, marked) = match segment {
                Segment::Plain(s) => (s.clone(), false),
                Segment::Highlight(s) => (s.clone(), true),
                Segment::Missing(n) => (" ".repeat(*n), true),
                Segment::Elided(n) => (format!("...{n} more..."), false),
                Segment::Excess(n) => (format!("...{n} extra..."), false),
                Segment::Shortfall(n) => (format!("...{n} missing..."), false),
                Segment::Empty => ("<empty>".to_string(), false),
            };
            let width = shown.chars().count();
            marks.push_str(&(if marked { "^" } else { " " }).repeat(width));
            text.push_str(&shown);
        }
        (text, marks.trim_end().to_string())
    }
}

impl fmt::Display for Excerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (text, marks) = self.render();
        f.write_str(&text)?;
        if !marks.is_empty() {
            write!(f, "\n{marks}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCounts {
    pub expected: usize,
    pub actual: usize,
}

/// Where and how two outputs first diverge. Its size does not depend on the
/// size of the compared texts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffReport {
    /// 1-based line of the first difference; `None` when one whole side is empty.
    pub line: Option<usize>,
    pub expected: Excerpt,
    pub actual: Excerpt,
    /// Present when the outputs differ in number of lines.
    pub line_counts: Option<LineCounts>,
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => writeln!(f, "first difference at line {line}")?,
            None => writeln!(f, "one of the outputs is empty")?,
        }
        write!(f, "expected:\n{}\nactual:\n{}", self.expected, self.actual)?;
        if let Some(counts) = self.line_counts {
            write!(
                f,
                "\nexpected {} lines, actual {} lines",
                counts.expected, counts.actual
            )?;
        }
        Ok(())
    }
}

/// Renders a side that has no counterpart on the other one. Actual text is
/// highlighted as a whole, expected text is shown plainly.
pub(super) fn lone_side(text: &str, highlight: bool) -> Excerpt {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Excerpt::empty();
    }

    let mut excerpt = Excerpt::default();
    let shown = if chars.len() > DIFF_SHOW_MAX {
        DIFF_SHOW
    } else {
        chars.len()
    };
    let head: String = chars[..shown].iter().collect();
    excerpt.push(if highlight {
        Segment::Highlight(head)
    } else {
        Segment::Plain(head)
    });

    let hidden = chars.len() - shown;
    if hidden > 0 {
        excerpt.push(if highlight {
            Segment::Excess(hidden)
        } else {
            Segment::Elided(hidden)
        });
    }
    excerpt
}

/// Compares two lines character by character. Returns `None` when equal.
pub(super) fn diff_line(expected: &str, actual: &str) -> Option<(Excerpt, Excerpt)> {
    let e: Vec<char> = expected.chars().collect();
    let a: Vec<char> = actual.chars().collect();

    match (e.is_empty(), a.is_empty()) {
        (true, true) => None,
        (true, false) => Some((Excerpt::empty(), lone_side(actual, true))),
        (false, true) => Some((lone_side(expected, false), Excerpt::empty())),
        (false, false) => {
            let common = e.len().min(a.len());
            let i = (0..common).find(|&k| e[k] != a[k]).unwrap_or(common);
            if i == e.len() && i == a.len() {
                return None;
            }
            Some(divergence(&e, &a, i))
        }
    }
}

fn push_context(excerpt: &mut Excerpt, chars: &[char], i: usize) {
    if i > CONTEXT_SHOW_MAX {
        excerpt.push(Segment::Elided(i - CONTEXT_SHOW));
        excerpt.push(Segment::Plain(chars[i - CONTEXT_SHOW..i].iter().collect()));
    } else {
        excerpt.push(Segment::Plain(chars[..i].iter().collect()));
    }
}

/// `i` is the first differing offset; at most one of the lines may end there.
fn divergence(e: &[char], a: &[char], i: usize) -> (Excerpt, Excerpt) {
    let mut expected = Excerpt::default();
    let mut actual = Excerpt::default();
    push_context(&mut expected, e, i);
    push_context(&mut actual, a, i);

    let e_rest = e.len() - i;
    let e_shown = if e_rest > DIFF_SHOW_MAX {
        DIFF_SHOW
    } else {
        e_rest
    };
    expected.push(Segment::Plain(e[i..i + e_shown].iter().collect()));
    if e_shown < e_rest {
        expected.push(Segment::Elided(e_rest - e_shown));
    }

    let a_rest = a.len() - i;
    let mut a_shown = a_rest.min(e_shown);

    // Within the shown window every actual offset has an expected counterpart.
    let runs = a[i..i + a_shown]
        .iter()
        .enumerate()
        .chunk_by(|&(k, ch)| *ch != e[i + k]);
    for (differs, run) in &runs {
        let text: String = run.map(|(_, ch)| *ch).collect();
        actual.push(if differs {
            Segment::Highlight(text)
        } else {
            Segment::Plain(text)
        });
    }

    if a_shown < e_shown {
        actual.push(Segment::Missing(e_shown - a_shown));
        a_shown = e_shown;
    }

    if e_rest == e_shown && a_shown < a_rest {
        let extra_end = if a_rest <= DIFF_SHOW_MAX {
            a_rest
        } else {
            a_shown.max(DIFF_SHOW)
        };
        if extra_end > a_shown {
            actual.push(Segment::Highlight(
                a[i + a_shown..i + extra_end].iter().collect(),
            ));
            a_shown = extra_end;
        }
    }

    if a_rest > a_shown {
        let hidden = a_rest - a_shown;
        actual.push(if e_rest <= a_shown {
            Segment::Excess(hidden)
        } else {
            Segment::Elided(hidden)
        });
        if e_rest > a_rest {
            actual.push(Segment::Shortfall(e_rest - a_rest));
        }
    } else if e_rest > a_shown {
        actual.push(Segment::Shortfall(e_rest - a_shown));
    }

    (expected, actual)
}
