#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Size-bounded text rendering.
//!
//! Chat channels cap message length, so every message is assembled by
//! [`render_bounded`]: lines are accepted greedily until the next one would
//! not fit, and anything left over is summarized by a trailing
//! `…and N more` marker. The output never exceeds the budget, and the
//! marker count is always the exact number of lines left out.
//!
//! Budgets are measured in `char`s.

pub mod format;
pub mod report;

/// Result of a bounded render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The final text, at most `budget` chars.
    pub text: String,
    /// Lines emitted.
    pub included: usize,
    /// Lines left out and counted in the marker.
    pub omitted: usize,
}

impl Rendered {
    /// Whether any line was left out.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.omitted > 0
    }
}

/// The truncation marker for `omitted` lines.
#[must_use]
pub fn more_marker(omitted: usize) -> String {
    format!("…and {omitted} more")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Renders `header` followed by `lines`, one per line, within `budget`
/// chars.
///
/// When everything fits it is emitted as is. Otherwise lines are accepted
/// in order while the running length plus room for the marker stays within
/// budget; the first line that does not fit ends the listing, and it and
/// every later line are counted in the marker. A line longer than the whole
/// budget is therefore never emitted. The header is dropped only when even
/// the header and the marker together do not fit.
#[must_use]
pub fn render_bounded(header: &str, lines: &[String], budget: usize) -> Rendered {
    let header_len = char_len(header);
    let parts = usize::from(!header.is_empty()) + lines.len();
    let full_len = header_len
        + lines.iter().map(|line| char_len(line)).sum::<usize>()
        + parts.saturating_sub(1);

    if full_len <= budget {
        let mut text = header.to_string();
        let mut started = !header.is_empty();
        for line in lines {
            push_line(&mut text, &mut started, line);
        }
        return Rendered {
            text,
            included: lines.len(),
            omitted: 0,
        };
    }

    // Newline plus the widest marker this input could need.
    let reserve = 1 + char_len(&more_marker(lines.len()));

    let mut text = String::new();
    let mut started = false;
    let mut used = 0;

    if !header.is_empty() && header_len + reserve <= budget {
        push_line(&mut text, &mut started, header);
        used = header_len;
    }

    let mut included = 0;
    for line in lines {
        let cost = usize::from(started) + char_len(line);
        if used + cost + reserve > budget {
            break;
        }
        push_line(&mut text, &mut started, line);
        used += cost;
        included += 1;
    }

    let omitted = lines.len() - included;
    if omitted > 0 {
        let marker = more_marker(omitted);
        if used + usize::from(started) + char_len(&marker) <= budget {
            push_line(&mut text, &mut started, &marker);
        }
    }

    Rendered {
        text,
        included,
        omitted,
    }
}

fn push_line(text: &mut String, started: &mut bool, line: &str) {
    if *started {
        text.push('\n');
    }
    text.push_str(line);
    *started = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize, width: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let label = format!("line {i} ");
                format!("{label}{}", "x".repeat(width.saturating_sub(label.len())))
            })
            .collect()
    }

    fn marker_count(text: &str) -> Option<usize> {
        let tail = text.rsplit('\n').next()?;
        tail.strip_prefix("…and ")?
            .strip_suffix(" more")?
            .parse()
            .ok()
    }

    #[test]
    fn everything_fits() {
        let rendered = render_bounded("Header", &lines(3, 10), 100);
        assert_eq!(rendered.included, 3);
        assert_eq!(rendered.omitted, 0);
        assert_eq!(rendered.text.lines().count(), 4);
        assert!(!rendered.text.contains('…'));
    }

    #[test]
    fn exact_fit_is_not_truncated() {
        let body = vec!["abc".to_string(), "def".to_string()];
        // "H\nabc\ndef" is 9 chars.
        let rendered = render_bounded("H", &body, 9);
        assert_eq!(rendered.text, "H\nabc\ndef");
        assert!(!rendered.is_truncated());
    }

    #[test]
    fn truncates_with_exact_count() {
        let input = lines(50, 20);
        let rendered = render_bounded("Incidents", &input, 200);
        assert!(rendered.text.chars().count() <= 200);
        assert!(rendered.is_truncated());
        assert_eq!(rendered.included + rendered.omitted, 50);
        assert_eq!(marker_count(&rendered.text), Some(rendered.omitted));
        // header plus included lines plus marker
        assert_eq!(rendered.text.lines().count(), rendered.included + 2);
    }

    #[test]
    fn output_never_exceeds_budget() {
        let input = lines(120, 17);
        for budget in [0, 1, 5, 11, 12, 13, 30, 64, 100, 257, 1000, 2000] {
            let rendered = render_bounded("Active incidents", &input, budget);
            assert!(
                rendered.text.chars().count() <= budget,
                "budget {budget} exceeded: {}",
                rendered.text.chars().count()
            );
            assert_eq!(rendered.included + rendered.omitted, input.len());
            if rendered.text.contains('…') {
                assert_eq!(marker_count(&rendered.text), Some(rendered.omitted));
            }
        }
    }

    #[test]
    fn oversize_line_is_dropped_and_counted() {
        let input = vec!["y".repeat(500), "short".to_string()];
        let rendered = render_bounded("H", &input, 100);
        assert_eq!(rendered.included, 0);
        assert_eq!(rendered.omitted, 2);
        assert_eq!(rendered.text, "H\n…and 2 more");
    }

    #[test]
    fn stops_at_first_line_that_does_not_fit() {
        let input = vec!["a".repeat(10), "b".repeat(80), "c".repeat(5)];
        let rendered = render_bounded("H", &input, 40);
        assert_eq!(rendered.included, 1);
        assert_eq!(rendered.omitted, 2);
        assert!(!rendered.text.contains('c'));
    }

    #[test]
    fn multibyte_chars_count_once() {
        let input = vec!["é".repeat(10); 5];
        let rendered = render_bounded("", &input, 54);
        // 5 * 10 chars + 4 newlines
        assert_eq!(rendered.omitted, 0);
        assert_eq!(rendered.text.chars().count(), 54);
    }

    #[test]
    fn empty_input_renders_header_only() {
        let rendered = render_bounded("Nothing new", &[], 100);
        assert_eq!(rendered.text, "Nothing new");
        assert_eq!(rendered.included, 0);
        assert_eq!(rendered.omitted, 0);
    }
}
