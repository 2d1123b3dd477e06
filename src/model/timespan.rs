//! Parser for irregular human-written role strings with embedded date ranges
//!
//! Archive lineup tables carry strings such as
//! `"Bass (1989-2004, 2007, 2017-present)"` or `"Guitars (earlier), Vocals"`.
//! This module turns them into ordered `(role, [span...])` records.
//! Malformed tokens are dropped at debug log level; partial data is always
//! preferred over failing the whole entity.

use serde::{Deserialize, Serialize};

/// One bound of a time span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    /// A concrete calendar year
    Year(u16),

    /// Open-ended bound, written "present" in the source
    Present,

    /// The source marked the bound as unknown ("?")
    Unknown,
}

impl Bound {
    /// Returns the concrete year, if this bound has one
    pub fn year(&self) -> Option<u16> {
        match self {
            Self::Year(y) => Some(*y),
            _ => None,
        }
    }
}

/// A (start, end) pair of bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Bound,
    pub end: Bound,
}

impl TimeSpan {
    pub fn new(start: Bound, end: Bound) -> Self {
        Self { start, end }
    }

    /// Single-year span
    pub fn year(y: u16) -> Self {
        Self::new(Bound::Year(y), Bound::Year(y))
    }

    /// Returns true if either bound is unknown
    pub fn has_unknown_bound(&self) -> bool {
        self.start == Bound::Unknown || self.end == Bound::Unknown
    }

    /// Span length in years, inclusive of neither bound being concrete.
    ///
    /// Spans with an unknown or open-ended bound are retained in records but
    /// excluded from duration arithmetic, so this returns None for them.
    pub fn duration_years(&self) -> Option<u16> {
        match (self.start, self.end) {
            (Bound::Year(s), Bound::Year(e)) if e >= s => Some(e - s),
            _ => None,
        }
    }
}

/// One role with its ordered spans, as parsed from a raw role string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpans {
    pub role: String,
    pub spans: Vec<TimeSpan>,
}

/// Parses a raw role string into ordered (role, spans) records.
///
/// The grammar is irregular, so parsing is shape-driven:
/// 1. Split on `"),"` boundaries, re-appending the closing parenthesis to
///    every segment but the last. This keeps digitless parenthetical
///    qualifiers like `"(earlier)"` attached to their role.
/// 2. A segment with no digit is a bare role with no spans.
/// 3. Otherwise the segment splits on `"("`; qualifier groups without digits
///    are descriptive (e.g. `"(Session)"`) and fold back into the role
///    label, while digit-bearing groups are span lists.
/// 4. Span tokens are classified by shape; anything unrecognized is skipped.
pub fn parse_role_spans(raw: &str) -> Vec<RoleSpans> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();

    let segments: Vec<String> = split_segments(raw);
    for segment in &segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        if !segment.chars().any(|c| c.is_ascii_digit()) {
            out.push(RoleSpans {
                role: segment.trim_end_matches(',').trim().to_string(),
                spans: Vec::new(),
            });
            continue;
        }

        out.push(parse_segment(segment));
    }

    out
}

/// Splits the raw string on `"),"` and restores the parenthesis on all but
/// the last piece.
fn split_segments(raw: &str) -> Vec<String> {
    let pieces: Vec<&str> = raw.split("),").collect();
    let last = pieces.len() - 1;
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            if i < last {
                format!("{})", p)
            } else {
                p.to_string()
            }
        })
        .collect()
}

/// Parses one digit-bearing segment into a role label and its spans.
fn parse_segment(segment: &str) -> RoleSpans {
    let mut parts = segment.split('(');

    // Everything before the first parenthesis is the role prefix. Multiple
    // roles sharing one span group ("Drums, Vocals (1990-1995)") stay a
    // single combined label.
    let mut role = parts.next().unwrap_or("").trim().to_string();
    let mut spans = Vec::new();

    for group in parts {
        let group = group.trim().trim_end_matches(')').trim();
        if group.is_empty() {
            continue;
        }

        if !group.chars().any(|c| c.is_ascii_digit()) {
            // Descriptive qualifier, part of the role label
            if role.is_empty() {
                role = format!("({})", group);
            } else {
                role = format!("{} ({})", role, group);
            }
            continue;
        }

        for token in group.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match parse_span_token(token) {
                Some(span) => spans.push(span),
                None => {
                    tracing::debug!("Skipping unrecognized span token: {:?}", token);
                }
            }
        }
    }

    RoleSpans {
        role: role.trim_end_matches(',').trim().to_string(),
        spans,
    }
}

/// Classifies one span token by shape.
///
/// * `1989` → single-year span
/// * `1989-2004` → explicit range
/// * `1989-present` → explicit start, open end
/// * `?-1993`, `1989-?`, `?-?` → unknown bound on the `?` side
fn parse_span_token(token: &str) -> Option<TimeSpan> {
    if let Some(year) = parse_year(token) {
        return Some(TimeSpan::year(year));
    }

    let (left, right) = token.split_once('-')?;
    let left = left.trim();
    let right = right.trim();

    let start = if left == "?" {
        Bound::Unknown
    } else {
        Bound::Year(parse_year(left)?)
    };

    let end = if right == "?" {
        Bound::Unknown
    } else if right.eq_ignore_ascii_case("present") {
        Bound::Present
    } else {
        Bound::Year(parse_year(right)?)
    };

    Some(TimeSpan::new(start, end))
}

/// Parses a token that is exactly four digits.
fn parse_year(token: &str) -> Option<u16> {
    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(raw: &str) -> Vec<RoleSpans> {
        parse_role_spans(raw)
    }

    #[test]
    fn test_bare_role_no_spans() {
        let parsed = spans("Guitars");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].role, "Guitars");
        assert!(parsed[0].spans.is_empty());
    }

    #[test]
    fn test_single_year() {
        let parsed = spans("Drums (1993)");
        assert_eq!(parsed[0].role, "Drums");
        assert_eq!(parsed[0].spans, vec![TimeSpan::year(1993)]);
    }

    #[test]
    fn test_explicit_range_roundtrip() {
        let parsed = spans("Vocals (1989-2004)");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Year(1989), Bound::Year(2004))]
        );
    }

    #[test]
    fn test_mixed_span_group() {
        // Concrete scenario: "Bass (1989-2004, 2007, 2017-present)"
        let parsed = spans("Bass (1989-2004, 2007, 2017-present)");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].role, "Bass");
        assert_eq!(
            parsed[0].spans,
            vec![
                TimeSpan::new(Bound::Year(1989), Bound::Year(2004)),
                TimeSpan::year(2007),
                TimeSpan::new(Bound::Year(2017), Bound::Present),
            ]
        );
    }

    #[test]
    fn test_present_is_never_a_year() {
        let parsed = spans("Bass (2017-present)");
        assert_eq!(parsed[0].spans[0].end, Bound::Present);
        assert_eq!(parsed[0].spans[0].end.year(), None);

        let parsed = spans("Bass (2017-Present)");
        assert_eq!(parsed[0].spans[0].end, Bound::Present);
    }

    #[test]
    fn test_unknown_bounds() {
        let parsed = spans("Keyboards (?-?)");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Unknown, Bound::Unknown)]
        );

        let parsed = spans("Keyboards (?-1993)");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Unknown, Bound::Year(1993))]
        );

        let parsed = spans("Keyboards (1990-?)");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Year(1990), Bound::Unknown)]
        );
    }

    #[test]
    fn test_unknown_excluded_from_duration() {
        let span = TimeSpan::new(Bound::Year(1990), Bound::Unknown);
        assert!(span.has_unknown_bound());
        assert_eq!(span.duration_years(), None);

        let span = TimeSpan::new(Bound::Year(1990), Bound::Year(1995));
        assert_eq!(span.duration_years(), Some(5));
    }

    #[test]
    fn test_multiple_roles_with_separate_spans() {
        let parsed = spans("Guitars (1988-1995), Bass (1995-2001)");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].role, "Guitars");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Year(1988), Bound::Year(1995))]
        );
        assert_eq!(parsed[1].role, "Bass");
        assert_eq!(
            parsed[1].spans,
            vec![TimeSpan::new(Bound::Year(1995), Bound::Year(2001))]
        );
    }

    #[test]
    fn test_combined_roles_share_one_span_group() {
        // Both roles stay one combined label with the same spans
        let parsed = spans("Drums, Vocals (1990-1995)");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].role, "Drums, Vocals");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::new(Bound::Year(1990), Bound::Year(1995))]
        );
    }

    #[test]
    fn test_digitless_qualifier_folds_into_role() {
        let parsed = spans("Guitars (Session) (1999)");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].role, "Guitars (Session)");
        assert_eq!(parsed[0].spans, vec![TimeSpan::year(1999)]);
    }

    #[test]
    fn test_digitless_qualifier_roles_preserved() {
        let parsed = spans("Guitars (earlier), Bass (later)");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].role, "Guitars (earlier)");
        assert!(parsed[0].spans.is_empty());
        assert_eq!(parsed[1].role, "Bass (later)");
        assert!(parsed[1].spans.is_empty());
    }

    #[test]
    fn test_trailing_role_without_parenthesis() {
        let parsed = spans("Guitars (1990-1992), Vocals");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].role, "Vocals");
        assert!(parsed[1].spans.is_empty());
    }

    #[test]
    fn test_malformed_tokens_skipped_not_fatal() {
        // Stray annotation text inside the span group is dropped silently
        let parsed = spans("Bass (1990, as guest, 1992-1994)");
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].spans,
            vec![
                TimeSpan::year(1990),
                TimeSpan::new(Bound::Year(1992), Bound::Year(1994)),
            ]
        );
    }

    #[test]
    fn test_empty_tokens_from_stray_commas_skipped() {
        let parsed = spans("Bass (,1990, ,1992)");
        assert_eq!(
            parsed[0].spans,
            vec![TimeSpan::year(1990), TimeSpan::year(1992)]
        );
    }

    #[test]
    fn test_three_digit_year_rejected() {
        let parsed = spans("Bass (999)");
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].spans.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(spans("").is_empty());
        assert!(spans("   ").is_empty());
    }
}
