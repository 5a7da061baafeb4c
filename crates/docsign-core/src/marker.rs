//! End-of-body marker detection
//!
//! Documents end their body with a literal `./.`; the signature block
//! follows. Text extraction may split the token across up to three
//! adjacent fragments (`"./" "."`, `"." "/."`, `"." "/" "."`), so detection
//! looks ahead within the page. The first piece may carry preceding body
//! text; continuation pieces must match exactly once trimmed.

use shared_types::TextFragment;

pub const DEFAULT_END_MARKER: &str = "./.";

/// Most fragments a single marker may be split across
const MAX_MARKER_PIECES: usize = 3;

/// An end-of-body token to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndMarker {
    token: String,
}

impl EndMarker {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether a single fragment's text completes the body
    pub fn ends_body(&self, text: &str) -> bool {
        ends_body_with(&self.token, text)
    }

    /// Index of the fragment completing the marker, scanning from `start`
    pub fn detect(&self, fragments: &[TextFragment], start: usize) -> Option<usize> {
        detect_with(&self.token, fragments, start)
    }
}

impl Default for EndMarker {
    fn default() -> Self {
        Self::new(DEFAULT_END_MARKER)
    }
}

/// Whether `text` is, or ends with, the `./.` marker once trimmed
pub fn ends_body(text: &str) -> bool {
    ends_body_with(DEFAULT_END_MARKER, text)
}

/// Find the first `./.` marker at or after `start`.
///
/// Returns the index of the fragment that completes the marker, so name
/// matching resumes at the next index.
pub fn detect_end_marker(fragments: &[TextFragment], start: usize) -> Option<usize> {
    detect_with(DEFAULT_END_MARKER, fragments, start)
}

fn ends_body_with(token: &str, text: &str) -> bool {
    !token.is_empty() && text.trim().ends_with(token)
}

/// Byte offsets that split `s` into two non-empty parts
fn split_points(s: &str) -> impl Iterator<Item = usize> + '_ {
    s.char_indices().map(|(i, _)| i).filter(|&i| i > 0)
}

fn detect_with(token: &str, fragments: &[TextFragment], start: usize) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    let peek = |i: usize| fragments.get(i).map(TextFragment::trimmed);

    for i in start..fragments.len() {
        let text = fragments[i].trimmed();
        if text.ends_with(token) {
            return Some(i);
        }

        for head_len in split_points(token) {
            if !text.ends_with(&token[..head_len]) {
                continue;
            }
            let rest = &token[head_len..];
            if let Some(end) = continuation(rest, i + 1, &peek, MAX_MARKER_PIECES - 1) {
                return Some(end);
            }
        }
    }
    None
}

/// Match `rest` against the fragments starting at `index`, using at most
/// `pieces` fragments. Returns the index of the completing fragment.
fn continuation<'a>(
    rest: &str,
    index: usize,
    peek: &impl Fn(usize) -> Option<&'a str>,
    pieces: usize,
) -> Option<usize> {
    let text = peek(index)?;
    if text == rest {
        return Some(index);
    }
    if pieces < 2 {
        return None;
    }
    split_points(rest)
        .filter(|&at| text == &rest[..at])
        .find_map(|at| continuation(&rest[at..], index + 1, peek, pieces - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::PageNumber;

    fn frags(texts: &[&str]) -> Vec<TextFragment> {
        texts
            .iter()
            .map(|t| TextFragment::new(*t, 0.0, 0.0, 10.0, 10.0, PageNumber::FIRST).unwrap())
            .collect()
    }

    #[test]
    fn test_ends_body() {
        assert!(ends_body("./."));
        assert!(ends_body("  ./.  "));
        assert!(ends_body("Noi nhan: ./."));
        assert!(!ends_body("./"));
        assert!(!ends_body("./. more"));
        assert!(!ends_body(""));
    }

    #[test]
    fn test_single_fragment_marker() {
        assert_eq!(detect_end_marker(&frags(&["body", "./.", "name"]), 0), Some(1));
    }

    #[test]
    fn test_marker_with_leading_body_text() {
        assert_eq!(detect_end_marker(&frags(&["the end ./."]), 0), Some(0));
    }

    #[test]
    fn test_split_dot_slash_then_dot() {
        assert_eq!(detect_end_marker(&frags(&["body", "./", "."]), 0), Some(2));
    }

    #[test]
    fn test_split_dot_then_slash_dot() {
        assert_eq!(detect_end_marker(&frags(&["end.", " /. "]), 0), Some(1));
    }

    #[test]
    fn test_split_in_three() {
        assert_eq!(detect_end_marker(&frags(&["x", ".", "/", "."]), 0), Some(3));
    }

    #[test]
    fn test_continuation_must_be_exact() {
        assert_eq!(detect_end_marker(&frags(&["./", ".x"]), 0), None);
        assert_eq!(detect_end_marker(&frags(&[".", "/", "x."]), 0), None);
        assert_eq!(detect_end_marker(&frags(&[".", "x", "/."]), 0), None);
    }

    #[test]
    fn test_lookahead_stops_at_slice_end() {
        assert_eq!(detect_end_marker(&frags(&["body", "./"]), 0), None);
        assert_eq!(detect_end_marker(&frags(&[]), 0), None);
    }

    #[test]
    fn test_scan_respects_start() {
        let fragments = frags(&["./.", "a", "./."]);
        assert_eq!(detect_end_marker(&fragments, 1), Some(2));
        assert_eq!(detect_end_marker(&fragments, 3), None);
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(detect_end_marker(&frags(&["./", ".", "./."]), 0), Some(1));
    }

    #[test]
    fn test_custom_marker() {
        let marker = EndMarker::new(" END ");
        assert_eq!(marker.token(), "END");
        assert!(marker.ends_body("THE END"));
        assert_eq!(marker.detect(&frags(&["E", "N", "D"]), 0), Some(2));
        assert_eq!(marker.detect(&frags(&["EN", "D"]), 0), Some(1));
        assert_eq!(marker.detect(&frags(&["E", "N", "D", "x"]), 1), None);
    }
}
