//! Window planning over analyzed text
//!
//! Splits text into overlapping windows small enough for one inference call.
//! Offsets are character (Unicode scalar) offsets so that window slices always
//! fall on UTF-8 boundaries and match the indices the inference service
//! reports.

/// A contiguous slice of the analyzed text, dispatched as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWindow<'a> {
    /// Position in window order (0-based)
    pub index: usize,
    /// First character offset (inclusive)
    pub start: usize,
    /// Last character offset (exclusive)
    pub end: usize,
    pub text: &'a str,
}

impl<'a> ChunkWindow<'a> {
    /// Window length in characters
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Byte offset of every character boundary in `text`, including the end
    ///
    /// `offsets[i]` is the byte position of local character `i`;
    /// `offsets[char_len()]` is `text.len()`.
    pub fn char_boundaries(&self) -> Vec<usize> {
        char_boundaries(self.text)
    }
}

fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Plan windows covering `text`
///
/// **Algorithm:**
/// 1. Emit `[start, min(start + max_window, L))`
/// 2. Advance `start` by `max_window - overlap`, or by `max(max_window / 2, 1)`
///    when that step would not move forward
/// 3. Stop once `start >= L`, or once a window has reached the end of the text
///
/// The second stop condition keeps the last window from being a suffix of
/// the one before it. Text of at most `max_window` characters yields exactly
/// one window, and empty text yields none. A `max_window` of 0 is treated
/// as 1.
pub fn plan(text: &str, max_window: usize, overlap: usize) -> Vec<ChunkWindow<'_>> {
    let boundaries = char_boundaries(text);
    let len = boundaries.len() - 1;
    let max_window = max_window.max(1);

    if len == 0 {
        return Vec::new();
    }

    let step = if max_window > overlap {
        max_window - overlap
    } else {
        (max_window / 2).max(1)
    };

    let mut windows = Vec::with_capacity(len / step + 1);
    let mut start = 0;
    while start < len {
        let end = (start + max_window).min(len);
        windows.push(ChunkWindow {
            index: windows.len(),
            start,
            end,
            text: &text[boundaries[start]..boundaries[end]],
        });
        if end == len {
            break;
        }
        start += step;
    }

    tracing::debug!(
        chars = len,
        windows = windows.len(),
        max_window,
        overlap,
        "Planned analysis windows"
    );

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(windows: &[ChunkWindow<'_>]) -> Vec<(usize, usize)> {
        windows.iter().map(|w| (w.start, w.end)).collect()
    }

    #[test]
    fn test_empty_text_has_no_windows() {
        assert!(plan("", 8, 2).is_empty());
    }

    #[test]
    fn test_short_text_is_single_window() {
        for text in ["a", "abcdefg", "abcdefgh"] {
            let windows = plan(text, 8, 2);
            assert_eq!(windows.len(), 1);
            assert_eq!((windows[0].start, windows[0].end), (0, text.chars().count()));
            assert_eq!(windows[0].text, text);
        }
    }

    #[test]
    fn test_short_text_single_window_even_with_large_overlap() {
        let windows = plan("abcdefgh", 8, 7);
        assert_eq!(spans(&windows), vec![(0, 8)]);
    }

    #[test]
    fn test_eight_two_eleven() {
        let text = "abcdefghijk";
        let windows = plan(text, 8, 2);
        assert_eq!(spans(&windows), vec![(0, 8), (6, 11)]);
        assert_eq!(windows[0].text, "abcdefgh");
        assert_eq!(windows[1].text, "ghijk");
        assert_eq!(windows[1].index, 1);
    }

    #[test]
    fn test_coverage_and_overlap() {
        let text: String = (0..137).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (max_window, overlap) in [(10, 3), (16, 0), (50, 49), (7, 1)] {
            let windows = plan(&text, max_window, overlap);

            assert_eq!(windows.first().unwrap().start, 0);
            assert_eq!(windows.last().unwrap().end, 137);

            for pair in windows.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                // No gaps
                assert!(b.start <= a.end);
                // Non-final windows are full width and overlap exactly
                assert_eq!(a.char_len(), max_window);
                assert_eq!(a.end - b.start, overlap);
            }
        }
    }

    #[test]
    fn test_pathological_overlap_still_progresses() {
        let text = "abcdefghijklmnopqrst"; // 20 chars
        let windows = plan(text, 8, 8);
        // Step falls back to 4
        assert_eq!(spans(&windows), vec![(0, 8), (4, 12), (8, 16), (12, 20)]);

        let windows = plan(text, 8, 12);
        assert_eq!(windows[1].start, 4);
    }

    #[test]
    fn test_window_reaching_end_is_final() {
        // 14 chars: [6, 14) already reaches the end, so no [12, 14) follows
        let windows = plan("abcdefghijklmn", 8, 2);
        assert_eq!(spans(&windows), vec![(0, 8), (6, 14)]);
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        let windows = plan("abc", 0, 0);
        assert_eq!(spans(&windows), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_multibyte_text_sliced_on_char_boundaries() {
        let text = "héllo wörld ñandú";
        let windows = plan(text, 6, 2);
        let total = text.chars().count();

        assert_eq!(windows.last().unwrap().end, total);
        for window in &windows {
            let expected: String = text
                .chars()
                .skip(window.start)
                .take(window.end - window.start)
                .collect();
            assert_eq!(window.text, expected);
            assert_eq!(window.text.chars().count(), window.char_len());
        }
    }

    #[test]
    fn test_char_boundaries() {
        let window = ChunkWindow {
            index: 0,
            start: 0,
            end: 3,
            text: "aéb",
        };
        assert_eq!(window.char_boundaries(), vec![0, 1, 3, 4]);
    }
}
