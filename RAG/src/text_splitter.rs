use crate::error::{RagError, Result};
use crate::models::TextSegment;

pub const DEFAULT_SEPARATOR: &str = "\n";
pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits text on a separator, then packs the pieces into overlapping segments.
///
/// Lengths are measured in characters. Overlap is carried as whole pieces from
/// the tail of the previous segment, so a segment only exceeds `chunk_size`
/// when a single piece is longer than that on its own.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(separator: impl Into<String>, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap > chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk overlap {} is larger than chunk size {}",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            separator: separator.into(),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            vec![text]
        } else {
            text.split(self.separator.as_str()).collect()
        };
        let pieces = pieces.into_iter().filter(|p| !p.is_empty());
        self.merge_pieces(pieces)
    }

    pub fn create_segments(&self, text: &str) -> Vec<TextSegment> {
        let segments: Vec<TextSegment> = self
            .split_text(text)
            .into_iter()
            .map(TextSegment::new)
            .collect();

        log::info!("Created {} segments", segments.len());
        segments
    }

    fn merge_pieces<'a>(&self, pieces: impl Iterator<Item = &'a str>) -> Vec<String> {
        let separator_len = self.separator.chars().count();
        let mut segments = Vec::new();
        let mut current: Vec<(&str, usize)> = Vec::new();
        let mut total = 0;

        for piece in pieces {
            let len = piece.chars().count();
            let joiner = |count: usize| if count == 0 { 0 } else { separator_len };

            if total + len + joiner(current.len()) > self.chunk_size {
                if total > self.chunk_size {
                    log::warn!(
                        "Created a segment of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    self.flush(&current, &mut segments);

                    // Drop pieces from the front until the tail fits the overlap
                    // budget and the incoming piece fits the segment.
                    while total > self.chunk_overlap
                        || (total > 0 && total + len + joiner(current.len()) > self.chunk_size)
                    {
                        let (_, first_len) = current.remove(0);
                        total -= first_len + if current.is_empty() { 0 } else { separator_len };
                    }
                }
            }

            current.push((piece, len));
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        self.flush(&current, &mut segments);
        segments
    }

    fn flush(&self, pieces: &[(&str, usize)], segments: &mut Vec<String>) {
        let joined = pieces
            .iter()
            .map(|(piece, _)| *piece)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(count: usize, width: usize) -> String {
        (0..count)
            .map(|i| format!("{:0>width$}", i, width = width))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_input_produces_no_segments() {
        assert!(TextSplitter::default().split_text("").is_empty());
        assert!(TextSplitter::default().split_text("\n\n\n").is_empty());
    }

    #[test]
    fn short_input_is_a_single_segment() {
        let segments = TextSplitter::default().split_text("The sky is blue.");
        assert_eq!(segments, vec!["The sky is blue."]);
    }

    #[test]
    fn segments_respect_max_length() {
        let splitter = TextSplitter::new("\n", 50, 10).unwrap();
        let text = lines(40, 9);

        let segments = splitter.split_text(&text);
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.chars().count() <= 50, "segment too long: {:?}", segment);
        }
    }

    #[test]
    fn every_line_survives_in_order() {
        let splitter = TextSplitter::new("\n", 50, 20).unwrap();
        let text = lines(30, 9);

        let segments = splitter.split_text(&text);
        let mut seen = Vec::new();
        for segment in &segments {
            for line in segment.split('\n') {
                if !seen.contains(&line.to_string()) {
                    seen.push(line.to_string());
                }
            }
        }
        let expected: Vec<String> = text.split('\n').map(String::from).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn neighbouring_segments_overlap() {
        let splitter = TextSplitter::new("\n", 50, 20).unwrap();
        let segments = splitter.split_text(&lines(20, 9));

        for pair in segments.windows(2) {
            let last_line_of_prev = pair[0].rsplit('\n').next().unwrap();
            assert!(
                pair[1].contains(last_line_of_prev),
                "{:?} does not carry over {:?}",
                pair[1],
                last_line_of_prev
            );
        }
    }

    #[test]
    fn oversized_piece_is_kept_whole() {
        let splitter = TextSplitter::new("\n", 10, 2).unwrap();
        let long = "x".repeat(25);
        let text = format!("ab\n{}\ncd", long);

        let segments = splitter.split_text(&text);
        assert!(segments.contains(&long));
        assert_eq!(segments.first().map(String::as_str), Some("ab"));
        assert_eq!(segments.last().map(String::as_str), Some("cd"));
    }

    #[test]
    fn overlap_larger_than_size_is_rejected() {
        let err = TextSplitter::new("\n", 100, 200).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfig(_)));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let splitter = TextSplitter::new("\n", 4, 0).unwrap();
        let segments = splitter.split_text("éééé\nüüüü");
        assert_eq!(segments, vec!["éééé", "üüüü"]);
    }
}
