//! Document chunking for embedding

/// Chunking configuration
pub const CHUNK_SIZE_CHARS: usize = 1600;
pub const CHUNK_OVERLAP_CHARS: usize = 240;

/// A text segment with its byte offset and page
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    pub byte_offset: usize,
    pub page_number: Option<u32>,
    pub token_count: usize,
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Page of an offset: form feeds act as page breaks, 1-based
fn page_at(content: &str, offset: usize) -> Option<u32> {
    if !content.contains('\u{c}') {
        return None;
    }
    let page = content[..offset.min(content.len())]
        .bytes()
        .filter(|b| *b == 0x0c)
        .count() as u32
        + 1;
    Some(page)
}

/// Character-based chunking with natural break points
pub fn chunk_text(content: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let make = |text: &str, offset: usize| TextChunk {
        text: text.to_string(),
        byte_offset: offset,
        page_number: page_at(content, offset),
        token_count: text.split_whitespace().count(),
    };

    if content.len() <= chunk_size {
        if content.trim().is_empty() {
            return Vec::new();
        }
        return vec![make(content, 0)];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let raw_end = (start + chunk_size).min(content.len());
        let end = floor_char_boundary(content, raw_end);
        let mut chunk_end = end;

        // Find natural break point in last 30%
        if end < content.len() {
            let search_start_raw = start + (chunk_size * 70 / 100);
            let search_start = ceil_char_boundary(content, search_start_raw);

            if search_start < end {
                let search_region = &content[search_start..end];

                if let Some(pos) = search_region.rfind("\n\n") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind(". ") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind('\n') {
                    chunk_end = search_start + pos + 1;
                } else if let Some(pos) = search_region.rfind(' ') {
                    chunk_end = search_start + pos + 1;
                }
            }
        }

        chunk_end = floor_char_boundary(content, chunk_end);
        let text = &content[start..chunk_end];
        if !text.trim().is_empty() {
            chunks.push(make(text, start));
        }

        if chunk_end >= content.len() {
            break;
        }

        let new_start_raw = chunk_end.saturating_sub(overlap);
        start = ceil_char_boundary(content, new_start_raw);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_small_content() {
        let content = "Small content.";
        let chunks = chunk_text(content, 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, content);
        assert_eq!(chunks[0].byte_offset, 0);
        assert_eq!(chunks[0].token_count, 2);
    }

    #[test]
    fn test_empty_content_yields_no_chunks() {
        assert!(chunk_text("", 100, 20).is_empty());
        assert!(chunk_text("   \n ", 100, 20).is_empty());
    }

    #[test]
    fn test_chunk_preserves_paragraphs() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text(content, 30, 5);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_offsets_are_stable_and_increasing() {
        let content = "word ".repeat(500);
        let a = chunk_text(&content, 200, 40);
        let b = chunk_text(&content, 200, 40);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.byte_offset, y.byte_offset);
        }
        for window in a.windows(2) {
            assert!(window[0].byte_offset < window[1].byte_offset);
        }
    }

    #[test]
    fn test_chunk_handles_unicode() {
        let content = "Hello 世界! This is a test with emoji 🎉 and special chars ─ here.";
        let chunks = chunk_text(content, 20, 5);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_page_numbers_from_form_feeds() {
        let content = format!("{}\u{c}{}", "page one text. ".repeat(10), "page two text. ".repeat(10));
        let chunks = chunk_text(&content, 120, 20);
        assert_eq!(chunks.first().unwrap().page_number, Some(1));
        assert_eq!(chunks.last().unwrap().page_number, Some(2));
    }

    #[test]
    fn test_no_pages_without_form_feeds() {
        let chunks = chunk_text("plain text body", 100, 10);
        assert_eq!(chunks[0].page_number, None);
    }
}
