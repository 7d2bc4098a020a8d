/// Split `text` into overlapping segments of roughly `chunk_size` characters,
/// preferring to break on whitespace near the boundary. Mirrors the
/// chunk-size/overlap contract of `original_source/agents/vector_store.py`'s
/// `RecursiveCharacterTextSplitter` usage without pulling in a text-splitter
/// crate the teacher's stack doesn't carry.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if overlap >= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            if let Some(break_at) = find_break(&chars, start, end) {
                end = break_at;
            }
        }
        let segment: String = chars[start..end].iter().collect();
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Look backward from `end` for the nearest whitespace to avoid splitting a
/// word in half. Falls back to the hard boundary if none is found nearby.
fn find_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    let lookback = 40.min(end - start);
    for i in (end - lookback..end).rev() {
        if chars[i].is_whitespace() {
            return Some(i + 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_long_text_into_multiple_chunks() {
        let text = "word ".repeat(300);
        let chunks = split(&text, 500, 50);
        assert!(chunks.len() > 1);
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split("short policy text", 500, 50);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split("", 500, 50).is_empty());
    }
}
