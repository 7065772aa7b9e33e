use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
}

/// Fixed-size character windows with overlap.
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            anyhow::bail!(
                "Invalid chunking parameters: size={}, overlap={}",
                chunk_size,
                overlap
            );
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_len = chars.len();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total_len {
            let end = (start + self.chunk_size).min(total_len);
            let content: String = chars[start..end].iter().collect();
            let trimmed = content.trim();

            if !trimmed.is_empty() {
                chunks.push(Chunk {
                    index: chunks.len(),
                    content: trimmed.to_string(),
                });
            }

            if end >= total_len {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_windows() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("abcdefghij");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = TextChunker::new(3, 0).unwrap();
        let chunks = chunker.chunk("éàüöß");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "éàü");
        assert_eq!(chunks[1].content, "öß");
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 10).is_err());
    }
}
