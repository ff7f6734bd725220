use ragbook_core::types::Document;

/// blake3 over document ids, contents and the chunk size, as lowercase hex.
pub fn corpus_fingerprint(docs: &[Document], chunk_size: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    for doc in docs {
        hasher.update(doc.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(doc.content.as_bytes());
        hasher.update(&[0]);
    }
    hasher.update(&(chunk_size as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_content_and_chunk_size() {
        let docs = vec![Document::new("a.txt", "alpha")];
        let base = corpus_fingerprint(&docs, 300);
        assert_eq!(base, corpus_fingerprint(&docs, 300));
        assert_ne!(base, corpus_fingerprint(&docs, 200));
        assert_ne!(base, corpus_fingerprint(&[Document::new("a.txt", "alpha!")], 300));
        assert_ne!(corpus_fingerprint(&[Document::new("ab", "c")], 1), corpus_fingerprint(&[Document::new("a", "bc")], 1));
    }
}
