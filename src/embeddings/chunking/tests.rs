use super::estimate_token_count as estimate_token_count_impl;
use super::*;

fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        chunk_overlap,
    }
}

/// Undo the overlap: each chunk after the first starts with a suffix of the
/// previous chunk's sentences. Only valid for texts with distinct sentences.
fn rejoin_without_overlap(chunks: &[String]) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut previous: Vec<String> = Vec::new();

    for chunk in chunks {
        let current = split_sentences(chunk);
        let overlap = (0..=previous.len().min(current.len()))
            .rev()
            .find(|&n| previous[previous.len() - n..] == current[..n])
            .unwrap_or(0);
        sentences.extend(current[overlap..].iter().cloned());
        previous = current;
    }

    sentences
}

#[test]
fn estimate_token_count() {
    assert_eq!(estimate_token_count_impl("hello world"), 2);
    assert_eq!(estimate_token_count_impl("This is a test."), 5);
    assert_eq!(estimate_token_count_impl(""), 0);
}

#[test]
fn short_document_is_single_chunk() {
    let text = "Sentence one is short. Sentence two is also fairly short.";
    let chunks = chunk_text(text, &config(500, 50)).expect("chunking should succeed");

    assert_eq!(chunks, vec![text.to_string()]);
}

#[test]
fn empty_document_is_rejected() {
    assert!(matches!(
        chunk_text("", &ChunkingConfig::default()),
        Err(RagError::EmptyDocument)
    ));
    assert!(matches!(
        chunk_text(" \n\t  \n", &ChunkingConfig::default()),
        Err(RagError::EmptyDocument)
    ));
}

#[test]
fn splits_on_sentence_boundaries() {
    let sentences = split_sentences("First one here. Second one here! Third one here? Last");
    assert_eq!(
        sentences,
        vec![
            "First one here.",
            "Second one here!",
            "Third one here?",
            "Last"
        ]
    );
}

#[test]
fn hard_wrapped_lines_are_joined() {
    let sentences = split_sentences("This sentence was\nwrapped across\n\nseveral lines. Next one.");
    assert_eq!(
        sentences,
        vec!["This sentence was wrapped across several lines.", "Next one."]
    );
}

#[test]
fn overlap_repeats_trailing_sentences() {
    let text = "Aaaa bbbb. Cccc dddd. Eeee ffff. Gggg hhhh.";
    let chunks = chunk_text(text, &config(30, 12)).expect("chunking should succeed");

    assert_eq!(
        chunks,
        vec![
            "Aaaa bbbb. Cccc dddd.",
            "Cccc dddd. Eeee ffff.",
            "Eeee ffff. Gggg hhhh.",
        ]
    );
}

#[test]
fn zero_overlap_partitions_sentences() {
    let text = "Aaaa bbbb. Cccc dddd. Eeee ffff. Gggg hhhh.";
    let chunks = chunk_text(text, &config(21, 0)).expect("chunking should succeed");

    assert_eq!(chunks, vec!["Aaaa bbbb. Cccc dddd.", "Eeee ffff. Gggg hhhh."]);
}

#[test]
fn oversized_sentence_becomes_its_own_chunk() {
    let long_sentence = format!("This {} never ends.", "word ".repeat(40).trim_end());
    let text = format!("Short start. {} Short end.", long_sentence);
    let chunks = chunk_text(&text, &config(60, 20)).expect("chunking should succeed");

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], "Short start.");
    assert_eq!(chunks[1], long_sentence);
    assert_eq!(chunks[2], "Short end.");
}

#[test]
fn overlap_that_crowds_out_next_sentence_is_dropped() {
    let text = "Aaaa bbbb. Cccc dddd. A long sentence here ok.";
    let chunks = chunk_text(text, &config(30, 25)).expect("chunking should succeed");

    assert_eq!(
        chunks,
        vec!["Aaaa bbbb. Cccc dddd.", "A long sentence here ok."]
    );
}

#[test]
fn chunks_respect_size_limit() {
    let text = (0..60)
        .map(|i| format!("Sentence number {} talks about topic {}.", i, i * 7))
        .join(" ");
    let cfg = config(200, 60);
    let chunks = chunk_text(&text, &cfg).expect("chunking should succeed");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= cfg.chunk_size,
            "chunk exceeds limit: {} chars",
            chunk.chars().count()
        );
    }
}

#[test]
fn rejoined_chunks_recover_every_sentence_in_order() {
    let text = (0..40)
        .map(|i| format!("Fact {} states that value {} matters.", i, i * 3))
        .join(" ");
    let chunks = chunk_text(&text, &config(150, 70)).expect("chunking should succeed");

    assert_eq!(rejoin_without_overlap(&chunks), split_sentences(&text));
    let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
    assert!(total >= text.chars().count() - chunks.len());
}

#[test]
fn no_sentence_is_split_across_chunks() {
    let text = (0..25)
        .map(|i| format!("Item {} has a somewhat longer description attached.", i))
        .join(" ");
    let sentences = split_sentences(&text);
    let chunks = chunk_text(&text, &config(120, 40)).expect("chunking should succeed");

    for chunk in &chunks {
        for piece in split_sentences(chunk) {
            assert!(sentences.contains(&piece), "fragment found: {piece}");
        }
    }
}

#[test]
fn chunks_are_produced_lazily() {
    let text = "Aaaa bbbb. Cccc dddd. Eeee ffff. Gggg hhhh.";
    let mut chunks = SentenceChunker::new(config(21, 0)).chunks(text);

    assert_eq!(chunks.next().as_deref(), Some("Aaaa bbbb. Cccc dddd."));
    assert_eq!(chunks.next().as_deref(), Some("Eeee ffff. Gggg hhhh."));
    assert_eq!(chunks.next(), None);
    assert_eq!(chunks.next(), None);
}
