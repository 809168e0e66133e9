use proptest::prelude::*;
use rag::{chunk_spans, chunk_text, ChunkOptions, OverlapAnchor};

fn opts(size: usize, overlap: usize) -> ChunkOptions {
    ChunkOptions::new(size, overlap).expect("valid chunk options")
}

#[test]
fn blank_text_yields_no_chunks() {
    let defaults = ChunkOptions::default();
    assert!(chunk_text("", &defaults).is_empty());
    assert!(chunk_text("   ", &defaults).is_empty());
    assert!(chunk_text("\n\t \n", &defaults).is_empty());
}

#[test]
fn defaults_are_1000_with_200_overlap_from_the_window() {
    let defaults = ChunkOptions::default();
    assert_eq!(defaults.size(), 1000);
    assert_eq!(defaults.overlap(), 200);
    assert_eq!(defaults.anchor(), OverlapAnchor::Window);
}

#[test]
fn short_text_is_one_trimmed_chunk() {
    let chunks = chunk_text("  Mitochondria produce ATP.  \n", &ChunkOptions::default());
    assert_eq!(chunks, vec!["Mitochondria produce ATP.".to_string()]);
}

#[test]
fn shortens_window_at_period_past_midpoint() {
    let text = "abcdefghijklmn. opqrstuvwxyz0123456789";
    assert_eq!(chunk_spans(text, &opts(20, 5)), vec![0..15, 15..35, 30..38]);
    assert_eq!(
        chunk_text(text, &opts(20, 5)),
        vec![
            "abcdefghijklmn.".to_string(),
            "opqrstuvwxyz0123456".to_string(),
            "23456789".to_string(),
        ]
    );
}

#[test]
fn break_point_anchor_restarts_from_shortened_end() {
    let text = "abcdefghijklmn. opqrstuvwxyz0123456789";
    let break_point = opts(20, 5).with_anchor(OverlapAnchor::BreakPoint);
    assert_eq!(
        chunk_text(text, &break_point),
        vec![
            "abcdefghijklmn.".to_string(),
            "klmn. opqrstuvwxyz01".to_string(),
            "xyz0123456789".to_string(),
            "56789".to_string(),
        ]
    );
}

#[test]
fn newline_counts_as_break() {
    let text = "First line here\nsecond part of it goes on and on";
    let chunks = chunk_text(text, &opts(20, 5));
    assert_eq!(chunks[0], "First line here");
    assert_eq!(chunks[1], "second part of it g");
    assert_eq!(chunks.last().map(String::as_str), Some("on"));

    let chunks = chunk_text(text, &opts(20, 5).with_anchor(OverlapAnchor::BreakPoint));
    assert_eq!(chunks[1], "here\nsecond part of");
}

#[test]
fn break_before_midpoint_keeps_full_window() {
    let text = "Hi. abcdefghijklmnopqrstuvwxyz";
    let chunks = chunk_text(text, &opts(20, 5));
    assert_eq!(chunks, vec!["Hi. abcdefghijklmnop", "lmnopqrstuvwxyz"]);
}

#[test]
fn whitespace_window_inside_text_is_kept_as_empty_chunk() {
    let text = format!("a{}b", " ".repeat(30));
    let chunks = chunk_text(&text, &opts(10, 0));
    assert_eq!(chunks, vec!["a", "", "", "b"]);
}

#[test]
fn window_overlap_ignores_shortening() {
    let text = "abcdefghijklmn. opqrstuvwxyz0123456789";
    assert_eq!(chunk_spans(text, &opts(20, 2)), vec![0..15, 18..38, 36..38]);

    let break_point = opts(20, 2).with_anchor(OverlapAnchor::BreakPoint);
    assert_eq!(chunk_spans(text, &break_point)[1].start, 13);
}

#[test]
fn three_thousand_chars_of_sentences_make_four_chunks() {
    let text = "The cell membrane regulates transport in and out. ".repeat(60);
    assert_eq!(text.chars().count(), 3000);
    let chunks = chunk_text(&text, &ChunkOptions::default());
    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    assert!(chunks[0].ends_with("out."));
}

#[test]
fn breaks_just_past_midpoint_still_advance_a_full_stride() {
    let sentence = format!("{}.", "a".repeat(519));
    let text: String = sentence.repeat(6).chars().take(3000).collect();
    let spans = chunk_spans(&text, &ChunkOptions::default());
    assert_eq!(spans, vec![0..520, 800..1560, 1600..2600, 2400..3000]);

    let break_point = ChunkOptions::default().with_anchor(OverlapAnchor::BreakPoint);
    assert_eq!(chunk_spans(&text, &break_point).len(), 7);
}

#[test]
fn cursor_runs_past_the_end_before_stopping() {
    let defaults = ChunkOptions::default();
    assert_eq!(chunk_spans(&"x".repeat(1000), &defaults), vec![0..1000, 800..1000]);
    assert_eq!(
        chunk_spans(&"x".repeat(2500), &defaults),
        vec![0..1000, 800..1800, 1600..2500, 2400..2500]
    );
    assert_eq!(chunk_spans(&"x".repeat(800), &defaults), vec![0..800]);
    assert_eq!(chunk_spans(&"x".repeat(900), &defaults), vec![0..900, 800..900]);
}

#[test]
fn measures_in_chars_not_bytes() {
    let text = "é".repeat(25);
    let spans = chunk_spans(&text, &opts(10, 2));
    assert_eq!(spans, vec![0..10, 8..18, 16..25, 24..25]);
    let chunks = chunk_text(&text, &opts(10, 2));
    assert_eq!(chunks[0], "é".repeat(10));
    assert_eq!(chunks[2], "é".repeat(9));
    assert_eq!(chunks[3], "é");
}

#[test]
fn large_overlap_still_advances() {
    let text = "aaaaaa.aaaaaa.aaaaaa.aaaaaa.aaaaaa.";
    let break_point = opts(10, 9).with_anchor(OverlapAnchor::BreakPoint);
    let spans = chunk_spans(text, &break_point);
    assert!(spans.windows(2).all(|w| w[1].start > w[0].start));
    assert_eq!(spans.last().map(|s| s.end), Some(text.len()));
}

fn arb_options() -> impl Strategy<Value = ChunkOptions> {
    (2usize..120)
        .prop_flat_map(|size| (Just(size), 0..size))
        .prop_map(|(size, overlap)| opts(size, overlap))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn text_within_one_stride_is_single_trimmed_chunk(text in "[a-z .\n]{0,60}") {
        prop_assume!(!text.trim().is_empty());
        let chunks = chunk_text(&text, &opts(100, 20));
        prop_assert_eq!(chunks, vec![text.trim().to_string()]);
    }

    #[test]
    fn break_point_spans_reconstruct_text_without_gaps(
        text in "[a-z .\n]{1,600}",
        options in arb_options(),
    ) {
        prop_assume!(!text.trim().is_empty());
        let options = options.with_anchor(OverlapAnchor::BreakPoint);
        let chars: Vec<char> = text.chars().collect();
        let spans = chunk_spans(&text, &options);

        prop_assert_eq!(spans[0].start, 0);
        prop_assert_eq!(spans.last().map(|s| s.end), Some(chars.len()));

        let mut rebuilt = String::new();
        let mut covered = 0usize;
        for (i, span) in spans.iter().enumerate() {
            prop_assert!(span.end - span.start <= options.size());
            if i > 0 {
                prop_assert!(span.start > spans[i - 1].start);
                prop_assert!(span.start <= covered, "gap before span {}", i);
            }
            if span.end > covered {
                rebuilt.extend(&chars[covered..span.end]);
                covered = span.end;
            }
        }
        prop_assert_eq!(rebuilt, text.clone());

        let chunks = chunk_text(&text, &options);
        let trimmed: Vec<String> = spans
            .iter()
            .map(|s| chars[s.clone()].iter().collect::<String>().trim().to_string())
            .collect();
        prop_assert_eq!(chunks, trimmed);
    }

    #[test]
    fn window_anchor_always_terminates_and_advances(
        text in "[a-z .\n]{1,600}",
        options in arb_options(),
    ) {
        prop_assume!(!text.trim().is_empty());
        let options = options.with_anchor(OverlapAnchor::Window);
        let spans = chunk_spans(&text, &options);
        prop_assert!(!spans.is_empty());
        prop_assert_eq!(spans.last().map(|s| s.end), Some(text.chars().count()));
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].start + options.size() - options.overlap());
        }
    }
}
