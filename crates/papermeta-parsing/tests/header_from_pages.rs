//! Pages from an in-memory document through accumulation and header split.

use papermeta_core::{CandidatePolicy, MemoryDocument, PipelineConfigBuilder};
use papermeta_parsing::{HeaderSplitter, PageAccumulator};

fn document() -> MemoryDocument {
    MemoryDocument::new([
        "ab",
        "Proceedings of Things\n\
         Conference on Things, 4 March 2019\n\
         A Study of Header Splitting\n\
         Ada Lovelace and Alan Turing\n\
         ok",
        "Unrelated body text for page three.",
    ])
}

#[test]
fn short_first_page_pulls_in_the_next() {
    let config = PipelineConfigBuilder::new().build().unwrap();
    let doc = document();

    let acc = PageAccumulator::from_config(&config).accumulate(&doc).unwrap();
    assert_eq!(acc.page_count, 3);
    assert_eq!(acc.header_pages, 2);
    assert!(acc.summary_text.ends_with("Unrelated body text for page three."));
    assert_eq!(doc.reads(), vec![0, 1, 2]);

    let header = HeaderSplitter::from_config(&config).split(&acc.header_lines);
    let date = header.date.unwrap();
    assert_eq!(date.date_value, "2019-03-04");
    assert_eq!(date.source_line, "Conference on Things, 4 March 2019");
    assert_eq!(
        header.candidate_lines,
        vec!["A Study of Header Splitting", "Ada Lovelace and Alan Turing"]
    );
}

#[test]
fn whole_window_keeps_lines_above_the_date() {
    let config = PipelineConfigBuilder::new()
        .candidate_policy(CandidatePolicy::WholeWindow)
        .build()
        .unwrap();
    let acc = PageAccumulator::from_config(&config)
        .accumulate(&document())
        .unwrap();

    let header = HeaderSplitter::from_config(&config).split(&acc.header_lines);
    assert_eq!(
        header.candidate_lines,
        vec![
            "Proceedings of Things",
            "A Study of Header Splitting",
            "Ada Lovelace and Alan Turing",
        ]
    );
}
