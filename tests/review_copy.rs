mod common;

use review_copy::{
    Config, DrawOp, Error, PLACEHOLDER_TEXT, ReviewCopyGenerator, ReviewCopyRequest,
    ReviewMetadata, generate_review_copy,
};

fn generator() -> ReviewCopyGenerator {
    let _ = env_logger::builder().is_test(true).try_init();
    ReviewCopyGenerator::new(Config::default()).expect("standard fonts always load")
}

#[test]
fn ten_paragraphs_fit_on_one_body_page() {
    let text = (1..=10)
        .map(|i| format!("Paragraph {i} reports a finding in plain words."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let request = ReviewCopyRequest::from_text(text, common::metadata());

    let generator = generator();
    let layout = generator.layout(&request).expect("layout");
    assert_eq!(layout.page_count(), 2);

    let bytes = generator.generate(&request).expect("generate");
    common::save_output("ten_paragraphs", &bytes);
    let doc = common::load(&bytes);
    assert_eq!(doc.get_pages().len(), 2);

    let body = layout.body[0].text_content();
    assert!(body.contains("Paragraph 1 reports"));
    assert!(body.contains("Paragraph 10 reports"));
    assert!(body.contains("Page 1 of 1"));
    assert!(body.contains("AIR-2026-0042"));
}

#[test]
fn long_text_flows_onto_more_pages_with_running_numbers() {
    let text = "Sentence after sentence of careful argument. ".repeat(1500);
    let layout = generator()
        .layout(&ReviewCopyRequest::from_text(text, common::metadata()))
        .expect("layout");
    let total = layout.body.len();
    assert!(total > 2);
    for (i, page) in layout.body.iter().enumerate() {
        let expected = format!("Page {} of {total}", i + 1);
        assert!(page.text_content().contains(&expected), "missing {expected}");
    }
}

#[test]
fn docx_table_keeps_header_and_cells() {
    let docx = common::DocxBuilder::new()
        .heading("Results")
        .paragraph("Scores by participant:")
        .table(&[
            &["Name", "Score", "Date"],
            &["Alice", "91", "2026-01-04"],
            &["Bob", "78", "2026-01-05"],
            &["Carol", "85", "2026-01-06"],
        ])
        .paragraph("After the table.")
        .build();
    let generator = generator();
    let request = ReviewCopyRequest::from_docx(docx, common::metadata());
    let layout = generator.layout(&request).expect("layout");
    let body = layout.body[0].text_content();
    for cell in ["Results", "Name", "Score", "Date", "Alice", "78", "2026-01-06", "After the table."] {
        assert!(body.contains(cell), "missing {cell}");
    }
    let filled = layout.body[0]
        .ops()
        .iter()
        .filter(|op| matches!(op, DrawOp::FillRect { .. }))
        .count();
    assert!(filled >= 1, "header row background missing");

    let bytes = generator.generate(&request).expect("generate");
    common::save_output("docx_table", &bytes);
    assert_eq!(common::load(&bytes).get_pages().len(), layout.page_count());
}

#[test]
fn oversized_image_is_scaled_into_the_content_box() {
    let docx = common::DocxBuilder::new()
        .paragraph("Figure 1 below.")
        .image(common::png(4000, 3000))
        .paragraph("Caption text.")
        .build();
    let config = Config::default();
    let generator = generator();
    let request = ReviewCopyRequest::from_docx(docx, common::metadata());

    let layout = generator.layout(&request).expect("layout");
    let placed: Vec<_> = layout.body.iter().flat_map(|p| p.images()).collect();
    assert_eq!(placed.len(), 1);
    let (_, x, y, w, h) = placed[0];
    assert!(w <= config.page.content_width() + 1e-3);
    assert!(h <= config.typography.image_max_height + 1e-3);
    assert!((w / h - 4.0 / 3.0).abs() < 1e-2);
    assert!(x >= config.page.margin_left - 1e-3);
    assert!(y >= config.page.margin_bottom - 1e-3);

    assert!(!layout.text().contains("docx-image"), "image reference leaked into text");

    let bytes = generator.generate(&request).expect("generate");
    let doc = common::load(&bytes);
    let per_page = common::images_per_page(&doc);
    assert_eq!(per_page[0], 0, "cover has no images");
    assert_eq!(per_page.iter().sum::<usize>(), 1);
}

#[test]
fn undecodable_image_is_skipped_not_fatal() {
    let docx = common::DocxBuilder::new()
        .paragraph("Before.")
        .image(b"definitely not a png".to_vec())
        .paragraph("After.")
        .build();
    let layout = generator()
        .layout(&ReviewCopyRequest::from_docx(docx, common::metadata()))
        .expect("layout");
    assert_eq!(layout.body.iter().flat_map(|p| p.images()).count(), 0);
    let text = layout.text();
    assert!(text.contains("Before.") && text.contains("After."));
}

#[test]
fn long_metadata_stays_inside_the_cover() {
    let mut meta = common::metadata();
    meta.title = "An Extremely Long Title About Many Things ".repeat(20);
    meta.authors = "Firstname Lastname, ".repeat(40);
    meta.keywords = "keyword ".repeat(80);
    meta.abstract_text = "A long abstract sentence. ".repeat(300);
    let config = Config::default();
    let layout = generator()
        .layout(&ReviewCopyRequest::from_text("Body.", meta))
        .expect("layout");

    let right = config.page.width - config.page.margin_right;
    for op in layout.cover.ops() {
        if let DrawOp::Text { x, width, text, .. } = op {
            assert!(*x >= config.page.margin_left - 1e-3, "{text} starts at {x}");
            assert!(x + width <= right + 1e-3, "{text} ends at {}", x + width);
        }
    }
    assert_eq!(layout.page_count(), 2);
}

#[test]
fn cyrillic_and_typographic_punctuation_are_made_printable() {
    let mut meta = common::metadata();
    meta.title = "Исследование \u{201C}сетей\u{201D} \u{2014} обзор".into();
    let request = ReviewCopyRequest::from_text("Введение\n\nТекст статьи\u{2026}", meta);

    let generator = generator();
    let layout = generator.layout(&request).expect("layout");
    let text = layout.text();
    assert!(text.contains("Issledovanie \"setey\" - obzor"));
    assert!(text.contains("Tekst stati..."));
    assert!(!text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)));

    let bytes = generator.generate(&request).expect("generate");
    common::save_output("cyrillic", &bytes);
    assert_eq!(common::load(&bytes).get_pages().len(), layout.page_count());
}

#[test]
fn malformed_docx_is_an_error() {
    let err = generator()
        .generate(&ReviewCopyRequest::from_docx(
            b"PK\x03\x04 truncated".to_vec(),
            common::metadata(),
        ))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDocx(_)), "got {err:?}");
}

#[test]
fn empty_manuscript_gets_the_placeholder() {
    for request in [
        ReviewCopyRequest::from_text("   \n\n  ", common::metadata()),
        ReviewCopyRequest {
            metadata: common::metadata(),
            ..Default::default()
        },
    ] {
        let layout = generator().layout(&request).expect("layout");
        assert_eq!(layout.page_count(), 2);
        assert!(layout.body[0].text_content().contains(PLACEHOLDER_TEXT));
    }
}

#[test]
fn docx_wins_over_text() {
    let docx = common::DocxBuilder::new().paragraph("From the DOCX.").build();
    let request = ReviewCopyRequest {
        docx: Some(docx),
        text: Some("From the text.".into()),
        metadata: common::metadata(),
    };
    let text = generator().layout(&request).expect("layout").text();
    assert!(text.contains("From the DOCX."));
    assert!(!text.contains("From the text."));
}

#[test]
fn document_info_carries_the_submission() {
    let bytes = generate_review_copy(&ReviewCopyRequest::from_text(
        "Body.",
        common::metadata(),
    ))
    .expect("generate");
    let doc = common::load(&bytes);
    let config = Config::default();
    assert_eq!(
        common::info_entry(&doc, b"Title").as_deref(),
        Some("AIR-2026-0042 - Regional Effects of Broadband Subsidies on Small Business Formation")
    );
    assert_eq!(
        common::info_entry(&doc, b"Author").as_deref(),
        Some(config.branding.journal_name.as_str())
    );
    assert_eq!(
        common::info_entry(&doc, b"Keywords").as_deref(),
        Some("peer review confidential manuscript AIR-2026-0042")
    );
    assert!(common::info_entry(&doc, b"CreationDate").is_none());
}

#[test]
fn cover_is_unstamped_and_body_pages_are_watermarked() {
    let layout = generator()
        .layout(&ReviewCopyRequest::from_text("Body.", ReviewMetadata {
            manuscript_id: "AIR-1".into(),
            ..Default::default()
        }))
        .expect("layout");
    let has_mark = |ops: &[DrawOp]| ops.iter().any(|op| matches!(op, DrawOp::Watermark { .. }));
    assert!(!has_mark(layout.cover.ops()));
    assert!(layout.body.iter().all(|p| has_mark(p.ops())));
    assert!(layout.cover.text_content().contains("REVIEW ASSIGNMENT"));
}
