mod config;
mod docx;
mod error;
mod extract;
mod fonts;
mod model;
mod pdf;
mod sanitize;

pub use config::{
    Branding, Config, FONT_DIR_ENV, FontSource, PageGeometry, Palette, TrueTypeFiles, Typography,
};
pub use docx::{DocxMarkupConverter, MarkupConverter};
pub use error::{Error, Result};
pub use extract::PLACEHOLDER_TEXT;
pub use fonts::{FontRole, FontSet};
pub use model::{
    Block, ExtractedContent, Image, ReviewCopyRequest, ReviewMetadata, Table,
};
pub use pdf::{
    DefaultHeadingClassifier, DocumentInfo, DrawOp, HeadingClassifier, PageCanvas, PreparedImage,
    Rgb,
};
pub use sanitize::sanitize;

use std::sync::Arc;
use std::time::Instant;

/// Fixed document-info keywords; the manuscript id is appended.
const INFO_KEYWORDS: &str = "peer review confidential manuscript";

/// A fully laid out review copy: cover, stamped body pages, decoded images
/// and document info. Everything except the PDF bytes.
#[derive(Clone, Debug)]
pub struct ReviewCopyLayout {
    pub cover: PageCanvas,
    pub body: Vec<PageCanvas>,
    pub images: Vec<Option<PreparedImage>>,
    pub info: DocumentInfo,
}

impl ReviewCopyLayout {
    /// Cover plus body pages.
    pub fn page_count(&self) -> usize {
        1 + self.body.len()
    }

    /// All pages in output order, cover first.
    pub fn pages(&self) -> impl Iterator<Item = &PageCanvas> + '_ {
        std::iter::once(&self.cover).chain(self.body.iter())
    }

    /// Text of every page, pages separated by form feeds.
    pub fn text(&self) -> String {
        self.pages()
            .map(PageCanvas::text_content)
            .collect::<Vec<_>>()
            .join("\u{c}")
    }
}

/// Turns manuscripts into review copy PDFs. Holds configuration, loaded fonts
/// and the pluggable converter and heading classifier; every call is
/// independent, so one generator can serve many threads.
pub struct ReviewCopyGenerator {
    config: Config,
    fonts: Arc<FontSet>,
    converter: Box<dyn MarkupConverter>,
    classifier: Box<dyn HeadingClassifier>,
}

impl ReviewCopyGenerator {
    /// Loads the configured fonts. Only TrueType sources can fail.
    pub fn new(config: Config) -> Result<Self> {
        let fonts = Arc::new(FontSet::load(&config.fonts)?);
        let classifier = DefaultHeadingClassifier {
            max_chars: config.typography.heading_max_chars,
        };
        Ok(Self {
            config,
            fonts,
            converter: Box::new(DocxMarkupConverter),
            classifier: Box::new(classifier),
        })
    }

    pub fn with_converter(mut self, converter: impl MarkupConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn with_classifier(mut self, classifier: impl HeadingClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontSet> {
        &self.fonts
    }

    /// Run the whole pipeline except PDF serialization.
    pub fn layout(&self, request: &ReviewCopyRequest) -> Result<ReviewCopyLayout> {
        let t0 = Instant::now();
        let config = &self.config;
        let fonts = self.fonts.as_ref();
        let meta = sanitize_metadata(&request.metadata);

        let mut content = extract::extract(request.source(), self.converter.as_ref())?;
        sanitize_content(&mut content);
        let t_extract = t0.elapsed();

        let images: Vec<Option<PreparedImage>> = content
            .images
            .iter()
            .enumerate()
            .map(|(i, image)| pdf::prepare_image(image, i))
            .collect();
        let t_images = t0.elapsed();

        let mut body = pdf::layout_body(&content, &images, self.classifier.as_ref(), config, fonts);
        pdf::apply_overlay(&mut body, &meta.manuscript_id, config, fonts);
        let cover = pdf::compose_cover(&meta, config, fonts);
        let t_layout = t0.elapsed();

        let brand = &config.branding;
        let info = DocumentInfo {
            title: format!("{} - {}", meta.manuscript_id.trim(), meta.title.trim()),
            author: brand.journal_name.clone(),
            subject: brand.document_subject.clone(),
            keywords: format!("{INFO_KEYWORDS} {}", meta.manuscript_id.trim()),
            creator: brand.creator.clone(),
            producer: brand.producer.clone(),
        };

        log::debug!(
            "Layout phases: extract={:.1}ms, images={:.1}ms, pages={:.1}ms ({} blocks, {} body pages)",
            t_extract.as_secs_f64() * 1000.0,
            (t_images - t_extract).as_secs_f64() * 1000.0,
            (t_layout - t_images).as_secs_f64() * 1000.0,
            content.blocks.len(),
            body.len(),
        );

        Ok(ReviewCopyLayout {
            cover,
            body,
            images,
            info,
        })
    }

    /// Produce the review copy PDF bytes.
    pub fn generate(&self, request: &ReviewCopyRequest) -> Result<Vec<u8>> {
        let t0 = Instant::now();

        let layout = self.layout(request)?;
        let t_layout = t0.elapsed();

        let pages: Vec<&PageCanvas> = layout.pages().collect();
        let bytes = pdf::render(
            &pages,
            &layout.images,
            &layout.info,
            &self.config.page,
            &self.fonts,
        )?;
        let t_total = t0.elapsed();

        log::info!(
            "Timing: layout={:.1}ms, render={:.1}ms, total={:.1}ms ({} pages, output {} bytes)",
            t_layout.as_secs_f64() * 1000.0,
            (t_total - t_layout).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            layout.page_count(),
            bytes.len(),
        );

        Ok(bytes)
    }
}

/// Generate with the default configuration and built-in fonts.
pub fn generate_review_copy(request: &ReviewCopyRequest) -> Result<Vec<u8>> {
    ReviewCopyGenerator::new(Config::default())?.generate(request)
}

fn sanitize_metadata(meta: &ReviewMetadata) -> ReviewMetadata {
    ReviewMetadata {
        manuscript_id: sanitize(&meta.manuscript_id),
        title: sanitize(&meta.title),
        authors: sanitize(&meta.authors),
        article_type: sanitize(&meta.article_type),
        keywords: sanitize(&meta.keywords),
        category: sanitize(&meta.category),
        abstract_text: sanitize(&meta.abstract_text),
        reviewer_name: sanitize(&meta.reviewer_name),
        deadline: meta.deadline,
        received: meta.received,
    }
}

fn sanitize_content(content: &mut ExtractedContent) {
    for block in &mut content.blocks {
        if let Block::Paragraph(text) | Block::Heading(text) = block {
            *text = sanitize(text);
        }
    }
    for table in &mut content.tables {
        for row in table.header.iter_mut().chain(table.rows.iter_mut()) {
            for cell in row {
                *cell = sanitize(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ReviewMetadata {
        ReviewMetadata {
            manuscript_id: "AIR-2026-0001".into(),
            title: "Réseaux — a “study”".into(),
            reviewer_name: "dr. ivan petrov".into(),
            ..Default::default()
        }
    }

    #[test]
    fn generator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReviewCopyGenerator>();
    }

    #[test]
    fn metadata_is_sanitized_before_layout() {
        let generator = ReviewCopyGenerator::new(Config::default()).expect("generator");
        let layout = generator
            .layout(&ReviewCopyRequest::from_text("Hello", meta()))
            .expect("layout");
        assert_eq!(layout.info.title, "AIR-2026-0001 - R\u{e9}seaux - a \"study\"");
        assert!(layout.cover.text_content().contains("Dr. Ivan Petrov"));
    }

    #[test]
    fn cyrillic_body_is_transliterated() {
        let generator = ReviewCopyGenerator::new(Config::default()).expect("generator");
        let layout = generator
            .layout(&ReviewCopyRequest::from_text("Привет мир", meta()))
            .expect("layout");
        let text = layout.text();
        assert!(text.contains("Privet mir"));
        assert!(!text.chars().any(|c| ('\u{400}'..='\u{4ff}').contains(&c)));
    }

    #[test]
    fn empty_request_gets_placeholder_page() {
        let layout = ReviewCopyGenerator::new(Config::default())
            .expect("generator")
            .layout(&ReviewCopyRequest {
                metadata: meta(),
                ..Default::default()
            })
            .expect("layout");
        assert_eq!(layout.page_count(), 2);
        assert!(layout.body[0].text_content().contains(PLACEHOLDER_TEXT));
    }

    #[test]
    fn custom_classifier_is_used() {
        struct Nothing;
        impl HeadingClassifier for Nothing {
            fn is_heading(&self, _: &str) -> bool {
                false
            }
        }
        let layout = ReviewCopyGenerator::new(Config::default())
            .expect("generator")
            .with_classifier(Nothing)
            .layout(&ReviewCopyRequest::from_text("INTRODUCTION\nbody", meta()))
            .expect("layout");
        let heading_font = layout.body[0].ops().iter().any(|op| {
            matches!(op, DrawOp::Text { text, font: FontRole::SerifBold, .. } if text == "INTRODUCTION")
        });
        assert!(!heading_font);
    }
}
