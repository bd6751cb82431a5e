mod markdown;
mod markup;

use crate::docx::MarkupConverter;
use crate::error::Error;
use crate::model::{Block, ExtractedContent, Image, ManuscriptSource};

/// Shown when a manuscript has no usable content.
pub const PLACEHOLDER_TEXT: &str = "(No manuscript content available)";

/// `src` value the converter callback hands out for the n-th embedded image.
pub(crate) const IMAGE_SRC_PREFIX: &str = "docx-image:";

/// Turn the manuscript into blocks. Only a malformed DOCX is an error; empty
/// input of any kind becomes the placeholder paragraph.
pub(crate) fn extract(
    source: ManuscriptSource<'_>,
    converter: &dyn MarkupConverter,
) -> Result<ExtractedContent, Error> {
    let t0 = std::time::Instant::now();
    let content = match source {
        ManuscriptSource::Docx(docx) => {
            let mut images: Vec<Image> = Vec::new();
            let markup = converter.convert(docx, &mut |image: Image| {
                let src = format!("{IMAGE_SRC_PREFIX}{}", images.len());
                images.push(image);
                src
            })?;
            let (lines, tables) = markup::scan(&markup, images.len());
            log::debug!(
                "Converter produced {} bytes of markup, {} images, {} tables",
                markup.len(),
                images.len(),
                tables.len()
            );
            ExtractedContent {
                blocks: normalize(lines),
                images,
                tables,
            }
        }
        ManuscriptSource::Text(text) => ExtractedContent {
            blocks: normalize(markdown::scan(text)),
            ..Default::default()
        },
        ManuscriptSource::Empty => ExtractedContent::default(),
    };

    let content = with_placeholder(content);
    log::debug!(
        "Extracted {} blocks in {:.1}ms",
        content.blocks.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(content)
}

/// Trim every line, collapse runs of blank lines to one, drop blank lines at
/// either end.
fn normalize(lines: Vec<Block>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(lines.len());
    for block in lines {
        let block = match block {
            Block::Paragraph(text) => Block::Paragraph(text.trim().to_string()),
            Block::Heading(text) if text.trim().is_empty() => Block::Paragraph(String::new()),
            Block::Heading(text) => Block::Heading(text.trim().to_string()),
            other => other,
        };
        if block.is_blank() && blocks.last().is_none_or(Block::is_blank) {
            continue;
        }
        blocks.push(block);
    }
    while blocks.last().is_some_and(Block::is_blank) {
        blocks.pop();
    }
    blocks
}

fn with_placeholder(mut content: ExtractedContent) -> ExtractedContent {
    if content.blocks.iter().all(Block::is_blank) {
        content.blocks = vec![Block::Paragraph(PLACEHOLDER_TEXT.to_string())];
    }
    content
}
