use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::fonts::{FontMetrics, FontRole, FontSet};
use crate::model::{Block, ExtractedContent};

use super::canvas::{PageCanvas, Rgb};
use super::image::{PreparedImage, place_image};
use super::table::render_table;

/// Smallest width or height any unit may claim, so every placement makes progress.
pub(crate) const MIN_EXTENT: f32 = 1.0;

const FIT_TOLERANCE: f32 = 0.01;

/// Greedy word wrap. Each `\n`-separated input line is wrapped on its own;
/// whitespace-only input lines come back as empty strings so callers can
/// turn them into vertical gaps.
pub(crate) fn wrap_text(
    text: &str,
    metrics: &FontMetrics,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let max_width = max_width.max(MIN_EXTENT);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        if raw.trim().is_empty() {
            lines.push(String::new());
        } else {
            wrap_line(raw, metrics, font_size, max_width, &mut lines);
        }
    }
    lines
}

fn wrap_line(
    text: &str,
    metrics: &FontMetrics,
    font_size: f32,
    max_width: f32,
    lines: &mut Vec<String>,
) {
    let space_w = metrics.space_width(font_size);
    let mut current = String::new();
    let mut current_w = 0.0f32;

    for word in text.split_whitespace() {
        let word_w = metrics.text_width(word, font_size);
        if !current.is_empty() {
            if current_w + space_w + word_w <= max_width + FIT_TOLERANCE {
                current.push(' ');
                current.push_str(word);
                current_w += space_w + word_w;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        if word_w <= max_width + FIT_TOLERANCE {
            current.push_str(word);
            current_w = word_w;
        } else {
            // A word wider than the line gets lines of its own, broken between characters.
            let mut pieces = split_word(word, metrics, font_size, max_width);
            let tail = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            current_w = metrics.text_width(&tail, font_size);
            current = tail;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
}

fn split_word(word: &str, metrics: &FontMetrics, font_size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_w = 0.0f32;
    for ch in word.chars() {
        let ch_w = metrics.char_width_1000(ch) * font_size / 1000.0;
        if !piece.is_empty() && piece_w + ch_w > max_width + FIT_TOLERANCE {
            pieces.push(std::mem::take(&mut piece));
            piece_w = 0.0;
        }
        piece.push(ch);
        piece_w += ch_w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Decides which paragraphs are drawn as headings. Purely visual: the block
/// sequence is never changed.
pub trait HeadingClassifier: Send + Sync {
    fn is_heading(&self, text: &str) -> bool;
}

static NUMBERED_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+[A-Z]").expect("valid regex"));

/// Short all-caps lines and numbered section titles such as `2. Methods`.
#[derive(Clone, Debug)]
pub struct DefaultHeadingClassifier {
    pub max_chars: usize,
}

impl Default for DefaultHeadingClassifier {
    fn default() -> Self {
        Self { max_chars: 80 }
    }
}

impl HeadingClassifier for DefaultHeadingClassifier {
    fn is_heading(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let shouting = text.chars().count() < self.max_chars
            && !text.chars().any(char::is_lowercase)
            && text.chars().any(|c| c.is_ascii_uppercase());
        shouting || NUMBERED_SECTION.is_match(text)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TextStyle {
    pub(crate) font: FontRole,
    pub(crate) size: f32,
    pub(crate) line_height: f32,
    pub(crate) color: Rgb,
}

impl TextStyle {
    fn body(config: &Config) -> Self {
        Self {
            font: FontRole::Serif,
            size: config.typography.body_size,
            line_height: config.typography.body_line_height,
            color: config.palette.text,
        }
    }

    fn heading(config: &Config) -> Self {
        Self {
            font: FontRole::SerifBold,
            size: config.typography.heading_size,
            line_height: config.typography.heading_line_height,
            color: config.palette.text,
        }
    }
}

/// Position of the body flow: which page, and how far down it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayoutCursor {
    pub(crate) page: usize,
    /// Top edge of the free space on the current page.
    pub(crate) y: f32,
    top: f32,
    bottom: f32,
}

impl LayoutCursor {
    fn new(top: f32, bottom: f32) -> Self {
        Self {
            page: 0,
            y: top,
            top,
            bottom,
        }
    }

    pub(crate) fn remaining(&self) -> f32 {
        (self.y - self.bottom).max(0.0)
    }

    pub(crate) fn at_page_top(&self) -> bool {
        (self.y - self.top).abs() < FIT_TOLERANCE
    }

    fn next_page(&mut self) {
        self.page += 1;
        self.y = self.top;
    }
}

/// Body pages under construction plus the cursor walking down them.
pub(crate) struct Flow<'a> {
    pub(crate) config: &'a Config,
    pub(crate) fonts: &'a FontSet,
    pages: Vec<PageCanvas>,
    cursor: LayoutCursor,
}

impl<'a> Flow<'a> {
    pub(crate) fn new(config: &'a Config, fonts: &'a FontSet) -> Self {
        let page = &config.page;
        Self {
            config,
            fonts,
            pages: vec![PageCanvas::new()],
            cursor: LayoutCursor::new(page.content_top(), page.margin_bottom),
        }
    }

    pub(crate) fn cursor(&self) -> LayoutCursor {
        self.cursor
    }

    pub(crate) fn left(&self) -> f32 {
        self.config.page.margin_left
    }

    pub(crate) fn width(&self) -> f32 {
        self.config.page.content_width()
    }

    /// Make sure a unit of `height` can be drawn at the cursor, starting a new
    /// page when it does not fit. Returns true if a page break happened.
    /// A unit taller than a whole page is placed at the top of a fresh page.
    pub(crate) fn reserve(&mut self, height: f32) -> bool {
        let height = height.max(MIN_EXTENT);
        if height <= self.cursor.remaining() + FIT_TOLERANCE || self.cursor.at_page_top() {
            if height > self.config.page.content_height() + FIT_TOLERANCE {
                log::warn!(
                    "{height:.1}pt unit is taller than the content area, it will overrun page {}",
                    self.cursor.page + 1
                );
            }
            return false;
        }
        self.new_page();
        true
    }

    pub(crate) fn new_page(&mut self) {
        self.pages.push(PageCanvas::new());
        self.cursor.next_page();
        log::debug!("Body page {} started", self.cursor.page + 1);
    }

    pub(crate) fn advance(&mut self, dy: f32) {
        self.cursor.y -= dy.max(0.0);
    }

    /// Vertical whitespace. Dropped at the top of a page and never causes a break.
    pub(crate) fn gap(&mut self, dy: f32) {
        if self.cursor.at_page_top() {
            return;
        }
        self.cursor.y = (self.cursor.y - dy.max(0.0)).max(self.cursor.bottom);
    }

    pub(crate) fn canvas(&mut self) -> &mut PageCanvas {
        &mut self.pages[self.cursor.page]
    }

    /// Draw one line of text in the line box at the cursor. Space must already be reserved.
    pub(crate) fn draw_line(&mut self, x: f32, text: &str, style: TextStyle) {
        let fonts = self.fonts;
        let metrics = fonts.metrics(style.font);
        let half_leading = ((style.line_height - style.size) / 2.0).max(0.0);
        let baseline = self.cursor.y - half_leading - metrics.ascent(style.size);
        let width = metrics.text_width(text, style.size);
        self.canvas()
            .text(x, baseline, style.font, style.size, style.color, text, width);
    }

    pub(crate) fn into_pages(self) -> Vec<PageCanvas> {
        self.pages
    }
}

/// Lay out the (already sanitized) body blocks into pages.
pub(crate) fn layout_body(
    content: &ExtractedContent,
    images: &[Option<PreparedImage>],
    classifier: &dyn HeadingClassifier,
    config: &Config,
    fonts: &FontSet,
) -> Vec<PageCanvas> {
    let mut flow = Flow::new(config, fonts);
    let body = TextStyle::body(config);
    let heading = TextStyle::heading(config);

    for block in &content.blocks {
        match block {
            Block::Paragraph(text) if text.trim().is_empty() => {
                flow.gap(body.line_height * 0.5);
            }
            Block::Paragraph(text) if classifier.is_heading(text) => {
                draw_heading(&mut flow, text, heading, body);
            }
            Block::Paragraph(text) => draw_paragraph(&mut flow, text, body),
            Block::Heading(text) => draw_heading(&mut flow, text, heading, body),
            Block::Image(index) => match images.get(*index).and_then(Option::as_ref) {
                Some(image) => place_image(&mut flow, *index, image),
                None => log::debug!("Image {index} was not decodable, leaving it out"),
            },
            Block::Table(index) => match content.tables.get(*index) {
                Some(table) => render_table(&mut flow, table),
                None => log::debug!("Table {index} missing from side table"),
            },
        }
    }

    let pages = flow.into_pages();
    log::debug!(
        "Body layout: {} blocks -> {} pages",
        content.blocks.len(),
        pages.len()
    );
    pages
}

fn draw_lines(flow: &mut Flow, lines: &[String], style: TextStyle) {
    let x = flow.left();
    for line in lines {
        if line.is_empty() {
            flow.gap(style.line_height * 0.5);
            continue;
        }
        flow.reserve(style.line_height);
        flow.draw_line(x, line, style);
        flow.advance(style.line_height);
    }
}

fn draw_paragraph(flow: &mut Flow, text: &str, style: TextStyle) {
    let lines = wrap_text(
        text,
        flow.fonts.metrics(style.font),
        style.size,
        flow.width(),
    );
    draw_lines(flow, &lines, style);
    flow.gap(flow.config.typography.paragraph_space_after);
}

fn draw_heading(flow: &mut Flow, text: &str, heading: TextStyle, body: TextStyle) {
    let typo = &flow.config.typography;
    let (space_before, space_after) = (typo.heading_space_before, typo.heading_space_after);
    let lines = wrap_text(
        text.trim(),
        flow.fonts.metrics(heading.font),
        heading.size,
        flow.width(),
    );

    // Keep the heading together with the first line that follows it.
    let block_h = lines.len() as f32 * heading.line_height + space_after + body.line_height;
    if block_h <= flow.config.page.content_height() {
        let needed = if flow.cursor().at_page_top() {
            block_h
        } else {
            space_before + block_h
        };
        flow.reserve(needed);
    }

    flow.gap(space_before);
    draw_lines(flow, &lines, heading);
    flow.gap(space_after);
}
