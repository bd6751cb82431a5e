use chrono::NaiveDate;

use crate::config::Config;
use crate::fonts::{FontMetrics, FontRole, FontSet, char_to_winansi};
use crate::model::ReviewMetadata;

use super::canvas::{PageCanvas, Rgb};
use super::layout::{MIN_EXTENT, wrap_text};

const ELLIPSIS: &str = "...";
const TITLE_MAX_LINES: usize = 4;
const LABEL_COLUMN_WIDTH: f32 = 160.0;
/// Cap on the label column as a share of the content width, for narrow pages.
const LABEL_COLUMN_SHARE: f32 = 0.35;
const META_ROW_HEIGHT: f32 = 22.0;
const META_VALUE_SIZE: f32 = 10.0;
const META_VALUE_MIN_SIZE: f32 = 7.0;
const ABSTRACT_SIZE: f32 = 9.5;
const ABSTRACT_LEADING: f32 = 13.0;
const ASSIGNMENT_BOX_HEIGHT: f32 = 100.0;

/// "March 9, 2026", or "-" when no date was given.
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%B %-d, %Y").to_string(),
        None => "-".to_string(),
    }
}

/// Capitalize the first letter of every whitespace-separated word. A letter whose
/// capital has no WinAnsi glyph (`µ` -> `Μ`) is left as it was.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            let Some(first) = chars.next() else {
                return String::new();
            };
            let upper: String = first.to_uppercase().collect();
            let mut out = if upper.chars().all(|c| char_to_winansi(c) != 0) {
                upper
            } else {
                first.to_string()
            };
            out.push_str(chars.as_str());
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value.trim() }
}

/// Shrink `text` from `size` in half-point steps down to `min_size` until it fits
/// `max_width`; if it still does not fit, cut it and append an ellipsis.
pub(crate) fn fit_text(
    text: &str,
    metrics: &FontMetrics,
    size: f32,
    min_size: f32,
    max_width: f32,
) -> (String, f32) {
    let mut size = size;
    while metrics.text_width(text, size) > max_width && size > min_size {
        size = (size - 0.5).max(min_size);
    }
    if metrics.text_width(text, size) <= max_width {
        return (text.to_string(), size);
    }

    let mut kept: Vec<char> = text.chars().collect();
    loop {
        kept.pop();
        while kept.last().is_some_and(|c| c.is_whitespace()) {
            kept.pop();
        }
        let mut candidate: String = kept.iter().collect();
        candidate.push_str(ELLIPSIS);
        if kept.is_empty() || metrics.text_width(&candidate, size) <= max_width {
            return (candidate, size);
        }
    }
}

struct CoverPen<'a> {
    canvas: PageCanvas,
    config: &'a Config,
    fonts: &'a FontSet,
}

impl CoverPen<'_> {
    fn text(&mut self, x: f32, y: f32, font: FontRole, size: f32, color: Rgb, text: &str) {
        let width = self.fonts.metrics(font).text_width(text, size);
        self.canvas.text(x, y, font, size, color, text, width);
    }

    /// Centered on the page, shrunk or cut to the content width when needed.
    fn centered(&mut self, y: f32, font: FontRole, size: f32, color: Rgb, text: &str) {
        let page = &self.config.page;
        let metrics = self.fonts.metrics(font);
        let (text, size) = fit_text(text, metrics, size, size * 0.7, page.content_width());
        let width = metrics.text_width(&text, size);
        self.canvas
            .text((page.width - width) / 2.0, y, font, size, color, text, width);
    }

    fn hline(&mut self, y: f32, color: Rgb, thickness: f32) {
        let page = &self.config.page;
        self.canvas.line(
            (page.margin_left, y),
            (page.width - page.margin_right, y),
            color,
            thickness,
        );
    }
}

/// Compose the cover page from sanitized metadata.
pub(crate) fn compose_cover(meta: &ReviewMetadata, config: &Config, fonts: &FontSet) -> PageCanvas {
    let page = &config.page;
    let palette = &config.palette;
    let brand = &config.branding;
    let left = page.margin_left;
    let content_w = page.content_width();
    let mut pen = CoverPen {
        canvas: PageCanvas::new(),
        config,
        fonts,
    };

    // baselines, measured down from just above the top margin
    let mut y = page.height - page.margin_top + 12.0;

    pen.centered(y, FontRole::SansBold, 16.0, palette.navy, &brand.journal_name.to_uppercase());
    y -= 16.0;
    pen.centered(y, FontRole::Sans, 8.0, palette.text, &brand.journal_subtitle);
    y -= 20.0;
    pen.hline(y, palette.navy, 2.0);
    y -= 30.0;

    let title_metrics = fonts.metrics(FontRole::SerifBold);
    let mut title_lines = wrap_text(or_dash(&meta.title), title_metrics, 15.0, content_w);
    title_lines.retain(|l| !l.is_empty());
    if title_lines.len() > TITLE_MAX_LINES {
        title_lines.truncate(TITLE_MAX_LINES);
        let last = format!("{}{ELLIPSIS}", title_lines[TITLE_MAX_LINES - 1]);
        title_lines[TITLE_MAX_LINES - 1] = fit_text(&last, title_metrics, 15.0, 15.0, content_w).0;
    }
    for line in &title_lines {
        pen.centered(y, FontRole::SerifBold, 15.0, palette.navy, line);
        y -= 20.0;
    }
    y -= 4.0;

    pen.centered(y, FontRole::Sans, 9.0, palette.text, &brand.draft_label);
    y -= 28.0;

    let received = format_date(meta.received);
    let rows: [(&str, &str); 6] = [
        ("Manuscript Number", or_dash(&meta.manuscript_id)),
        ("Article Type", or_dash(&meta.article_type)),
        ("Received", &received),
        ("Subject Area", or_dash(&meta.category)),
        ("Keywords", or_dash(&meta.keywords)),
        ("Authors", or_dash(&meta.authors)),
    ];
    let label_w = LABEL_COLUMN_WIDTH.min(content_w * LABEL_COLUMN_SHARE);
    let value_max_w = (content_w - label_w - 22.0).max(MIN_EXTENT);
    let sans = fonts.metrics(FontRole::Sans);
    for (label, value) in rows {
        let (bottom, top) = (y - 4.0, y - 4.0 + META_ROW_HEIGHT);
        pen.canvas
            .fill_rect(left, bottom, label_w, META_ROW_HEIGHT, palette.label_background);
        pen.canvas.line((left, top), (left + content_w, top), palette.light_gray, 0.5);
        pen.canvas.line((left, bottom), (left + content_w, bottom), palette.light_gray, 0.5);
        pen.canvas.line(
            (left + label_w, top),
            (left + label_w, bottom),
            palette.light_gray,
            0.5,
        );
        pen.text(left + 8.0, y + 3.0, FontRole::SansBold, 10.0, palette.text, label);

        let (value, size) = fit_text(value, sans, META_VALUE_SIZE, META_VALUE_MIN_SIZE, value_max_w);
        pen.text(left + label_w + 8.0, y + 3.0, FontRole::Sans, size, palette.text, &value);
        y -= META_ROW_HEIGHT;
    }

    // the banner and assignment box below must stay clear of the footer rule
    let footer_rule_y = page.margin_bottom - 12.0;
    let lowest_abstract_line =
        footer_rule_y + 8.0 + ASSIGNMENT_BOX_HEIGHT + 24.0 + 20.0 + 10.0 + ABSTRACT_LEADING;

    // attempted only when at least one abstract line fits above the banner
    let abstract_first_baseline = y - 6.0 - META_ROW_HEIGHT + 4.0;
    let abstract_text = meta.abstract_text.trim();
    if !abstract_text.is_empty() && abstract_first_baseline >= lowest_abstract_line {
        y -= 6.0;
        let (bottom, top) = (y - 4.0, y - 4.0 + META_ROW_HEIGHT);
        pen.canvas
            .fill_rect(left, bottom, label_w, META_ROW_HEIGHT, palette.label_background);
        pen.canvas.line((left, bottom), (left + content_w, bottom), palette.light_gray, 0.5);
        pen.canvas.line(
            (left + label_w, top),
            (left + label_w, bottom),
            palette.light_gray,
            0.5,
        );
        pen.text(left + 8.0, y + 3.0, FontRole::SansBold, 10.0, palette.text, "Abstract");
        y -= META_ROW_HEIGHT;

        let serif = fonts.metrics(FontRole::Serif);
        let text_w = (content_w - 16.0).max(MIN_EXTENT);
        let mut lines = wrap_text(abstract_text, serif, ABSTRACT_SIZE, text_w);
        lines.retain(|l| !l.is_empty());
        let first_baseline = abstract_first_baseline;
        let room = ((first_baseline - lowest_abstract_line) / ABSTRACT_LEADING).floor() as usize + 1;
        if lines.len() > room {
            log::debug!("Cover abstract cut from {} to {room} lines", lines.len());
            lines.truncate(room.max(1));
            if let Some(last) = lines.last_mut() {
                *last = fit_text(&format!("{last}{ELLIPSIS}"), serif, ABSTRACT_SIZE, ABSTRACT_SIZE, text_w).0;
            }
        }

        let block_h = lines.len() as f32 * ABSTRACT_LEADING + 12.0;
        let block_bottom = y - block_h + 18.0;
        pen.canvas
            .line((left, block_bottom), (left + content_w, block_bottom), palette.light_gray, 0.5);

        let mut baseline = first_baseline;
        for line in &lines {
            pen.text(left + 8.0, baseline, FontRole::Serif, ABSTRACT_SIZE, palette.text, line);
            baseline -= ABSTRACT_LEADING;
        }
        y = baseline - 10.0;
    } else if !abstract_text.is_empty() {
        log::debug!("No room for the abstract on the cover");
    }

    y -= 20.0;
    pen.centered(y, FontRole::SansBold, 9.0, palette.red, &brand.confidential_banner);
    y -= 24.0;

    let box_bottom = y - ASSIGNMENT_BOX_HEIGHT;
    pen.canvas.fill_rect(left, box_bottom, content_w, ASSIGNMENT_BOX_HEIGHT, [255, 255, 255]);
    pen.canvas
        .stroke_rect(left, box_bottom, content_w, ASSIGNMENT_BOX_HEIGHT, palette.light_gray, 1.0);

    let mut box_y = y - 10.0;
    pen.text(left + 14.0, box_y, FontRole::SansBold, 8.0, palette.text, "REVIEW ASSIGNMENT");
    box_y -= 20.0;

    let assignment_value_w = (content_w - 130.0 - 14.0).max(MIN_EXTENT);
    let reviewer = title_case(&meta.reviewer_name);
    let deadline = format_date(meta.deadline);
    for (label, value) in [("Reviewer:", or_dash(&reviewer)), ("Deadline:", deadline.as_str())] {
        pen.text(left + 14.0, box_y, FontRole::SansBold, 10.0, palette.text, label);
        let (value, size) = fit_text(value, sans, META_VALUE_SIZE, META_VALUE_MIN_SIZE, assignment_value_w);
        pen.text(left + 130.0, box_y, FontRole::Sans, size, palette.text, &value);
        box_y -= 18.0;
    }
    box_y -= 4.0;
    let (notice, notice_size) = fit_text(&brand.distribution_notice, sans, 8.0, 6.0, (content_w - 28.0).max(MIN_EXTENT));
    pen.text(left + 14.0, box_y, FontRole::Sans, notice_size, palette.gray, &notice);

    pen.hline(footer_rule_y, palette.light_gray, 0.5);
    pen.centered(page.margin_bottom - 24.0, FontRole::Sans, 7.5, palette.gray, &brand.cover_footer);

    pen.canvas
}
