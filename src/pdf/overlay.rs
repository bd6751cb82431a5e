use crate::config::Config;
use crate::fonts::{FontRole, FontSet};

use super::canvas::{DrawOp, PageCanvas};
use super::cover::fit_text;

const HEADER_SIZE: f32 = 8.0;
const FOOTER_SIZE: f32 = 8.0;
const WATERMARK_SIZE: f32 = 42.0;
const WATERMARK_ANGLE: f32 = 45.0;

/// Stamp watermark, header and footer onto finished body pages. Numbering
/// runs over the body pages only; the cover is never passed in here.
pub(crate) fn apply_overlay(
    pages: &mut [PageCanvas],
    manuscript_id: &str,
    config: &Config,
    fonts: &FontSet,
) {
    let total = pages.len();
    let watermark = watermark_op(config, fonts);
    for (i, page) in pages.iter_mut().enumerate() {
        if let Some(op) = &watermark {
            page.push(op.clone());
        }
        draw_header(page, manuscript_id, config, fonts);
        draw_footer(page, i + 1, total, config, fonts);
    }
    log::debug!("Overlay applied to {total} body pages");
}

/// The rotated mark, sized so its bounding box stays on the page and
/// positioned so the middle of the text sits on the page center.
fn watermark_op(config: &Config, fonts: &FontSet) -> Option<DrawOp> {
    let text = config.branding.watermark_text.trim();
    if text.is_empty() {
        return None;
    }
    let page = &config.page;
    let metrics = fonts.metrics(FontRole::SansBold);
    let (sin, cos) = WATERMARK_ANGLE.to_radians().sin_cos();

    let natural_w = metrics.text_width(text, WATERMARK_SIZE);
    let cap = metrics.ascent(WATERMARK_SIZE);
    let budget = (page.width.min(page.height) - 40.0) / cos - cap;
    let size = if natural_w > budget && natural_w > 0.0 {
        WATERMARK_SIZE * budget.max(1.0) / natural_w
    } else {
        WATERMARK_SIZE
    };

    let half_w = metrics.text_width(text, size) / 2.0;
    let half_cap = metrics.ascent(size) / 2.0;
    let (cx, cy) = (page.width / 2.0, page.height / 2.0);
    Some(DrawOp::Watermark {
        x: cx - half_w * cos + half_cap * sin,
        y: cy - half_w * sin - half_cap * cos,
        size,
        font: FontRole::SansBold,
        color: config.palette.watermark,
        text: text.to_string(),
        angle: WATERMARK_ANGLE,
        opacity: config.palette.watermark_opacity,
    })
}

fn draw_header(page: &mut PageCanvas, manuscript_id: &str, config: &Config, fonts: &FontSet) {
    let geometry = &config.page;
    let palette = &config.palette;
    let right = geometry.width - geometry.margin_right;
    let y = geometry.height - 42.0;

    let tag = config.branding.confidential_tag.as_str();
    let tag_w = fonts.metrics(FontRole::SansBold).text_width(tag, HEADER_SIZE);
    page.text(right - tag_w, y, FontRole::SansBold, HEADER_SIZE, palette.red, tag, tag_w);

    let sans = fonts.metrics(FontRole::Sans);
    let id_room = geometry.content_width() - tag_w - 12.0;
    let (id, id_size) = fit_text(manuscript_id.trim(), sans, HEADER_SIZE, 6.0, id_room);
    let id_w = sans.text_width(&id, id_size);
    page.text(geometry.margin_left, y, FontRole::Sans, id_size, palette.gray, id, id_w);

    let rule_y = geometry.height - 48.0;
    page.line((geometry.margin_left, rule_y), (right, rule_y), palette.light_gray, 0.5);
}

fn draw_footer(page: &mut PageCanvas, number: usize, total: usize, config: &Config, fonts: &FontSet) {
    let geometry = &config.page;
    let palette = &config.palette;
    let brand = &config.branding;
    let right = geometry.width - geometry.margin_right;

    let rule_y = geometry.margin_bottom - 10.0;
    page.line((geometry.margin_left, rule_y), (right, rule_y), palette.light_gray, 0.5);

    let text = format!(
        "{}  |  {}  |  Page {number} of {total}",
        brand.journal_name, brand.review_notice
    );
    let sans = fonts.metrics(FontRole::Sans);
    let (text, size) = fit_text(&text, sans, FOOTER_SIZE, 6.0, geometry.content_width());
    let width = sans.text_width(&text, size);
    page.text(
        (geometry.width - width) / 2.0,
        geometry.margin_bottom - 24.0,
        FontRole::Sans,
        size,
        palette.gray,
        text,
        width,
    );
}
