use crate::config::Config;
use crate::fonts::{FontRole, FontSet};
use crate::model::Table;

use super::canvas::Rgb;
use super::layout::{Flow, MIN_EXTENT, wrap_text};

/// Size every column to its widest cell, cap each at a share of the content
/// width, then scale them all so the table spans the content width exactly.
pub(crate) fn column_widths(table: &Table, fonts: &FontSet, config: &Config) -> Vec<f32> {
    let ncols = table.column_count();
    if ncols == 0 {
        return Vec::new();
    }

    let typo = &config.typography;
    let content_w = config.page.content_width();
    let max_col = (content_w * typo.table_max_column_share).max(MIN_EXTENT);
    let mut widths = vec![typo.table_min_column_width; ncols];

    let header = table.header.iter().map(|row| (row, FontRole::SansBold));
    let data = table.rows.iter().map(|row| (row, FontRole::Sans));
    for (row, role) in header.chain(data) {
        let metrics = fonts.metrics(role);
        for (i, cell) in row.iter().enumerate() {
            let w = metrics.text_width(cell, typo.table_font_size) + 2.0 * typo.table_cell_pad_x;
            widths[i] = widths[i].max(w);
        }
    }

    for w in &mut widths {
        *w = w.min(max_col).max(MIN_EXTENT);
    }

    let total: f32 = widths.iter().sum();
    let scale = content_w / total;
    for w in &mut widths {
        *w *= scale;
    }
    // absorb rounding so the sum is exact
    let others: f32 = widths[..ncols - 1].iter().sum();
    widths[ncols - 1] = content_w - others;
    widths
}

pub(crate) struct RowLayout {
    pub(crate) height: f32,
    cell_lines: Vec<Vec<String>>,
    font: FontRole,
}

pub(crate) fn layout_row(
    cells: &[String],
    widths: &[f32],
    font: FontRole,
    fonts: &FontSet,
    config: &Config,
) -> RowLayout {
    let typo = &config.typography;
    let metrics = fonts.metrics(font);
    let cell_lines: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(i, &col_w)| {
            let text = cells.get(i).map(String::as_str).unwrap_or("");
            let inner = (col_w - 2.0 * typo.table_cell_pad_x)
                .max(typo.table_min_text_width.min(col_w));
            wrap_text(text, metrics, typo.table_font_size, inner)
        })
        .collect();

    let max_lines = cell_lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let height = max_lines as f32 * (typo.table_font_size + typo.table_line_leading)
        + 2.0 * typo.table_cell_pad_y;

    RowLayout {
        height: height.max(MIN_EXTENT),
        cell_lines,
        font,
    }
}

pub(crate) fn render_table(flow: &mut Flow, table: &Table) {
    let (config, fonts) = (flow.config, flow.fonts);
    let widths = column_widths(table, fonts, config);
    if widths.is_empty() {
        log::debug!("Skipping table without cells");
        return;
    }

    let header = table
        .header
        .as_ref()
        .map(|cells| layout_row(cells, &widths, FontRole::SansBold, fonts, config));
    let rows: Vec<RowLayout> = table
        .rows
        .iter()
        .map(|cells| layout_row(cells, &widths, FontRole::Sans, fonts, config))
        .collect();

    let typo = &config.typography;
    let palette = &config.palette;
    let page_h = config.page.content_height();

    flow.gap(typo.table_space_before);

    if let Some(header) = &header {
        // keep the header on the same page as the first data row
        let first = rows.first().map_or(0.0, |r| r.height);
        if header.height + first <= page_h {
            flow.reserve(header.height + first);
        } else {
            flow.reserve(header.height);
        }
        draw_row(flow, header, &widths, Some(palette.table_header_background));
    }

    for (ri, row) in rows.iter().enumerate() {
        log::debug!(
            "TABLE row={} row_h={:.2} page={} y={:.2}",
            ri,
            row.height,
            flow.cursor().page,
            flow.cursor().y
        );
        let broke = flow.reserve(row.height);
        if broke
            && config.repeat_table_header
            && let Some(header) = &header
            && header.height + row.height <= page_h
        {
            draw_row(flow, header, &widths, Some(palette.table_header_background));
        }
        let band = (ri % 2 == 1).then_some(palette.table_band_background);
        draw_row(flow, row, &widths, band);
    }

    flow.gap(typo.table_space_after);
}

/// Draw one row at the cursor and move below it. Space must already be reserved.
fn draw_row(flow: &mut Flow, row: &RowLayout, widths: &[f32], fill: Option<Rgb>) {
    let (config, fonts) = (flow.config, flow.fonts);
    let typo = &config.typography;
    let palette = &config.palette;
    let metrics = fonts.metrics(row.font);
    let top = flow.cursor().y;
    let bottom = top - row.height;
    let mut x = flow.left();

    let canvas = flow.canvas();
    for (col_w, lines) in widths.iter().zip(&row.cell_lines) {
        if let Some(color) = fill {
            canvas.fill_rect(x, bottom, *col_w, row.height, color);
        }
        canvas.stroke_rect(
            x,
            bottom,
            *col_w,
            row.height,
            palette.table_border,
            typo.table_border_width,
        );

        let mut baseline = top - typo.table_cell_pad_y - typo.table_font_size;
        for line in lines {
            let w = metrics.text_width(line, typo.table_font_size);
            canvas.text(
                x + typo.table_cell_pad_x,
                baseline,
                row.font,
                typo.table_font_size,
                palette.text,
                line.as_str(),
                w,
            );
            baseline -= typo.table_font_size + typo.table_line_leading;
        }
        x += col_w;
    }

    flow.advance(row.height);
}
