mod canvas;
mod cover;
mod image;
mod layout;
mod overlay;
mod table;

use std::collections::{BTreeMap, BTreeSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::config::PageGeometry;
use crate::error::Error;
use crate::fonts::{EmbeddedFont, FontRole, FontSet, embed_font};

pub use canvas::{DrawOp, PageCanvas, Rgb};
pub use self::image::PreparedImage;
pub use layout::{DefaultHeadingClassifier, HeadingClassifier};

pub(crate) use cover::compose_cover;
pub(crate) use self::image::prepare_image;
pub(crate) use layout::layout_body;
pub(crate) use overlay::apply_overlay;

use self::image::ImagePayload;

/// Strings written to the document information dictionary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
}

fn rgb(color: Rgb) -> (f32, f32, f32) {
    (
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    )
}

fn pixel_dim(v: u32) -> Result<i32, Error> {
    i32::try_from(v).map_err(|_| Error::Pdf(format!("image dimension {v} out of range")))
}

/// Opacity in thousandths, so it can key a map.
fn opacity_key(opacity: f32) -> u32 {
    (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

/// Serialize finished page canvases into a PDF. Output is a pure function of
/// the inputs: no timestamps, no random ids, ordered maps throughout.
pub(crate) fn render(
    pages: &[&PageCanvas],
    images: &[Option<PreparedImage>],
    info: &DocumentInfo,
    geometry: &PageGeometry,
    fonts: &FontSet,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts, embedding only the faces that are actually drawn
    let mut used_chars: BTreeMap<FontRole, BTreeSet<char>> = BTreeMap::new();
    let mut opacities: BTreeSet<u32> = BTreeSet::new();
    let mut placed_images: BTreeSet<usize> = BTreeSet::new();
    for op in pages.iter().flat_map(|p| p.ops()) {
        match op {
            DrawOp::Text { font, text, .. } => {
                used_chars.entry(*font).or_default().extend(text.chars());
            }
            DrawOp::Watermark {
                font,
                text,
                opacity,
                ..
            } => {
                used_chars.entry(*font).or_default().extend(text.chars());
                opacities.insert(opacity_key(*opacity));
            }
            DrawOp::Image { index, .. } => {
                placed_images.insert(*index);
            }
            _ => {}
        }
    }

    let mut embedded: BTreeMap<FontRole, EmbeddedFont> = BTreeMap::new();
    for (role, chars) in &used_chars {
        let font = embed_font(&mut pdf, fonts.face(*role), chars, &mut alloc);
        embedded.insert(*role, font);
    }
    let t_fonts = t0.elapsed();

    // Phase 2: image XObjects, once each, in index order
    let mut image_refs: BTreeMap<usize, Ref> = BTreeMap::new();
    for &index in &placed_images {
        let Some(Some(prepared)) = images.get(index) else {
            log::warn!("Page references image {index} which was never prepared");
            continue;
        };
        let xobj_ref = alloc();
        let (width, height) = (pixel_dim(prepared.width)?, pixel_dim(prepared.height)?);
        match &prepared.payload {
            ImagePayload::Jpeg { data, gray } => {
                let mut xobj = pdf.image_xobject(xobj_ref, data);
                xobj.filter(Filter::DctDecode);
                xobj.width(width);
                xobj.height(height);
                if *gray {
                    xobj.color_space().device_gray();
                } else {
                    xobj.color_space().device_rgb();
                }
                xobj.bits_per_component(8);
            }
            ImagePayload::Raw { rgb, alpha } => {
                let smask_ref = match alpha {
                    Some(alpha) => {
                        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(alpha, 6);
                        let mask_ref = alloc();
                        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                        mask.filter(Filter::FlateDecode);
                        mask.width(width);
                        mask.height(height);
                        mask.color_space().device_gray();
                        mask.bits_per_component(8);
                        Some(mask_ref)
                    }
                    None => None,
                };

                let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(rgb, 6);
                let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
                xobj.filter(Filter::FlateDecode);
                xobj.width(width);
                xobj.height(height);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
                if let Some(mask_ref) = smask_ref {
                    xobj.s_mask(mask_ref);
                }
            }
        }
        image_refs.insert(index, xobj_ref);
    }

    let mut gs_refs: BTreeMap<u32, Ref> = BTreeMap::new();
    for &key in &opacities {
        let gs_ref = alloc();
        let alpha = key as f32 / 1000.0;
        pdf.ext_graphics(gs_ref)
            .non_stroking_alpha(alpha)
            .stroking_alpha(alpha);
        gs_refs.insert(key, gs_ref);
    }
    let t_images = t0.elapsed();

    // Phase 3: content streams
    let n = pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, page) in pages.iter().enumerate() {
        let raw = write_content(page, &embedded, &image_refs).finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let font_pairs: Vec<(&str, Ref)> = embedded
        .iter()
        .map(|(role, font)| (role.resource_name(), font.font_ref))
        .collect();
    let image_pairs: Vec<(String, Ref)> = image_refs
        .iter()
        .map(|(&index, &r)| (image_name(index), r))
        .collect();
    let gs_pairs: Vec<(String, Ref)> = gs_refs
        .iter()
        .map(|(&key, &r)| (format!("Gs{key}"), r))
        .collect();

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_pairs.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_pairs {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
        if !gs_pairs.is_empty() {
            let mut states = resources.ext_g_states();
            for (name, gs_ref) in &gs_pairs {
                states.pair(Name(name.as_bytes()), *gs_ref);
            }
        }
    }

    pdf.document_info(info_id)
        .title(TextStr(&info.title))
        .author(TextStr(&info.author))
        .subject(TextStr(&info.subject))
        .keywords(TextStr(&info.keywords))
        .creator(TextStr(&info.creator))
        .producer(TextStr(&info.producer));

    let t_assembly = t0.elapsed();
    log::info!(
        "Render phases: fonts={:.1}ms, images={:.1}ms, content={:.1}ms ({} pages, {} fonts, {} images)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_images).as_secs_f64() * 1000.0,
        n,
        embedded.len(),
        image_refs.len(),
    );

    Ok(pdf.finish())
}

fn write_content(
    page: &PageCanvas,
    fonts: &BTreeMap<FontRole, EmbeddedFont>,
    images: &BTreeMap<usize, Ref>,
) -> Content {
    let mut content = Content::new();
    for op in page.ops() {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color,
                text,
                ..
            } => {
                let Some(embedded) = fonts.get(font) else {
                    continue;
                };
                let (r, g, b) = rgb(*color);
                content.set_fill_rgb(r, g, b);
                content.begin_text();
                content.set_font(Name(font.resource_name().as_bytes()), *size);
                content.next_line(*x, *y);
                content.show(Str(&embedded.encode(text)));
                content.end_text();
            }
            DrawOp::Watermark {
                x,
                y,
                size,
                font,
                color,
                text,
                angle,
                opacity,
            } => {
                let Some(embedded) = fonts.get(font) else {
                    continue;
                };
                let (sin, cos) = angle.to_radians().sin_cos();
                let gs_name = format!("Gs{}", opacity_key(*opacity));
                let (r, g, b) = rgb(*color);
                content.save_state();
                content.set_parameters(Name(gs_name.as_bytes()));
                content.set_fill_rgb(r, g, b);
                content.begin_text();
                content.set_font(Name(font.resource_name().as_bytes()), *size);
                content.set_text_matrix([cos, sin, -sin, cos, *x, *y]);
                content.show(Str(&embedded.encode(text)));
                content.end_text();
                content.restore_state();
            }
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                let (r, g, b) = rgb(*color);
                content.set_fill_rgb(r, g, b);
                content.rect(*x, *y, *width, *height);
                content.fill_nonzero();
            }
            DrawOp::StrokeRect {
                x,
                y,
                width,
                height,
                color,
                line_width,
            } => {
                let (r, g, b) = rgb(*color);
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(*line_width);
                content.rect(*x, *y, *width, *height);
                content.stroke();
            }
            DrawOp::Line {
                from,
                to,
                color,
                line_width,
            } => {
                let (r, g, b) = rgb(*color);
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(*line_width);
                content.move_to(from.0, from.1);
                content.line_to(to.0, to.1);
                content.stroke();
            }
            DrawOp::Image {
                index,
                x,
                y,
                width,
                height,
            } => {
                if !images.contains_key(index) {
                    continue;
                }
                let name = image_name(*index);
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }
    }
    content
}
