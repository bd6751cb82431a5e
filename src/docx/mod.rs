mod styles;

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use crate::error::Error;
use crate::model::Image;

use styles::{HeadingStyles, outline_level, parse_heading_styles};

pub(super) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Converts a DOCX buffer to HTML-like markup. Every embedded image is handed
/// to `on_image` in document order; its return value becomes the `src` of the
/// `<img>` written in the image's place.
pub trait MarkupConverter: Send + Sync {
    fn convert(
        &self,
        docx: &[u8],
        on_image: &mut dyn FnMut(Image) -> String,
    ) -> Result<String, Error>;
}

/// Built-in converter for WordprocessingML packages.
///
/// Emits `h1`–`h6` for heading styles, `li` for numbered or bulleted
/// paragraphs, `p` otherwise, `strong`/`em` for bold and italic runs, `br`
/// for line breaks, `img` for pictures and `table`/`tr`/`th`/`td` for tables
/// (rows marked as repeating headers use `th`). Tracked deletions are left
/// out, insertions kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocxMarkupConverter;

impl MarkupConverter for DocxMarkupConverter {
    fn convert(
        &self,
        docx: &[u8],
        on_image: &mut dyn FnMut(Image) -> String,
    ) -> Result<String, Error> {
        let t0 = std::time::Instant::now();
        let mut zip = zip::ZipArchive::new(Cursor::new(docx))
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

        let styles = parse_heading_styles(&mut zip);
        let rels = read_zip_text(&mut zip, "word/_rels/document.xml.rels")
            .map(|xml| parse_rels_xml(&xml))
            .unwrap_or_default();

        let mut xml_content = String::new();
        zip.by_name("word/document.xml")
            .map_err(|_| Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into()))?
            .read_to_string(&mut xml_content)?;

        let xml = roxmltree::Document::parse(&xml_content)?;
        let body = wml(xml.root_element(), "body")
            .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

        let mut writer = MarkupWriter {
            out: String::with_capacity(xml_content.len() / 4),
            zip: &mut zip,
            rels: &rels,
            styles: &styles,
            on_image,
            images: 0,
        };
        writer.blocks(body);
        let images = writer.images;
        let markup = writer.out;

        log::debug!(
            "DOCX converted in {:.1}ms: {} bytes of markup, {} images",
            t0.elapsed().as_secs_f64() * 1000.0,
            markup.len(),
            images
        );
        Ok(markup)
    }
}

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(super) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn wml_bool(parent: roxmltree::Node, name: &str) -> bool {
    wml(parent, name).is_some_and(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false" && v != "off")
    })
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

pub(super) fn read_zip_text<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

fn parse_rels_xml(xml_content: &str) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        return rels;
    };
    for node in xml.root_element().children() {
        if node.tag_name().name() == "Relationship"
            && let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target"))
        {
            rels.insert(id.to_string(), target.to_string());
        }
    }
    rels
}

/// Flatten SDT wrappers: descend into w:sdtContent and collect effective children.
fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if is_wml(child, "sdt") {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

/// Relationship id of a picture: DrawingML `a:blip/@r:embed` or VML `v:imagedata/@r:id`.
fn find_image_rel<'a>(container: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    container
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute((REL_NS, "embed")))
        .or_else(|| {
            container
                .descendants()
                .find(|n| n.tag_name().name() == "imagedata")
                .and_then(|n| n.attribute((REL_NS, "id")))
        })
}

fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn emphasized(out: &mut String, text: &str, bold: bool, italic: bool) {
    if text.is_empty() {
        return;
    }
    match (bold, italic) {
        (true, true) => out.push_str(&format!("<strong><em>{text}</em></strong>")),
        (true, false) => out.push_str(&format!("<strong>{text}</strong>")),
        (false, true) => out.push_str(&format!("<em>{text}</em>")),
        (false, false) => out.push_str(text),
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

struct MarkupWriter<'w, 'i, R: Read + Seek> {
    out: String,
    zip: &'w mut zip::ZipArchive<R>,
    rels: &'w HashMap<String, String>,
    styles: &'w HeadingStyles,
    on_image: &'w mut (dyn FnMut(Image) -> String + 'i),
    images: usize,
}

impl<R: Read + Seek> MarkupWriter<'_, '_, R> {
    fn blocks(&mut self, parent: roxmltree::Node) {
        for node in collect_block_nodes(parent) {
            if node.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "p" => self.paragraph(node),
                "tbl" => self.table(node),
                "customXml" => self.blocks(node),
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, p: roxmltree::Node) {
        let ppr = wml(p, "pPr");
        let level = ppr.and_then(|ppr| {
            wml_attr(ppr, "pStyle")
                .and_then(|id| self.styles.level(id))
                .or_else(|| outline_level(ppr))
        });
        let tag = match level {
            Some(level) => format!("h{level}"),
            None if ppr.and_then(|ppr| wml(ppr, "numPr")).is_some() => "li".to_string(),
            None => "p".to_string(),
        };

        let mut inner = String::new();
        self.inline(p, &mut inner);
        if inner.trim().is_empty() {
            return;
        }
        self.out.push_str(&format!("<{tag}>{inner}</{tag}>"));
    }

    fn inline(&mut self, parent: roxmltree::Node, out: &mut String) {
        for child in parent.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "r" => self.run(child, out),
                "hyperlink" | "ins" | "smartTag" | "fldSimple" | "customXml" | "moveTo" | "dir"
                | "bdo" => self.inline(child, out),
                "sdt" => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.inline(content, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn run(&mut self, r: roxmltree::Node, out: &mut String) {
        let rpr = wml(r, "rPr");
        if rpr.is_some_and(|rpr| wml_bool(rpr, "vanish")) {
            return;
        }
        let bold = rpr.is_some_and(|rpr| wml_bool(rpr, "b"));
        let italic = rpr.is_some_and(|rpr| wml_bool(rpr, "i"));

        let mut text = String::new();
        for child in r.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "t" => escape_into(&mut text, child.text().unwrap_or("")),
                "tab" => text.push('\t'),
                "br" if child.attribute((WML_NS, "type")).is_none_or(|t| t == "textWrapping") => {
                    text.push_str("<br />");
                }
                "cr" => text.push_str("<br />"),
                "noBreakHyphen" => text.push('-'),
                "drawing" | "pict" | "object" => {
                    if let Some(src) = self.image(child) {
                        emphasized(out, &std::mem::take(&mut text), bold, italic);
                        out.push_str("<img src=\"");
                        escape_into(out, &src);
                        out.push_str("\" />");
                    }
                }
                _ => {}
            }
        }
        emphasized(out, &text, bold, italic);
    }

    fn image(&mut self, container: roxmltree::Node) -> Option<String> {
        let rel_id = find_image_rel(container)?;
        let Some(target) = self.rels.get(rel_id) else {
            log::warn!("Picture references unknown relationship {rel_id}");
            return None;
        };
        let zip_path = target
            .strip_prefix('/')
            .map(String::from)
            .unwrap_or_else(|| format!("word/{target}"));
        let mut data = Vec::new();
        let read = self
            .zip
            .by_name(&zip_path)
            .map_err(|e| e.to_string())
            .and_then(|mut entry| entry.read_to_end(&mut data).map_err(|e| e.to_string()));
        if let Err(e) = read {
            log::warn!("Cannot read picture {zip_path}: {e}");
            return None;
        }
        self.images += 1;
        Some((self.on_image)(Image {
            data,
            content_type: content_type_for(&zip_path).to_string(),
        }))
    }

    fn table(&mut self, tbl: roxmltree::Node) {
        self.out.push_str("<table>");
        for tr in collect_block_nodes(tbl).into_iter().filter(|n| is_wml(*n, "tr")) {
            let header = wml(tr, "trPr").is_some_and(|pr| wml_bool(pr, "tblHeader"));
            let cell_tag = if header { "th" } else { "td" };
            self.out.push_str("<tr>");
            for tc in collect_block_nodes(tr).into_iter().filter(|n| is_wml(*n, "tc")) {
                self.out.push_str(&format!("<{cell_tag}>"));
                self.blocks(tc);
                self.out.push_str(&format!("</{cell_tag}>"));
            }
            self.out.push_str("</tr>");
        }
        self.out.push_str("</table>");
    }
}
