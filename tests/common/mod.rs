#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use review_copy::ReviewMetadata;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A fully populated submission.
pub fn metadata() -> ReviewMetadata {
    ReviewMetadata {
        manuscript_id: "AIR-2026-0042".into(),
        title: "Regional Effects of Broadband Subsidies on Small Business Formation".into(),
        authors: "A. Author, B. Author".into(),
        article_type: "Original Research".into(),
        keywords: "broadband, subsidies, entrepreneurship".into(),
        category: "Economics".into(),
        abstract_text: "We study how broadband subsidies change business formation.".into(),
        reviewer_name: "jane q. reviewer".into(),
        deadline: Some(date(2026, 4, 1)),
        received: Some(date(2026, 3, 9)),
    }
}

/// Solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Minimal WordprocessingML package builder.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: String,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
        ));
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
        ));
        self
    }

    /// First row is marked as a repeating header row.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for (i, row) in rows.iter().enumerate() {
            self.body.push_str("<w:tr>");
            if i == 0 {
                self.body.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for cell in *row {
                self.body.push_str(&format!(
                    "<w:tc><w:p><w:r><w:t>{cell}</w:t></w:r></w:p></w:tc>"
                ));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    pub fn image(mut self, data: Vec<u8>) -> Self {
        let n = self.media.len() + 1;
        self.rels.push_str(&format!(
            r#"<Relationship Id="rIdImg{n}" Type="{REL_NS}/image" Target="media/image{n}.png"/>"#
        ));
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:drawing><a:graphic><a:graphicData><a:blip r:embed="rIdImg{n}"/></a:graphicData></a:graphic></w:drawing></w:r></w:p>"#
        ));
        self.media.push((format!("word/media/image{n}.png"), data));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("[Content_Types].xml", opts).expect("start");
            zip.write_all(
                br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
            )
            .expect("write");
            zip.start_file("word/document.xml", opts).expect("start");
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="{WML_NS}" xmlns:a="{DML_NS}" xmlns:r="{REL_NS}"><w:body>{}</w:body></w:document>"#,
                self.body
            )
            .expect("write");
            zip.start_file("word/_rels/document.xml.rels", opts).expect("start");
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                self.rels
            )
            .expect("write");
            for (name, data) in &self.media {
                zip.start_file(name.as_str(), opts).expect("start");
                zip.write_all(data).expect("write");
            }
            zip.finish().expect("finish");
        }
        buf.into_inner()
    }
}

/// Keep generated PDFs around for manual inspection: tests/output/<name>.pdf
pub fn save_output(name: &str, bytes: &[u8]) {
    let dir = PathBuf::from("tests/output");
    if fs::create_dir_all(&dir).is_ok() {
        fs::write(dir.join(format!("{name}.pdf")), bytes).ok();
    }
}

pub fn load(bytes: &[u8]) -> lopdf::Document {
    lopdf::Document::load_mem(bytes).expect("generated PDF parses")
}

/// A document info entry, decoded from PDFDocEncoding or UTF-16BE.
pub fn info_entry(doc: &lopdf::Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_id).ok()?;
    match info.get(key).ok()? {
        lopdf::Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Number of `Do` operators on each page, in page order.
pub fn images_per_page(doc: &lopdf::Document) -> Vec<usize> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let raw = doc.get_page_content(page_id);
            let content = lopdf::content::Content::decode(&raw).expect("decode content");
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Do")
                .count()
        })
        .collect()
}

/// Width and height of every page's media box.
pub fn media_boxes(doc: &lopdf::Document) -> Vec<(f32, f32)> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).expect("page dict");
            let media = page
                .get(b"MediaBox")
                .and_then(lopdf::Object::as_array)
                .expect("media box");
            let n: Vec<f32> = media
                .iter()
                .map(|v| v.as_float().expect("number"))
                .collect();
            (n[2] - n[0], n[3] - n[1])
        })
        .collect()
}

/// First well-known Latin TrueType font found in the usual system font directories.
pub fn system_ttf() -> Option<PathBuf> {
    const NAMES: &[&str] = &[
        "DejaVuSans.ttf",
        "LiberationSans-Regular.ttf",
        "LiberationSerif-Regular.ttf",
        "NotoSans-Regular.ttf",
        "FreeSans.ttf",
        "Arial.ttf",
        "arial.ttf",
        "Verdana.ttf",
    ];
    let mut dirs: Vec<PathBuf> = vec![
        "/usr/share/fonts".into(),
        "/usr/local/share/fonts".into(),
        "/Library/Fonts".into(),
        "/System/Library/Fonts/Supplemental".into(),
        "C:\\Windows\\Fonts".into(),
    ];
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(PathBuf::from(&home).join(".local/share/fonts"));
        dirs.push(PathBuf::from(&home).join(".fonts"));
    }
    let mut found: Vec<PathBuf> = Vec::new();
    for dir in &dirs {
        collect_ttf(dir, 0, &mut found);
    }
    NAMES.iter().find_map(|name| {
        found
            .iter()
            .find(|p| p.file_name().is_some_and(|f| f == *name))
            .cloned()
    })
}

fn collect_ttf(dir: &std::path::Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > 4 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_ttf(&path, depth + 1, out);
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("ttf"))
        {
            out.push(path);
        }
    }
}
