use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::config::{FontSource, TrueTypeFiles};
use crate::error::Error;

/// The four faces of the fixed serif/sans pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontRole {
    Serif,
    SerifBold,
    Sans,
    SansBold,
}

impl FontRole {
    pub const ALL: [FontRole; 4] = [
        FontRole::Serif,
        FontRole::SerifBold,
        FontRole::Sans,
        FontRole::SansBold,
    ];

    fn index(self) -> usize {
        match self {
            FontRole::Serif => 0,
            FontRole::SerifBold => 1,
            FontRole::Sans => 2,
            FontRole::SansBold => 3,
        }
    }

    /// Resource name used in page dictionaries and content streams.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            FontRole::Serif => "F1",
            FontRole::SerifBold => "F2",
            FontRole::Sans => "F3",
            FontRole::SansBold => "F4",
        }
    }

    fn standard_base_font(self) -> &'static str {
        match self {
            FontRole::Serif => "Times-Roman",
            FontRole::SerifBold => "Times-Bold",
            FontRole::Sans => "Helvetica",
            FontRole::SansBold => "Helvetica-Bold",
        }
    }
}

/// Advance widths for WinAnsi bytes 32..=255, in 1000-unit em space.
#[derive(Clone, Debug)]
pub(crate) struct FontMetrics {
    widths_1000: Vec<f32>,
    pub(crate) ascender_ratio: f32,
}

impl FontMetrics {
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        let byte = if ch == '\t' { b' ' } else { char_to_winansi(ch) };
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn space_width(&self, font_size: f32) -> f32 {
        self.char_width_1000(' ') * font_size / 1000.0
    }

    /// Distance from the top of a line box to its baseline.
    pub(crate) fn ascent(&self, font_size: f32) -> f32 {
        font_size * self.ascender_ratio
    }
}

enum FontProgram {
    Standard,
    TrueType { ps_name: String, data: Mmap },
}

pub(crate) struct FontFace {
    role: FontRole,
    pub(crate) metrics: FontMetrics,
    program: FontProgram,
}

/// Loaded once per generator and shared read-only between generations.
pub struct FontSet {
    faces: [FontFace; 4],
}

impl FontSet {
    pub fn standard() -> Self {
        Self {
            faces: FontRole::ALL.map(standard_face),
        }
    }

    pub fn load(source: &FontSource) -> Result<Self, Error> {
        match source {
            FontSource::Standard => Ok(Self::standard()),
            FontSource::TrueType(files) => Self::load_truetype(files),
        }
    }

    fn load_truetype(files: &TrueTypeFiles) -> Result<Self, Error> {
        let t0 = std::time::Instant::now();
        let faces = [
            load_truetype_face(FontRole::Serif, &files.serif)?,
            load_truetype_face(FontRole::SerifBold, &files.serif_bold)?,
            load_truetype_face(FontRole::Sans, &files.sans)?,
            load_truetype_face(FontRole::SansBold, &files.sans_bold)?,
        ];
        log::debug!(
            "Loaded TrueType font set in {:.1}ms",
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Self { faces })
    }

    pub(crate) fn face(&self, role: FontRole) -> &FontFace {
        &self.faces[role.index()]
    }

    pub(crate) fn metrics(&self, role: FontRole) -> &FontMetrics {
        &self.face(role).metrics
    }
}

fn standard_face(role: FontRole) -> FontFace {
    let (ascii, ascender) = match role {
        FontRole::Serif => (&TIMES_ROMAN_ASCII, 0.683),
        FontRole::SerifBold => (&TIMES_BOLD_ASCII, 0.676),
        FontRole::Sans => (&HELVETICA_ASCII, 0.718),
        FontRole::SansBold => (&HELVETICA_BOLD_ASCII, 0.718),
    };
    FontFace {
        role,
        metrics: FontMetrics {
            widths_1000: standard_widths(ascii),
            ascender_ratio: ascender,
        },
        program: FontProgram::Standard,
    }
}

fn load_truetype_face(role: FontRole, path: &Path) -> Result<FontFace, Error> {
    let font_err = |e: &dyn std::fmt::Display| Error::Font(format!("{}: {e}", path.display()));
    let file = File::open(path).map_err(|e| font_err(&e))?;
    let data = unsafe { Mmap::map(&file) }.map_err(|e| font_err(&e))?;

    let (metrics, ps_name) = {
        let face = Face::parse(&data, 0).map_err(|e| font_err(&e))?;
        let units = face.units_per_em() as f32;
        let widths_1000: Vec<f32> = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();
        let metrics = FontMetrics {
            widths_1000,
            ascender_ratio: face.ascender() as f32 / units,
        };
        let family = font_family_name(&face).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| role.standard_base_font().to_string())
        });
        (metrics, family.replace(' ', ""))
    };

    log::debug!("Font {:?} -> {} ({})", role, ps_name, path.display());
    Ok(FontFace {
        role,
        metrics,
        program: FontProgram::TrueType { ps_name, data },
    })
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

/// A font written into the PDF, ready to encode text for content streams.
pub(crate) struct EmbeddedFont {
    pub(crate) font_ref: Ref,
    char_to_gid: Option<BTreeMap<char, u16>>,
}

impl EmbeddedFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

pub(crate) fn embed_font(
    pdf: &mut Pdf,
    face: &FontFace,
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> EmbeddedFont {
    let font_ref = alloc();
    if let FontProgram::TrueType { ps_name, data } = &face.program {
        if let Some(char_to_gid) = embed_truetype(pdf, font_ref, ps_name, data, used_chars, alloc) {
            return EmbeddedFont {
                font_ref,
                char_to_gid: Some(char_to_gid),
            };
        }
        log::warn!(
            "Embedding {ps_name} failed, using {}",
            face.role.standard_base_font()
        );
    }
    pdf.type1_font(font_ref)
        .base_font(Name(face.role.standard_base_font().as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    EmbeddedFont {
        font_ref,
        char_to_gid: None,
    }
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding,
/// subset to the characters actually drawn.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    ps_name: &str,
    font_data: &[u8],
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<BTreeMap<char, u16>> {
    let face = Face::parse(font_data, 0).ok()?;
    let descriptor_ref = alloc();
    let data_ref = alloc();

    let units = face.units_per_em() as f32;
    let to_1000 = |v: f32| v / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| to_1000(h as f32))
        .unwrap_or(700.0);
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        to_1000(bb.x_min as f32),
        to_1000(bb.y_min as f32),
        to_1000(bb.x_max as f32),
        to_1000(bb.y_max as f32),
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = BTreeMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| to_1000(adv as f32))
                .unwrap_or(0.0);
            gid_widths.push((new_gid, w));
        }
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let subset_data = subsetter::subset(font_data, 0, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {ps_name}: {e}, embedding full font");
        font_data.to_vec()
    });
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(to_1000(face.ascender() as f32))
        .descent(to_1000(face.descender() as f32))
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(identity_system_info());
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(Name(cmap_name.as_bytes()), identity_system_info());
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

fn identity_system_info() -> pdf_writer::types::SystemInfo<'static> {
    pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
pub(crate) fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0000..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert text to WinAnsi (Windows-1252) bytes for simple-font `Str` operands.
/// Tabs are drawn as spaces; anything unmappable is dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match char_to_winansi(c) {
            b'\t' => Some(b' '),
            b if b >= 0x20 => Some(b),
            _ => None,
        })
        .collect()
}

/// Encode text as big-endian 2-byte glyph IDs for CIDFont content streams.
fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let ch = if ch == '\t' { ' ' } else { ch };
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}

/// Base letter used to borrow a width for accented Latin-1 characters.
fn width_fallback(ch: char) -> Option<char> {
    let base = match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ð' => 'D',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' | 'Ÿ' => 'Y',
        'Š' => 'S',
        'Ž' => 'Z',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'š' => 's',
        'ž' => 'z',
        '\u{00A0}' => ' ',
        '\u{00AD}' | '\u{2013}' => '-',
        '\u{00B7}' => '.',
        '\u{2018}' | '\u{2019}' | '\u{201A}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
        _ => return None,
    };
    Some(base)
}

fn standard_widths(ascii: &[u16; 95]) -> Vec<f32> {
    let ascii_width = |ch: char| ascii[(ch as usize) - 32] as f32;
    (32u8..=255u8)
        .map(|byte| match byte {
            32..=126 => ascii[(byte - 32) as usize] as f32,
            127 => 0.0,
            _ => match width_fallback(winansi_to_char(byte)) {
                Some(base) => ascii_width(base),
                None => ascii_width('o'),
            },
        })
        .collect()
}

// AFM advance widths for ASCII 32..=126.

#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_ASCII: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_ASCII: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_known_widths() {
        let fonts = FontSet::standard();
        let m = fonts.metrics(FontRole::Sans);
        assert_eq!(m.char_width_1000(' '), 278.0);
        assert_eq!(m.char_width_1000('W'), 944.0);
        assert_eq!(m.char_width_1000('i'), 222.0);
        assert!((m.text_width("Name", 10.0) - 26.67).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let fonts = FontSet::standard();
        let text = "Peer Review Assignment";
        assert!(
            fonts.metrics(FontRole::SerifBold).text_width(text, 12.0)
                > fonts.metrics(FontRole::Serif).text_width(text, 12.0)
        );
        assert!(
            fonts.metrics(FontRole::SansBold).text_width(text, 12.0)
                > fonts.metrics(FontRole::Sans).text_width(text, 12.0)
        );
    }

    #[test]
    fn accented_letters_borrow_base_width() {
        let fonts = FontSet::standard();
        let m = fonts.metrics(FontRole::Serif);
        assert_eq!(m.char_width_1000('é'), m.char_width_1000('e'));
        assert_eq!(m.char_width_1000('Ü'), m.char_width_1000('U'));
        assert_eq!(m.char_width_1000('\t'), m.char_width_1000(' '));
        assert_eq!(m.char_width_1000('\u{4E2D}'), 0.0);
    }

    #[test]
    fn winansi_encoding() {
        assert_eq!(to_winansi_bytes("a€\tb"), vec![b'a', 0x80, b' ', b'b']);
        assert_eq!(to_winansi_bytes("x\ny"), vec![b'x', b'y']);
        for byte in 0x80u8..=0xFF {
            let ch = winansi_to_char(byte);
            if char_to_winansi(ch) != 0 {
                assert_eq!(char_to_winansi(ch), byte);
            }
        }
    }

    #[test]
    fn missing_font_file_is_font_error() {
        let files = TrueTypeFiles::in_dir(Path::new("/nonexistent/review-copy-fonts"));
        let err = FontSet::load(&FontSource::TrueType(files)).err();
        assert!(matches!(err, Some(Error::Font(_))));
    }
}
