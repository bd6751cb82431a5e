use std::path::{Path, PathBuf};

/// Physical page size and margins, in PDF points.
#[derive(Clone, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
}

impl PageGeometry {
    /// US Letter with one-inch margins.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin_top: 72.0,
            margin_right: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margin_left - self.margin_right).max(1.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - self.margin_top - self.margin_bottom).max(1.0)
    }

    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::letter()
    }
}

/// Sizes, leadings and spacings used by the body flow and the table renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct Typography {
    pub body_size: f32,
    pub body_line_height: f32,
    pub paragraph_space_after: f32,

    pub heading_size: f32,
    pub heading_line_height: f32,
    pub heading_space_before: f32,
    pub heading_space_after: f32,
    /// Paragraphs at or above this many characters are never drawn as headings.
    pub heading_max_chars: usize,

    pub table_font_size: f32,
    pub table_line_leading: f32,
    pub table_cell_pad_x: f32,
    pub table_cell_pad_y: f32,
    pub table_min_column_width: f32,
    pub table_min_text_width: f32,
    pub table_max_column_share: f32,
    pub table_border_width: f32,
    pub table_space_before: f32,
    pub table_space_after: f32,

    pub image_max_height: f32,
    pub image_space_before: f32,
    pub image_space_after: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            body_size: 11.0,
            body_line_height: 15.0,
            paragraph_space_after: 5.0,

            heading_size: 12.0,
            heading_line_height: 17.0,
            heading_space_before: 8.0,
            heading_space_after: 4.0,
            heading_max_chars: 80,

            table_font_size: 8.0,
            table_line_leading: 3.0,
            table_cell_pad_x: 4.0,
            table_cell_pad_y: 3.0,
            table_min_column_width: 30.0,
            table_min_text_width: 20.0,
            table_max_column_share: 0.5,
            table_border_width: 0.5,
            table_space_before: 8.0,
            table_space_after: 12.0,

            image_max_height: 300.0,
            image_space_before: 10.0,
            image_space_after: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub text: [u8; 3],
    pub navy: [u8; 3],
    pub red: [u8; 3],
    pub gray: [u8; 3],
    pub light_gray: [u8; 3],
    pub label_background: [u8; 3],
    pub table_header_background: [u8; 3],
    pub table_band_background: [u8; 3],
    pub table_border: [u8; 3],
    pub watermark: [u8; 3],
    pub watermark_opacity: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: [0, 0, 0],
            navy: [10, 22, 40],
            red: [181, 67, 42],
            gray: [103, 115, 130],
            light_gray: [199, 204, 212],
            label_background: [248, 250, 252],
            table_header_background: [235, 237, 242],
            table_band_background: [247, 250, 252],
            table_border: [140, 148, 158],
            watermark: [199, 31, 31],
            watermark_opacity: 0.35,
        }
    }
}

/// Fixed wording printed on the cover and overlay, and the PDF producer fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Branding {
    pub journal_name: String,
    pub journal_subtitle: String,
    pub draft_label: String,
    pub confidential_banner: String,
    pub confidential_tag: String,
    pub review_notice: String,
    pub distribution_notice: String,
    pub watermark_text: String,
    pub cover_footer: String,
    pub document_subject: String,
    pub producer: String,
    pub creator: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            journal_name: "American Impact Review".into(),
            journal_subtitle: "A Peer-Reviewed Multidisciplinary Journal".into(),
            draft_label: "-- Manuscript Draft --".into(),
            confidential_banner: "CONFIDENTIAL - FOR PEER REVIEW ONLY".into(),
            confidential_tag: "CONFIDENTIAL".into(),
            review_notice: "For Peer Review Only".into(),
            distribution_notice:
                "This document is confidential. Do not distribute, cite, or upload to any AI tools."
                    .into(),
            watermark_text: "CONFIDENTIAL - PEER REVIEW COPY".into(),
            cover_footer:
                "American Impact Review | 501(c)(3) nonprofit (Global Talent Foundation) | CONFIDENTIAL"
                    .into(),
            document_subject: "Confidential Manuscript for Peer Review".into(),
            producer: "American Impact Review".into(),
            creator: "AIR Review Copy Generator".into(),
        }
    }
}

/// Four TrueType/OpenType files making up the serif/sans pair.
#[derive(Clone, Debug, PartialEq)]
pub struct TrueTypeFiles {
    pub serif: PathBuf,
    pub serif_bold: PathBuf,
    pub sans: PathBuf,
    pub sans_bold: PathBuf,
}

impl TrueTypeFiles {
    /// Expects `serif.ttf`, `serif-bold.ttf`, `sans.ttf` and `sans-bold.ttf` in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            serif: dir.join("serif.ttf"),
            serif_bold: dir.join("serif-bold.ttf"),
            sans: dir.join("sans.ttf"),
            sans_bold: dir.join("sans-bold.ttf"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FontSource {
    /// Times and Helvetica from the PDF base-14 set, WinAnsi encoded, not embedded.
    #[default]
    Standard,
    /// Embedded subset fonts loaded from disk.
    TrueType(TrueTypeFiles),
}

pub const FONT_DIR_ENV: &str = "REVIEW_COPY_FONT_DIR";

/// Everything the pipeline treats as a constant. Immutable once handed to a generator.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub page: PageGeometry,
    pub typography: Typography,
    pub palette: Palette,
    pub branding: Branding,
    pub fonts: FontSource,
    /// Redraw the header row at the top of each page a table continues on.
    pub repeat_table_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            typography: Typography::default(),
            palette: Palette::default(),
            branding: Branding::default(),
            fonts: FontSource::Standard,
            repeat_table_header: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with TrueType fonts taken from `REVIEW_COPY_FONT_DIR` when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(dir) = std::env::var(FONT_DIR_ENV) {
            let dir = dir.trim();
            if !dir.is_empty() {
                log::debug!("Using fonts from {FONT_DIR_ENV}={dir}");
                config.fonts = FontSource::TrueType(TrueTypeFiles::in_dir(Path::new(dir)));
            }
        }
        config
    }

    pub fn with_fonts(mut self, fonts: FontSource) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_page(mut self, page: PageGeometry) -> Self {
        self.page = page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_content_box() {
        let page = PageGeometry::letter();
        assert_eq!(page.content_width(), 468.0);
        assert_eq!(page.content_height(), 648.0);
        assert_eq!(page.content_top(), 720.0);
    }

    #[test]
    fn new_repeats_table_headers() {
        assert!(Config::new().repeat_table_header);
        assert_eq!(Config::new().fonts, FontSource::Standard);
    }

    #[test]
    fn font_dir_layout() {
        let files = TrueTypeFiles::in_dir(Path::new("/fonts"));
        assert_eq!(files.serif_bold, PathBuf::from("/fonts/serif-bold.ttf"));
        assert_eq!(files.sans, PathBuf::from("/fonts/sans.ttf"));
    }
}
