use std::collections::HashMap;
use std::io::{Read, Seek};

use super::{WML_NS, read_zip_text, wml, wml_attr};

struct ParagraphStyle {
    level: Option<u8>,
    based_on: Option<String>,
}

/// Heading levels of the document's paragraph styles, keyed by style id.
#[derive(Debug, Default)]
pub(super) struct HeadingStyles {
    levels: HashMap<String, u8>,
}

impl HeadingStyles {
    /// Level 1..=6 when paragraphs in this style are headings.
    pub(super) fn level(&self, style_id: &str) -> Option<u8> {
        self.levels
            .get(style_id)
            .copied()
            .or_else(|| level_from_name(style_id))
    }
}

/// "Title", "heading 2", "Heading2" and friends. Deeper levels fold into h6.
fn level_from_name(name: &str) -> Option<u8> {
    let name = name.trim().to_ascii_lowercase();
    if name == "title" {
        return Some(1);
    }
    let digits = name.strip_prefix("heading")?.trim_start();
    let n: u8 = digits.parse().ok()?;
    (1..=9).contains(&n).then_some(n.min(6))
}

/// `w:outlineLvl` of a paragraph or style `w:pPr`, as a heading level.
pub(super) fn outline_level(ppr: roxmltree::Node) -> Option<u8> {
    let lvl: u8 = wml_attr(ppr, "outlineLvl")?.parse().ok()?;
    // 9 means body text
    (lvl < 9).then_some((lvl + 1).min(6))
}

pub(super) fn parse_heading_styles<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> HeadingStyles {
    let Some(xml_content) = read_zip_text(zip, "word/styles.xml") else {
        return HeadingStyles::default();
    };
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        log::warn!("word/styles.xml is not well-formed, using built-in heading names");
        return HeadingStyles::default();
    };

    let mut styles: HashMap<String, ParagraphStyle> = HashMap::new();
    for node in xml.root_element().children() {
        if node.tag_name().name() != "style"
            || node.tag_name().namespace() != Some(WML_NS)
            || node.attribute((WML_NS, "type")) != Some("paragraph")
        {
            continue;
        }
        let Some(id) = node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let level = wml_attr(node, "name")
            .and_then(level_from_name)
            .or_else(|| wml(node, "pPr").and_then(outline_level));
        styles.insert(
            id.to_string(),
            ParagraphStyle {
                level,
                based_on: wml_attr(node, "basedOn").map(str::to_string),
            },
        );
    }

    let mut levels = HashMap::new();
    for id in styles.keys() {
        if let Some(level) = resolve_level(&styles, id) {
            levels.insert(id.clone(), level);
        }
    }
    log::debug!("{} of {} paragraph styles are headings", levels.len(), styles.len());
    HeadingStyles { levels }
}

/// Walk the basedOn chain until a style declares a level. Cycles end the walk.
fn resolve_level(styles: &HashMap<String, ParagraphStyle>, id: &str) -> Option<u8> {
    let mut chain: Vec<&str> = Vec::new();
    let mut current = id;
    loop {
        if chain.contains(&current) {
            return None;
        }
        chain.push(current);
        let style = styles.get(current)?;
        if style.level.is_some() {
            return style.level;
        }
        current = style.based_on.as_deref()?;
    }
}
