//! Single-pass scanner over the HTML-like markup produced by the DOCX converter.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Block, Table};

use super::IMAGE_SRC_PREFIX;

const BLOCK_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "li", "blockquote", "figcaption", "caption",
    "dt", "dd",
];

static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
});

#[derive(Debug, PartialEq)]
pub(super) struct Tag<'a> {
    pub(super) name: String,
    pub(super) closing: bool,
    raw: &'a str,
}

impl<'a> Tag<'a> {
    fn parse(raw: &'a str) -> Self {
        let inner = raw.trim_start_matches('<').trim_end_matches('>').trim();
        let closing = inner.starts_with('/');
        let name = inner
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '!')
            .collect::<String>()
            .to_ascii_lowercase();
        Self { name, closing, raw }
    }

    fn src(&self) -> Option<String> {
        let caps = SRC_ATTR.captures(self.raw)?;
        let value = caps.get(1).or(caps.get(2)).or(caps.get(3))?;
        Some(decode_entities(value.as_str()))
    }

    fn is_block(&self) -> bool {
        BLOCK_TAGS.contains(&self.name.as_str())
    }

    fn heading_level(&self) -> Option<u8> {
        match self.name.as_bytes() {
            [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(super) enum Token<'a> {
    Text(&'a str),
    Tag(Tag<'a>),
}

/// Splits markup into text runs and tags. Comments are dropped; a `<` that
/// does not start a well-formed tag is ordinary text.
pub(super) struct Tokens<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub(super) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                return None;
            }
            if rest.starts_with("<!--") {
                self.pos += rest.find("-->").map_or(rest.len(), |i| i + 3);
                continue;
            }
            let opens_tag = rest.starts_with('<')
                && rest[1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
            if opens_tag && let Some(end) = rest.find('>') {
                self.pos += end + 1;
                return Some(Token::Tag(Tag::parse(&rest[..=end])));
            }
            let skip = rest.chars().next().map_or(1, char::len_utf8);
            let len = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
            self.pos += len;
            return Some(Token::Text(&rest[..len]));
        }
    }
}

/// Decode the named entities the converter emits plus decimal and hex
/// character references. Anything unrecognised is left as written.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..].find(';').filter(|&i| i <= 10).and_then(|i| {
            let entity = &rest[1..=i];
            decode_entity(entity).map(|c| (c, i + 2))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
    /// Depth of tables nested inside a cell; their structure is flattened.
    nested: usize,
}

impl TableBuilder {
    fn finish_cell(&mut self) {
        if let Some(cell) = self.cell.take() {
            let text = collapse_whitespace(&decode_entities(&cell));
            if let Some(cells) = &mut self.row {
                cells.push(text);
            }
        }
    }

    fn finish_row(&mut self) {
        self.finish_cell();
        if let Some(cells) = self.row.take()
            && !cells.is_empty()
        {
            self.rows.push(cells);
        }
    }

    fn space(&mut self) {
        if let Some(cell) = &mut self.cell {
            cell.push(' ');
        }
    }

    fn tag(&mut self, tag: &Tag) {
        let name = tag.name.as_str();
        if self.nested > 0 {
            match (name, tag.closing) {
                ("table", false) => self.nested += 1,
                ("table", true) => self.nested -= 1,
                _ => {}
            }
            self.space();
            return;
        }
        match (name, tag.closing) {
            ("table", false) => {
                self.nested += 1;
                self.space();
            }
            ("tr", false) => {
                self.finish_row();
                self.row = Some(Vec::new());
            }
            ("tr", true) => self.finish_row(),
            ("td" | "th", false) => {
                self.finish_cell();
                self.row.get_or_insert_with(Vec::new);
                self.cell = Some(String::new());
            }
            ("td" | "th", true) => self.finish_cell(),
            ("br", _) => self.space(),
            _ if tag.is_block() => self.space(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(cell) = &mut self.cell {
            cell.push_str(text);
        }
    }

    /// Row 0 is the header whenever more rows follow it, `<th>` or not.
    /// A lone row is always data.
    fn build(mut self) -> Option<Table> {
        self.finish_row();
        let mut rows = self.rows.into_iter();
        let first = rows.next()?;
        let rest: Vec<Vec<String>> = rows.collect();
        let table = if !rest.is_empty() {
            Table {
                header: Some(first),
                rows: rest,
            }
        } else {
            Table {
                header: None,
                rows: vec![first],
            }
        };
        (!table.is_empty()).then_some(table)
    }
}

/// Consume tokens up to the `</table>` that closes an already-consumed `<table>`.
fn read_table<'a>(tokens: &mut impl Iterator<Item = Token<'a>>) -> Option<Table> {
    let mut builder = TableBuilder::default();
    for token in tokens.by_ref() {
        match token {
            Token::Tag(tag) if tag.name == "table" && tag.closing && builder.nested == 0 => break,
            Token::Tag(tag) => builder.tag(&tag),
            Token::Text(text) => builder.text(text),
        }
    }
    builder.build()
}

struct LineBuilder {
    blocks: Vec<Block>,
    current: String,
    heading_text: bool,
    heading_depth: usize,
}

impl LineBuilder {
    fn break_line(&mut self) {
        let text = std::mem::take(&mut self.current);
        if std::mem::take(&mut self.heading_text) && !text.trim().is_empty() {
            self.blocks.push(Block::Heading(text));
        } else {
            self.blocks.push(Block::Paragraph(text));
        }
    }

    fn push_text(&mut self, text: &str) {
        let decoded = decode_entities(text);
        let mut parts = decoded.split('\n');
        if let Some(first) = parts.next() {
            self.append(first);
        }
        for part in parts {
            self.break_line();
            self.append(part);
        }
    }

    fn append(&mut self, text: &str) {
        if self.heading_depth > 0 && !text.trim().is_empty() {
            self.heading_text = true;
        }
        self.current.push_str(text);
    }
}

/// Turn converter markup into line-level blocks plus the tables found in it.
/// `image_count` bounds which `src` references are accepted.
pub(super) fn scan(markup: &str, image_count: usize) -> (Vec<Block>, Vec<Table>) {
    let mut lines = LineBuilder {
        blocks: Vec::new(),
        current: String::new(),
        heading_text: false,
        heading_depth: 0,
    };
    let mut tables = Vec::new();
    let mut tokens = Tokens::new(markup);

    while let Some(token) = tokens.next() {
        let tag = match token {
            Token::Text(text) => {
                lines.push_text(text);
                continue;
            }
            Token::Tag(tag) => tag,
        };
        match tag.name.as_str() {
            "table" if !tag.closing => {
                lines.break_line();
                match read_table(&mut tokens) {
                    Some(table) => {
                        lines.blocks.push(Block::Table(tables.len()));
                        tables.push(table);
                    }
                    None => log::debug!("Dropping table without cells"),
                }
            }
            "img" => {
                let index = tag
                    .src()
                    .and_then(|src| src.strip_prefix(IMAGE_SRC_PREFIX)?.parse::<usize>().ok())
                    .filter(|&i| i < image_count);
                match index {
                    Some(index) => {
                        lines.break_line();
                        lines.blocks.push(Block::Image(index));
                    }
                    None => log::debug!("Ignoring image with unknown source: {}", tag.raw),
                }
            }
            "br" => lines.break_line(),
            _ if tag.heading_level().is_some() => {
                lines.break_line();
                if tag.closing {
                    lines.heading_depth = lines.heading_depth.saturating_sub(1);
                } else {
                    lines.heading_depth += 1;
                }
            }
            _ if tag.is_block() => lines.break_line(),
            _ => {}
        }
    }
    lines.break_line();
    (lines.blocks, tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(t) => t.clone(),
                Block::Heading(t) => format!("# {t}"),
                Block::Image(i) => format!("[img {i}]"),
                Block::Table(i) => format!("[table {i}]"),
            })
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn tokenizer_keeps_stray_angle_brackets() {
        let tokens: Vec<_> = Tokens::new("a < b <p>c</p><!-- x -->d").collect();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0], Token::Text("a "));
        assert_eq!(tokens[1], Token::Text("< b "));
        assert!(matches!(&tokens[2], Token::Tag(t) if t.name == "p" && !t.closing));
        assert!(matches!(&tokens[4], Token::Tag(t) if t.name == "p" && t.closing));
        assert_eq!(tokens[5], Token::Text("d"));
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&quot;x&quot; &apos;y&#39;"), "\"x\" 'y'");
        assert_eq!(decode_entities("&#233;&#xE9;&nbsp;"), "\u{e9}\u{e9}\u{a0}");
        assert_eq!(decode_entities("AT&T &bogus; &"), "AT&T &bogus; &");
    }

    #[test]
    fn paragraphs_headings_and_breaks() {
        let (blocks, tables) = scan(
            "<h1>Intro</h1><p>First <strong>bold</strong> line<br/>second</p><ul><li>item</li></ul>",
            0,
        );
        assert!(tables.is_empty());
        assert_eq!(
            texts(&blocks),
            vec!["# Intro", "First bold line", "second", "item"]
        );
    }

    #[test]
    fn images_only_for_known_sources() {
        let markup = format!(
            "<p>before</p><p><img src=\"{IMAGE_SRC_PREFIX}0\" /></p><img src=\"{IMAGE_SRC_PREFIX}7\"><img src='http://x'>"
        );
        let (blocks, _) = scan(&markup, 1);
        assert_eq!(texts(&blocks), vec!["before", "[img 0]"]);
    }

    #[test]
    fn table_with_th_header() {
        let (blocks, tables) = scan(
            "<p>x</p><table><tr><th>Name</th><th>Score</th></tr>\
             <tr><td><p>Alice</p></td><td>9&amp;1</td></tr></table><p>y</p>",
            0,
        );
        assert_eq!(texts(&blocks), vec!["x", "[table 0]", "y"]);
        assert_eq!(tables[0].header, Some(cells(&["Name", "Score"])));
        assert_eq!(tables[0].rows, vec![cells(&["Alice", "9&1"])]);
    }

    #[test]
    fn header_tie_break() {
        // no <th>, but more rows follow: row 0 is still the header
        let (_, tables) = scan("<table><tr><td>a</td></tr><tr><td>b</td></tr></table>", 0);
        assert_eq!(tables[0].header, Some(cells(&["a"])));
        assert_eq!(tables[0].rows, vec![cells(&["b"])]);

        // single row, no <th>: data only
        let (_, tables) = scan("<table><tr><td>a</td><td>b</td></tr></table>", 0);
        assert_eq!(tables[0].header, None);
        assert_eq!(tables[0].rows, vec![cells(&["a", "b"])]);

        // single row of <th>: still data
        let (_, tables) = scan("<table><tr><th>Only</th><th>Row</th></tr></table>", 0);
        assert_eq!(tables[0].header, None);
        assert_eq!(tables[0].rows, vec![cells(&["Only", "Row"])]);
    }

    #[test]
    fn empty_tables_vanish() {
        let (blocks, tables) = scan("<table></table><table><tr></tr></table>", 0);
        assert!(tables.is_empty());
        assert!(texts(&blocks).is_empty());
    }

    #[test]
    fn nested_table_is_flattened_into_its_cell() {
        let (blocks, tables) = scan(
            "<table><tr><td>outer <table><tr><td>in1</td><td>in2</td></tr></table></td>\
             <td>z</td></tr></table><p>after</p>",
            0,
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, None);
        assert_eq!(tables[0].rows, vec![cells(&["outer in1 in2", "z"])]);
        assert_eq!(texts(&blocks), vec!["[table 0]", "after"]);
    }

    #[test]
    fn ragged_rows_are_kept() {
        let (_, tables) = scan(
            "<table><tr><th>A</th><th>B</th><th>C</th></tr><tr><td>1</td></tr></table>",
            0,
        );
        assert_eq!(tables[0].rows, vec![cells(&["1"])]);
        assert_eq!(tables[0].column_count(), 3);
    }
}
