use std::sync::LazyLock;

use regex::Regex;

use crate::model::Block;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static HEADING: LazyLock<Regex> = LazyLock::new(|| re(r"^#{1,6}\s+(.*)$"));
static RULE: LazyLock<Regex> = LazyLock::new(|| re(r"^[-*_]{3,}\s*$"));
static IMAGE: LazyLock<Regex> = LazyLock::new(|| re(r"!\[([^\]]*)\]\([^)]*\)"));
static LINK: LazyLock<Regex> = LazyLock::new(|| re(r"\[([^\]]+)\]\([^)]+\)"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]+>"));
static STAR_STRONG_EM: LazyLock<Regex> = LazyLock::new(|| re(r"\*\*\*(.+?)\*\*\*"));
static STAR_STRONG: LazyLock<Regex> = LazyLock::new(|| re(r"\*\*(.+?)\*\*"));
static STAR_EM: LazyLock<Regex> = LazyLock::new(|| re(r"\*(.+?)\*"));
// underscore emphasis only counts when not glued to word characters
static UNDERSCORE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        re(r"(^|[^\w])___(.+?)___([^\w]|$)"),
        re(r"(^|[^\w])__(.+?)__([^\w]|$)"),
        re(r"(^|[^\w])_(.+?)_([^\w]|$)"),
    ]
});
static CODE: LazyLock<Regex> = LazyLock::new(|| re(r"`([^`]+)`"));

/// Drop a YAML frontmatter block, but only when the text starts with one.
fn strip_frontmatter(text: &str) -> &str {
    let trimmed = text.trim_start_matches('\u{feff}');
    let Some(first_line_end) = trimmed.find('\n') else {
        return text;
    };
    if trimmed[..first_line_end].trim_end() != "---" {
        return text;
    }
    let body = &trimmed[first_line_end + 1..];
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return &body[offset..];
        }
    }
    text
}

fn replace_until_stable(re: &Regex, text: String, rep: &str) -> String {
    let mut text = text;
    loop {
        let next = re.replace_all(&text, rep).into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Strip inline markdown from one line, keeping the visible text.
pub(super) fn strip_inline(line: &str) -> String {
    let mut text = IMAGE.replace_all(line, "$1").into_owned();
    text = LINK.replace_all(&text, "$1").into_owned();
    text = HTML_TAG.replace_all(&text, "").into_owned();
    text = STAR_STRONG_EM.replace_all(&text, "$1").into_owned();
    text = STAR_STRONG.replace_all(&text, "$1").into_owned();
    text = STAR_EM.replace_all(&text, "$1").into_owned();
    for re in UNDERSCORE.iter() {
        text = replace_until_stable(re, text, "${1}${2}${3}");
    }
    CODE.replace_all(&text, "$1").into_owned()
}

/// Plain or markdown text to line-level blocks.
pub(super) fn scan(text: &str) -> Vec<Block> {
    let text = strip_frontmatter(text);
    text.lines()
        .map(|line| {
            let line = line.trim();
            if RULE.is_match(line) {
                return Block::Paragraph(String::new());
            }
            if let Some(caps) = HEADING.captures(line) {
                let heading = strip_inline(caps.get(1).map_or("", |m| m.as_str()));
                return Block::Heading(heading);
            }
            Block::Paragraph(strip_inline(line))
        })
        .collect()
}
