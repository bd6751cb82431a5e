use chrono::NaiveDate;

/// One unit of the document body, in reading order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Running text. An empty paragraph marks a blank line.
    Paragraph(String),
    /// Text the source explicitly marked as a heading.
    Heading(String),
    /// Index into [`ExtractedContent::images`].
    Image(usize),
    /// Index into [`ExtractedContent::tables`].
    Table(usize),
}

impl Block {
    pub fn is_blank(&self) -> bool {
        matches!(self, Block::Paragraph(text) if text.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Option<Vec<String>>,
    /// Data rows; may be shorter than the header or each other.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.column_count() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub data: Vec<u8>,
    /// Declared MIME type, e.g. `image/png`. May be wrong.
    pub content_type: String,
}

/// Result of content extraction: a flat block sequence plus the side tables it indexes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub blocks: Vec<Block>,
    pub images: Vec<Image>,
    pub tables: Vec<Table>,
}

/// Submission details printed on the cover and in the running header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReviewMetadata {
    pub manuscript_id: String,
    pub title: String,
    pub authors: String,
    pub article_type: String,
    pub keywords: String,
    pub category: String,
    pub abstract_text: String,
    pub reviewer_name: String,
    pub deadline: Option<NaiveDate>,
    pub received: Option<NaiveDate>,
}

/// Input to a single generation. When both sources are set the DOCX wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReviewCopyRequest {
    pub docx: Option<Vec<u8>>,
    pub text: Option<String>,
    pub metadata: ReviewMetadata,
}

pub(crate) enum ManuscriptSource<'a> {
    Docx(&'a [u8]),
    Text(&'a str),
    Empty,
}

impl ReviewCopyRequest {
    pub fn from_docx(docx: Vec<u8>, metadata: ReviewMetadata) -> Self {
        Self {
            docx: Some(docx),
            text: None,
            metadata,
        }
    }

    pub fn from_text(text: impl Into<String>, metadata: ReviewMetadata) -> Self {
        Self {
            docx: None,
            text: Some(text.into()),
            metadata,
        }
    }

    pub(crate) fn source(&self) -> ManuscriptSource<'_> {
        match (&self.docx, &self.text) {
            (Some(docx), _) => ManuscriptSource::Docx(docx),
            (None, Some(text)) if !text.trim().is_empty() => ManuscriptSource::Text(text),
            _ => ManuscriptSource::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docx_takes_precedence() {
        let req = ReviewCopyRequest {
            docx: Some(vec![1, 2, 3]),
            text: Some("hello".into()),
            metadata: ReviewMetadata::default(),
        };
        assert!(matches!(req.source(), ManuscriptSource::Docx(_)));
    }

    #[test]
    fn blank_text_is_empty_source() {
        let req = ReviewCopyRequest::from_text("  \n ", ReviewMetadata::default());
        assert!(matches!(req.source(), ManuscriptSource::Empty));
    }

    #[test]
    fn ragged_table_column_count() {
        let table = Table {
            header: Some(vec!["a".into(), "b".into()]),
            rows: vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        };
        assert_eq!(table.column_count(), 3);
        assert!(Table::default().is_empty());
    }
}
