use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid DOCX: {0}")]
    InvalidDocx(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error("PDF generation error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, Error>;
