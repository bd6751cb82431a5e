use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;

use review_copy::{
    Config, FontSource, ReviewCopyGenerator, ReviewCopyRequest, ReviewMetadata, TrueTypeFiles,
};

#[derive(Parser)]
#[command(name = "review-copy")]
#[command(version)]
#[command(about = "Typeset a manuscript into a confidential peer-review copy PDF", long_about = None)]
struct Cli {
    /// Manuscript file: .docx, or plain/markdown text
    #[arg(short, long, value_name = "FILE")]
    manuscript: PathBuf,

    /// Manuscript id, e.g. AIR-2026-0042
    #[arg(long)]
    id: String,

    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    authors: String,

    #[arg(long, default_value = "Original Research")]
    article_type: String,

    #[arg(long, default_value = "")]
    keywords: String,

    #[arg(long, default_value = "")]
    category: String,

    #[arg(long = "abstract", default_value = "")]
    abstract_text: String,

    #[arg(long, default_value = "")]
    reviewer: String,

    /// Review deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    deadline: Option<NaiveDate>,

    /// Date received (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    received: Option<NaiveDate>,

    /// Output PDF, defaults to <id>-review-copy.pdf next to the manuscript
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory holding serif.ttf, serif-bold.ttf, sans.ttf and sans-bold.ttf
    #[arg(long, value_name = "DIR")]
    font_dir: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

fn default_output(manuscript: &Path, id: &str) -> PathBuf {
    let name = format!("{}-review-copy.pdf", id.trim());
    match manuscript.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn run(cli: Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let metadata = ReviewMetadata {
        manuscript_id: cli.id.clone(),
        title: cli.title,
        authors: cli.authors,
        article_type: cli.article_type,
        keywords: cli.keywords,
        category: cli.category,
        abstract_text: cli.abstract_text,
        reviewer_name: cli.reviewer,
        deadline: cli.deadline,
        received: Some(
            cli.received
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
        ),
    };

    let request = if is_docx(&cli.manuscript) {
        ReviewCopyRequest::from_docx(fs::read(&cli.manuscript)?, metadata)
    } else {
        let bytes = fs::read(&cli.manuscript)?;
        ReviewCopyRequest::from_text(String::from_utf8_lossy(&bytes), metadata)
    };

    let mut config = Config::from_env();
    if let Some(dir) = &cli.font_dir {
        config = config.with_fonts(FontSource::TrueType(TrueTypeFiles::in_dir(dir)));
    }

    let generator = ReviewCopyGenerator::new(config)?;
    let bytes = generator.generate(&request)?;

    let output = cli
        .output
        .unwrap_or_else(|| default_output(&cli.manuscript, &cli.id));
    fs::write(&output, bytes)?;
    Ok(output)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            println!("Review copy written to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
