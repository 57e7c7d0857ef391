//! Reading and writing utterance filelists.
//!
//! Input filelists are delimiter-separated text: `psv` (`|`), `tsv` (tab)
//! or `csv` (`,` with double-quote quoting). Blank lines are skipped and
//! ragged rows are kept as they are; column checks belong to the wizard.
//!
//! Output filelists are always pipe-separated with the header
//! `basename|language|speaker|text`.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Language code used when a dataset does not say what language it is in.
pub const UNDETERMINED_LANGUAGE: &str = "und";

const OUTPUT_HEADER: [&str; 4] = ["basename", "language", "speaker", "text"];

#[derive(Debug, thiserror::Error)]
pub enum FilelistError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("'{path}' is not valid {format}: {message}")]
    Parse {
        path: String,
        format: FilelistFormat,
        message: String,
    },
    #[error("could not write filelist '{path}': {message}")]
    Write { path: String, message: String },
}

/// Delimiter flavour of an input filelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilelistFormat {
    Psv,
    Tsv,
    Csv,
}

impl FilelistFormat {
    pub const ALL: [FilelistFormat; 3] = [FilelistFormat::Psv, FilelistFormat::Tsv, FilelistFormat::Csv];

    pub fn label(self) -> &'static str {
        match self {
            FilelistFormat::Psv => "psv",
            FilelistFormat::Tsv => "tsv",
            FilelistFormat::Csv => "csv",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    fn delimiter(self) -> u8 {
        match self {
            FilelistFormat::Psv => b'|',
            FilelistFormat::Tsv => b'\t',
            FilelistFormat::Csv => b',',
        }
    }
}

impl std::fmt::Display for FilelistFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Split `content` into rows of cells.
pub fn parse_rows(content: &str, format: FilelistFormat) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .flexible(true)
        .quoting(format == FilelistFormat::Csv)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {}: {}", idx + 1, e))?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read a filelist from disk.
pub fn read_rows(path: &Path, format: FilelistFormat) -> Result<Vec<Vec<String>>, FilelistError> {
    let content = fs::read_to_string(path).map_err(|source| FilelistError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_rows(&content, format).map_err(|message| FilelistError::Parse {
        path: path.display().to_string(),
        format,
        message,
    })
}

/// One normalized entry of an output filelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub basename: String,
    pub language: String,
    pub speaker: String,
    pub text: String,
}

/// Write `utterances` as a pipe-separated filelist with a header line.
pub fn write_filelist(path: &Path, utterances: &[Utterance]) -> Result<(), FilelistError> {
    let to_error = |message: String| FilelistError::Write {
        path: path.display().to_string(),
        message,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'|')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)
        .map_err(|e| to_error(e.to_string()))?;
    writer
        .write_record(OUTPUT_HEADER)
        .map_err(|e| to_error(e.to_string()))?;
    for u in utterances {
        let row = [&u.basename, &u.language, &u.speaker, &u.text].map(|cell| escape_cell(cell));
        writer.write_record(&row).map_err(|e| to_error(e.to_string()))?;
    }
    writer.flush().map_err(|e| to_error(e.to_string()))
}

/// Backslash-escape the delimiter so unquoted output stays one cell per field.
fn escape_cell(cell: &str) -> String {
    cell.replace('\\', "\\\\").replace('|', "\\|")
}

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace().replace_all(text.trim(), " ").into_owned()
}

/// Optional clean-ups applied to utterance text, offered by the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProcess {
    Lowercase,
    Nfc,
}

impl TextProcess {
    pub const ALL: [TextProcess; 2] = [TextProcess::Lowercase, TextProcess::Nfc];

    pub fn label(self) -> &'static str {
        match self {
            TextProcess::Lowercase => "lowercase",
            TextProcess::Nfc => "NFC normalization",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            TextProcess::Lowercase => text.to_lowercase(),
            TextProcess::Nfc => text.nfc().collect(),
        }
    }
}

/// Strip a trailing `.wav` (any case) from a file name.
pub fn strip_wav_suffix(basename: &str) -> &str {
    let trimmed = basename.trim();
    match trimmed.len().checked_sub(4) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".wav") => {
            &trimmed[..cut]
        }
        _ => trimmed,
    }
}
