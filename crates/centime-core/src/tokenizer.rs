//! Statement tokenization: raw file text to rows of trimmed fields
//!
//! Banks disagree on delimiters and line endings, so the tokenizer
//! normalizes newlines, drops blank lines, and can sniff the delimiter
//! from a sample of rows before handing the text to the CSV reader.

use csv::ReaderBuilder;

use crate::error::Result;

/// Delimiters considered during auto-detection, in tie-break order
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Number of rows sampled for delimiter detection and format matching
pub const SAMPLE_ROWS: usize = 4;

/// Normalize CRLF/CR line endings to LF and drop fully blank lines
pub fn normalize_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r'])
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Auto-detect the field delimiter from the first few rows
///
/// A candidate qualifies when it occurs at least once in every sampled
/// row with the same count in each. The qualifying candidate with the
/// highest count wins; when nothing qualifies the fallback is a comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let lines = normalize_lines(text);
    let sample: Vec<&&str> = lines.iter().take(SAMPLE_ROWS).collect();
    if sample.is_empty() {
        return b',';
    }

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == candidate).count())
            .collect();

        let first = counts[0];
        if first > 0 && counts.iter().all(|&c| c == first) {
            match best {
                Some((_, count)) if count >= first => {}
                _ => best = Some((candidate, first)),
            }
        }
    }

    best.map(|(delim, _)| delim).unwrap_or(b',')
}

/// Tokenize statement text into rows of trimmed fields
///
/// Quoted fields may contain the delimiter; a doubled quote inside a
/// quoted field is an escaped literal quote (standard CSV quoting, which
/// the csv crate implements).
pub fn tokenize(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let cleaned = normalize_lines(text).join("\n");

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }

    Ok(rows)
}
