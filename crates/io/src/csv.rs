// CSV/TSV import

use std::path::Path;

use ledgerscan_analysis::{Dataset, Value};

use crate::build_dataset;

pub fn import(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("sniffed delimiter {:?} for {}", delimiter as char, path.display());
    import_from_string(&content, delimiter)
}

pub fn import_tsv(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, b'\t')
}

/// Delimiters tried by [`sniff_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Lines inspected when sniffing.
const SNIFF_LINES: usize = 10;

/// Pick the delimiter that splits the leading lines most consistently.
///
/// A candidate must give the header line more than one field. Its score is
/// the header's field count times the number of sampled lines that match it;
/// ties go to the earlier candidate. Falls back to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();

    let mut best: Option<(u8, usize)> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let widths: Vec<usize> = sample.iter().map(|line| field_count(line, delimiter)).collect();
        let Some(&header_width) = widths.first() else {
            break;
        };
        if header_width < 2 {
            continue;
        }
        let agreeing = widths.iter().filter(|&&w| w == header_width).count();
        let score = agreeing * header_width;
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((delimiter, score));
        }
    }

    best.map_or(b',', |(delimiter, _)| delimiter)
}

/// Fields in one line, honouring quotes.
fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// File contents as UTF-8. A leading byte-order mark is dropped; bytes that
/// are not UTF-8 are decoded as Windows-1252, the usual Excel CSV encoding.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        }),
        Err(e) => {
            log::warn!("{} is not valid UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}

/// First record is the header row. Every other cell is text; empty fields are absent.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut records: Vec<Vec<Value>> = Vec::new();

    for (line_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at record {}: {}", line_idx + 1, e))?;
        if headers.is_none() {
            headers = Some(record.iter().map(str::to_string).collect());
            continue;
        }
        records.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Absent
                    } else {
                        Value::from(field)
                    }
                })
                .collect(),
        );
    }

    Ok(build_dataset(headers.unwrap_or_default(), records))
}
