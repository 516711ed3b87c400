//! Append-only feedback log: one CSV row per submitted rating, for
//! later offline analysis. The file is created on first write with a
//! fixed header; existing rows are never touched again.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::session::Rating;

/// Fixed column order. Changing this breaks every downstream notebook.
pub const FEEDBACK_COLUMNS: &[&str] = &[
    "timestamp",
    "image_name",
    "prompt",
    "model_output",
    "rating",
    "user_notes",
    "plant_species",
    "region",
    "season",
];

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One feedback submission. The timestamp is not a field; it is stamped
/// at write time.
#[derive(Debug, Clone)]
pub struct FeedbackRecord {
    pub image_name: String,
    pub prompt: String,
    pub model_output: String,
    pub rating: Rating,
    pub user_notes: String,
    pub species: String,
    pub region: String,
    pub season: String,
}

/// Append-only CSV writer with a single fixed target file.
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file does not
    /// exist yet. Single-writer assumption, no locking.
    pub fn record(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let is_new = !self.path.exists();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if is_new {
            writeln!(file, "{}", FEEDBACK_COLUMNS.join(","))?;
        }

        let timestamp = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string();
        let fields = [
            timestamp.as_str(),
            record.image_name.as_str(),
            record.prompt.as_str(),
            record.model_output.as_str(),
            record.rating.as_str(),
            record.user_notes.as_str(),
            record.species.as_str(),
            record.region.as_str(),
            record.season.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|f| escape_csv_field(f)).collect();
        writeln!(file, "{}", row.join(","))?;

        info!(
            path = %self.path.display(),
            image = %record.image_name,
            rating = record.rating.as_str(),
            "Feedback recorded"
        );
        Ok(())
    }
}

/// RFC-4180 quoting: wrap the field when it contains a delimiter, quote,
/// or line break, doubling any inner quotes.
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(rating: Rating) -> FeedbackRecord {
        FeedbackRecord {
            image_name: "leaf.jpg".into(),
            prompt: "Act as a plant pathology expert.".into(),
            model_output: "Likely early blight.".into(),
            rating,
            user_notes: "Matched what the lab said.".into(),
            species: "Tomato".into(),
            region: "Kerala".into(),
            season: "Monsoon".into(),
        }
    }

    /// Minimal RFC-4180 reader: split file content into records and
    /// fields, honoring quoted sections.
    fn parse_csv(content: &str) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => in_quotes = true,
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut field));
                }
                '\n' if !in_quotes => {
                    fields.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut fields));
                }
                '\r' if !in_quotes => {}
                _ => field.push(c),
            }
        }
        if !field.is_empty() || !fields.is_empty() {
            fields.push(field);
            records.push(fields);
        }
        records
    }

    fn temp_log() -> (tempfile::TempDir, FeedbackLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback").join("feedback_data.csv"));
        (dir, log)
    }

    #[test]
    fn first_write_creates_header_plus_row() {
        let (_dir, log) = temp_log();
        log.record(&sample_record(Rating::Good)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let records = parse_csv(&content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], FEEDBACK_COLUMNS);
    }

    #[test]
    fn n_records_produce_n_plus_one_rows() {
        let (_dir, log) = temp_log();
        for _ in 0..5 {
            log.record(&sample_record(Rating::Okay)).unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let records = parse_csv(&content);
        assert_eq!(records.len(), 6);

        // Header appears exactly once, as the first record.
        let header_count = records
            .iter()
            .filter(|r| r.first().map(String::as_str) == Some("timestamp"))
            .count();
        assert_eq!(header_count, 1);
    }

    #[test]
    fn columns_land_in_fixed_order() {
        let (_dir, log) = temp_log();
        log.record(&sample_record(Rating::Good)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let records = parse_csv(&content);
        let row = &records[1];

        assert_eq!(row.len(), 9);
        assert_eq!(row[1], "leaf.jpg");
        assert_eq!(row[2], "Act as a plant pathology expert.");
        assert_eq!(row[3], "Likely early blight.");
        assert_eq!(row[4], "\u{2b50}\u{2b50}\u{2b50} Good");
        assert_eq!(row[5], "Matched what the lab said.");
        assert_eq!(row[6], "Tomato");
        assert_eq!(row[7], "Kerala");
        assert_eq!(row[8], "Monsoon");
    }

    #[test]
    fn timestamp_is_iso_8601() {
        let (_dir, log) = temp_log();
        log.record(&sample_record(Rating::Poor)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let records = parse_csv(&content);
        let timestamp = &records[1][0];

        assert!(
            chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S").is_ok(),
            "unparseable timestamp: {timestamp}"
        );
    }

    #[test]
    fn existing_rows_survive_appends() {
        let (_dir, log) = temp_log();
        log.record(&sample_record(Rating::Poor)).unwrap();
        let before = std::fs::read_to_string(log.path()).unwrap();

        log.record(&sample_record(Rating::Excellent)).unwrap();
        let after = std::fs::read_to_string(log.path()).unwrap();

        assert!(after.starts_with(&before));
    }

    #[test]
    fn awkward_text_survives_a_parse_round_trip() {
        let (_dir, log) = temp_log();
        let mut record = sample_record(Rating::Great);
        record.prompt = "Step 1: look, then \"compare\",\nthen decide.".into();
        record.user_notes = "spots, holes, and a stray \" mark".into();
        log.record(&record).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let records = parse_csv(&content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][2], "Step 1: look, then \"compare\",\nthen decide.");
        assert_eq!(records[1][5], "spots, holes, and a stray \" mark");
    }

    #[test]
    fn escape_plain_field_is_unchanged() {
        assert_eq!(escape_csv_field("plain text"), "plain text");
    }

    #[test]
    fn escape_quotes_delimiters_and_newlines() {
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }
}
