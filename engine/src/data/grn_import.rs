// Goods-receipt import from spreadsheet exports (CSV / delimited text).
//
// Structural problems (unreadable file, missing columns) abort the import.
// Problems inside a row are collected and the batch carries on, so the user
// gets every bad line in one pass.
use crate::data::date_converter::convert_and_validate_grn_date;
use crate::error::EngineError;
use crate::services::error_handler::RetryPolicy;
use crate::services::ErrorHandler;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use shared::models::{CellValue, GrnRecord};
use shared::utils::text_format::{clean_text_value, normalize_grn_number, to_number, validate_item_code};
use std::io::Read;
use std::path::Path;

pub const GRN_NUMBER_HEADER: &str = "GRN Number";
pub const GRN_DATE_HEADER: &str = "GRN Date";
pub const ITEM_CODE_HEADER: &str = "Item Code";
pub const ITEM_NAME_HEADER: &str = "Item Name";
pub const QUANTITY_HEADER: &str = "Quantity";
pub const RATE_HEADER: &str = "Rate";

const REQUIRED_HEADERS: [&str; 4] = [GRN_NUMBER_HEADER, GRN_DATE_HEADER, ITEM_CODE_HEADER, QUANTITY_HEADER];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrnImportReport {
    pub records: Vec<GrnRecord>,
    pub errors: Vec<RowError>,
}

impl GrnImportReport {
    /// Data rows seen, accepted or not. A row with several errors counts once.
    pub fn total_rows(&self) -> usize {
        let mut failed_lines: Vec<usize> = self.errors.iter().map(|e| e.line).collect();
        failed_lines.dedup();
        self.records.len() + failed_lines.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.records.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Column positions resolved once from the header row.
#[derive(Debug)]
struct Columns {
    grn_number: usize,
    grn_date: usize,
    item_code: usize,
    quantity: usize,
    item_name: Option<usize>,
    rate: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, EngineError> {
        let positions: Vec<Option<usize>> = REQUIRED_HEADERS
            .iter()
            .map(|name| Self::position(headers, name))
            .collect();
        match positions.as_slice() {
            [Some(grn_number), Some(grn_date), Some(item_code), Some(quantity)] => Ok(Columns {
                grn_number: *grn_number,
                grn_date: *grn_date,
                item_code: *item_code,
                quantity: *quantity,
                item_name: Self::position(headers, ITEM_NAME_HEADER),
                rate: Self::position(headers, RATE_HEADER),
            }),
            _ => {
                let missing: Vec<&str> = REQUIRED_HEADERS
                    .iter()
                    .zip(&positions)
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(EngineError::ImportFormatError(format!(
                    "Missing required column(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }

    // Header names are matched case-insensitively, ignoring surrounding spaces.
    fn position(headers: &StringRecord, name: &str) -> Option<usize> {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GrnImportProcessor {
    delimiter: u8,
}

impl GrnImportProcessor {
    pub fn new(delimiter: u8) -> Self {
        GrnImportProcessor { delimiter }
    }

    /// Reads the whole file asynchronously, then normalizes it.
    pub async fn load_from_path(&self, path: impl AsRef<Path>) -> Result<GrnImportReport, EngineError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read GRN import file");
        self.process_reader(bytes.as_slice())
    }

    /// `load_from_path` with transient read failures retried per `policy`.
    /// Exhaustion is logged once through `handler` and the last error returned.
    pub async fn load_with_retry(
        &self,
        path: &Path,
        handler: &ErrorHandler,
        policy: &RetryPolicy,
    ) -> Result<GrnImportReport, EngineError> {
        handler.with_retry(|| self.load_from_path(path), policy).await
    }

    pub fn process_reader<R: Read>(&self, reader: R) -> Result<GrnImportReport, EngineError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = Columns::resolve(&headers)?;

        let mut report = GrnImportReport::default();
        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            match Self::process_row(&record, &columns, line) {
                Ok(grn) => report.records.push(grn),
                Err(mut errors) => {
                    for e in &errors {
                        tracing::debug!(line = e.line, field = e.field, message = %e.message, "Rejected GRN row");
                    }
                    report.errors.append(&mut errors);
                }
            }
        }

        tracing::info!(
            accepted = report.records.len(),
            rejected_rows = report.total_rows() - report.records.len(),
            warnings = report.warning_count(),
            "Processed GRN import"
        );
        Ok(report)
    }

    fn process_row(record: &StringRecord, columns: &Columns, line: usize) -> Result<GrnRecord, Vec<RowError>> {
        let field = |pos: usize| record.get(pos).unwrap_or("");
        let optional = |pos: Option<usize>| pos.and_then(|p| record.get(p)).unwrap_or("");
        let mut errors = Vec::new();

        let grn_number = normalize_grn_number(field(columns.grn_number));
        if grn_number.is_empty() {
            errors.push(RowError {
                line,
                field: GRN_NUMBER_HEADER,
                message: "GRN number is required".to_string(),
            });
        }

        let date = convert_and_validate_grn_date(&CellValue::from_field(field(columns.grn_date)));
        if !date.is_valid {
            errors.push(RowError {
                line,
                field: GRN_DATE_HEADER,
                message: format!("{}: '{}'", date.warnings.join("; "), field(columns.grn_date).trim()),
            });
        }

        let item = validate_item_code(field(columns.item_code));
        if !item.is_valid {
            let hint = item.suggestions.as_deref().unwrap_or_default().join("; ");
            errors.push(RowError {
                line,
                field: ITEM_CODE_HEADER,
                message: format!("Invalid item code '{}'. {}", item.code, hint),
            });
        }

        let quantity = to_number(field(columns.quantity));
        if quantity <= 0.0 {
            errors.push(RowError {
                line,
                field: QUANTITY_HEADER,
                message: format!("Quantity must be greater than zero, got '{}'", field(columns.quantity).trim()),
            });
        }

        match date.date {
            Some(grn_date) if errors.is_empty() => Ok(GrnRecord {
                line,
                grn_number,
                grn_date,
                item_code: item.code,
                item_name: clean_text_value(optional(columns.item_name)),
                quantity,
                rate: to_number(optional(columns.rate)),
                warnings: date.warnings,
            }),
            _ => Err(errors),
        }
    }
}

impl Default for GrnImportProcessor {
    fn default() -> Self {
        Self::new(b',')
    }
}
