use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// An operation failed after its retry budget was spent.
    OperationFailed,
    /// An error explicitly routed through the error handler.
    #[serde(rename = "application_error")]
    Application,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::OperationFailed => "operation_failed",
            ErrorCategory::Application => "application_error",
        }
    }
}

/// A failure record handed to the external logging collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: ErrorCategory,
    pub code: Option<String>,
    pub message: String,
    pub trace: Option<String>,
    pub context: Map<String, Value>,
    pub severity: Severity,
}

impl ErrorLogEntry {
    pub fn new(category: ErrorCategory, severity: Severity, message: impl Into<String>) -> Self {
        ErrorLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            code: None,
            message: message.into(),
            trace: None,
            context: Map::new(),
            severity,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Default,
    Destructive,
    Success,
}

/// User-facing toast payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

/// A raw value coming from a spreadsheet cell or a form field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    DateTime(NaiveDateTime),
    Number(f64),
    Text(String),
    Bool(bool),
    /// Lists, objects and anything else that cannot carry a date.
    Other,
}

impl CellValue {
    /// Types a raw delimited-file field the way a spreadsheet reader would:
    /// blank stays empty, numeric text becomes a number, anything else is text.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::DateTime(value.naive_utc())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Other, CellValue::Number),
            Value::String(s) => CellValue::Text(s),
            Value::Array(_) | Value::Object(_) => CellValue::Other,
        }
    }
}

/// Outcome of normalizing a date field. `date` is set iff `is_valid`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateConversionResult {
    pub date: Option<String>,
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

impl DateConversionResult {
    pub fn invalid(warning: impl Into<String>) -> Self {
        DateConversionResult {
            date: None,
            is_valid: false,
            warnings: vec![warning.into()],
        }
    }

    pub fn valid(date: String, warnings: Vec<String>) -> Self {
        DateConversionResult {
            date: Some(date),
            is_valid: true,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemCodeValidation {
    pub code: String,
    pub is_valid: bool,
    pub suggestions: Option<Vec<String>>,
}

/// One goods-receipt line after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrnRecord {
    /// 1-based line number in the source file, header included.
    pub line: usize,
    pub grn_number: String,
    /// `YYYY-MM-DD`
    pub grn_date: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: f64,
    pub rate: f64,
    pub warnings: Vec<String>,
}
