//! Simulation dataset parser
//!
//! Uploaded datasets come in two shapes:
//!
//! ```text
//! mode,temperature,pressure,flow_rate
//! offshore,5.2,45.3,35.7
//! ```
//!
//! or a JSON array of objects with the same four keys. Extra CSV columns and
//! extra JSON keys are ignored; missing ones reject the whole file.

use serde::{Deserialize, Serialize};

use crate::types::OperatingMode;

/// Columns every dataset row must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["mode", "temperature", "pressure", "flow_rate"];

/// One row of an uploaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub mode: OperatingMode,
    pub temperature: f64,
    pub pressure: f64,
    pub flow_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Csv,
    Json,
}

impl DatasetFormat {
    /// Format from a file name's extension, case-insensitive.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset is not valid UTF-8")]
    Encoding,
    #[error("Dataset is empty")]
    Empty,
    #[error("CSV must contain columns: {}", REQUIRED_COLUMNS.join(", "))]
    MissingColumns,
    #[error("Row {row}: mode must be offshore or onshore, got '{value}'")]
    InvalidMode { row: usize, value: String },
    #[error("Row {row}: {column} is not a number ('{value}')")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("Row {row}: missing value for {column}")]
    MissingValue { row: usize, column: &'static str },
    #[error("Invalid JSON data: {0}")]
    Json(String),
}

/// Parse dataset bytes in the given format.
pub fn parse_dataset(format: DatasetFormat, bytes: &[u8]) -> Result<Vec<DatasetRecord>, DatasetError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DatasetError::Encoding)?;
    // Spreadsheet exports often start with a byte-order mark
    let text = text.trim_start_matches('\u{feff}');
    match format {
        DatasetFormat::Csv => parse_csv(text),
        DatasetFormat::Json => parse_json(text),
    }
}

// ============================================================================
// CSV
// ============================================================================

fn parse_csv(text: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(DatasetError::Empty)?;
    let columns: Vec<String> = split_fields(header)
        .into_iter()
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();

    let mut index = [0usize; 4];
    for (slot, name) in index.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = columns
            .iter()
            .position(|c| c == name)
            .ok_or(DatasetError::MissingColumns)?;
    }
    let [mode_idx, temp_idx, pres_idx, flow_idx] = index;

    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        // Row numbers count the header as row 1
        let row = i + 2;
        let fields = split_fields(line);
        let field = |idx: usize, column: &'static str| {
            fields
                .get(idx)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .ok_or(DatasetError::MissingValue { row, column })
        };

        let mode = parse_mode(row, field(mode_idx, "mode")?)?;
        records.push(DatasetRecord {
            mode,
            temperature: parse_number(row, "temperature", field(temp_idx, "temperature")?)?,
            pressure: parse_number(row, "pressure", field(pres_idx, "pressure")?)?,
            flow_rate: parse_number(row, "flow_rate", field(flow_idx, "flow_rate")?)?,
        });
    }
    Ok(records)
}

/// Split a CSV line, honouring double-quoted fields and `""` escapes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

fn parse_mode(row: usize, raw: &str) -> Result<OperatingMode, DatasetError> {
    raw.parse().map_err(|_| DatasetError::InvalidMode {
        row,
        value: raw.to_string(),
    })
}

fn parse_number(row: usize, column: &'static str, raw: &str) -> Result<f64, DatasetError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DatasetError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        })
}

// ============================================================================
// JSON
// ============================================================================

fn parse_json(text: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DatasetError::Json(e.to_string()))?;
    let serde_json::Value::Array(items) = value else {
        return Err(DatasetError::Json("JSON must be an array of sensor readings".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let row = i + 1;
            let serde_json::Value::Object(obj) = item else {
                return Err(DatasetError::Json(format!("Record {row} must be an object")));
            };
            let get = |column: &'static str| {
                obj.get(column)
                    .filter(|v| !v.is_null())
                    .ok_or(DatasetError::MissingValue { row, column })
            };

            let mode_raw = get("mode")?;
            let mode = match mode_raw.as_str() {
                Some(s) => parse_mode(row, s)?,
                None => {
                    return Err(DatasetError::InvalidMode {
                        row,
                        value: mode_raw.to_string(),
                    })
                }
            };
            let number = |column: &'static str| -> Result<f64, DatasetError> {
                let v = get(column)?;
                match v {
                    serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| DatasetError::InvalidNumber {
                        row,
                        column,
                        value: n.to_string(),
                    }),
                    // Numeric strings are accepted, as a spreadsheet export would write them
                    serde_json::Value::String(s) => parse_number(row, column, s.trim()),
                    other => Err(DatasetError::InvalidNumber {
                        row,
                        column,
                        value: other.to_string(),
                    }),
                }
            };

            Ok(DatasetRecord {
                mode,
                temperature: number("temperature")?,
                pressure: number("pressure")?,
                flow_rate: number("flow_rate")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(DatasetFormat::from_file_name("run.CSV"), Some(DatasetFormat::Csv));
        assert_eq!(DatasetFormat::from_file_name("a.b.json"), Some(DatasetFormat::Json));
        assert_eq!(DatasetFormat::from_file_name("notes.txt"), None);
        assert_eq!(DatasetFormat::from_file_name("csv"), None);
    }

    #[test]
    fn csv_with_extra_columns_and_reordered_header() {
        let csv = "id,flow_rate,mode,pressure,temperature\n1,35.7,offshore,45.3,5.2\n2,120,\"onshore\",60,22.5\n";
        let records = parse_dataset(DatasetFormat::Csv, csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mode, OperatingMode::Offshore);
        assert_eq!(records[0].temperature, 5.2);
        assert_eq!(records[1].mode, OperatingMode::Onshore);
        assert_eq!(records[1].flow_rate, 120.0);
    }

    #[test]
    fn csv_missing_column_is_rejected() {
        let csv = "mode,temperature,pressure\noffshore,5,45\n";
        assert_eq!(
            parse_dataset(DatasetFormat::Csv, csv.as_bytes()),
            Err(DatasetError::MissingColumns)
        );
    }

    #[test]
    fn csv_bad_mode_and_number_report_row() {
        let csv = "mode,temperature,pressure,flow_rate\narctic,5,45,30\n";
        assert!(matches!(
            parse_dataset(DatasetFormat::Csv, csv.as_bytes()),
            Err(DatasetError::InvalidMode { row: 2, .. })
        ));

        let csv = "mode,temperature,pressure,flow_rate\noffshore,5,45,30\nonshore,warm,45,30\n";
        assert!(matches!(
            parse_dataset(DatasetFormat::Csv, csv.as_bytes()),
            Err(DatasetError::InvalidNumber { row: 3, column: "temperature", .. })
        ));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert_eq!(parse_dataset(DatasetFormat::Csv, b"\n\n"), Err(DatasetError::Empty));
    }

    #[test]
    fn json_array_is_parsed() {
        let json = r#"[
            {"mode": "offshore", "temperature": 5.2, "pressure": 45.3, "flow_rate": 35.7, "note": "x"},
            {"mode": "onshore", "temperature": "22", "pressure": 60, "flow_rate": 120}
        ]"#;
        let records = parse_dataset(DatasetFormat::Json, json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].temperature, 22.0);
    }

    #[test]
    fn json_shape_errors() {
        assert!(matches!(
            parse_dataset(DatasetFormat::Json, br#"{"mode": "offshore"}"#),
            Err(DatasetError::Json(_))
        ));
        assert!(matches!(
            parse_dataset(DatasetFormat::Json, br#"[{"mode": "offshore", "temperature": 1, "pressure": 2}]"#),
            Err(DatasetError::MissingValue { row: 1, column: "flow_rate" })
        ));
        assert!(matches!(
            parse_dataset(DatasetFormat::Json, b"not json"),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn non_utf8_is_rejected() {
        assert_eq!(parse_dataset(DatasetFormat::Csv, &[0xff, 0xfe, 0x00]), Err(DatasetError::Encoding));
    }
}
