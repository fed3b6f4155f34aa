// 📥 CSV Import Pipeline - historical expenses → SQLite
// Row-independent: bad rows are skipped or degraded, store failures abort the run

use crate::db::{insert_expense, NewExpense, DATE_FORMAT};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Minimum number of columns a data row must carry
pub const MIN_COLUMNS: usize = 7;

/// A progress notice is logged after this many committed rows
pub const PROGRESS_INTERVAL: usize = 50;

// Column layout: [ignored, vehicle_id, expense_type, date, amount_cents, mileage, details]
const COL_VEHICLE: usize = 1;
const COL_EXPENSE_TYPE: usize = 2;
const COL_DATE: usize = 3;
const COL_AMOUNT: usize = 4;
const COL_MILEAGE: usize = 5;
const COL_DETAILS: usize = 6;

// ============================================================================
// ERRORS
// ============================================================================

/// Why a single row was skipped. Never escapes the row loop.
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("insufficient columns: found {found}, need at least 7")]
    InsufficientColumns { found: usize },

    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("unknown vehicle identifier: {0}")]
    UnknownVehicle(String),

    #[error("invalid date format {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Conditions that abort the whole import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open CSV file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read CSV at row {row}: {source}")]
    Read {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file is empty")]
    Empty,

    #[error("failed to insert expense from row {row}: {source}")]
    Insert {
        row: usize,
        #[source]
        source: rusqlite::Error,
    },
}

/// Non-fatal problems with a row that still gets committed
#[derive(Debug, Clone, PartialEq)]
pub enum RowWarning {
    InvalidMileage { value: String, reason: String },
    InvalidDetails { reason: String },
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowWarning::InvalidMileage { value, reason } => {
                write!(f, "invalid mileage {:?}: {}", value, reason)
            }
            RowWarning::InvalidDetails { reason } => write!(f, "invalid JSON details: {}", reason),
        }
    }
}

// ============================================================================
// VEHICLE IDENTIFIER MAP
// ============================================================================

/// External vehicle identifier → internal vehicle key.
/// Built once at import start and never persisted.
#[derive(Debug, Clone, Default)]
pub struct VehicleIdentifierMap {
    entries: HashMap<String, i64>,
}

impl VehicleIdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add one mapping
    pub fn with(mut self, external_id: impl Into<String>, vehicle_id: i64) -> Self {
        self.insert(external_id, vehicle_id);
        self
    }

    pub fn insert(&mut self, external_id: impl Into<String>, vehicle_id: i64) {
        self.entries
            .insert(normalize_identifier(&external_id.into()), vehicle_id);
    }

    /// Look up an identifier. UUIDs match regardless of case or textual form.
    pub fn resolve(&self, external_id: &str) -> Option<i64> {
        self.entries.get(&normalize_identifier(external_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a `<uuid>=<vehicle id>` pair as given on the command line.
    /// The identifier is normalised to the lowercase hyphenated UUID form.
    pub fn parse_entry(entry: &str) -> Result<(String, i64), String> {
        let (external, internal) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected <uuid>=<vehicle id>, got {:?}", entry))?;

        let uuid = uuid::Uuid::parse_str(external.trim())
            .map_err(|e| format!("invalid vehicle identifier {:?}: {}", external, e))?;
        let vehicle_id = internal
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid vehicle id {:?}: {}", internal, e))?;

        Ok((uuid.hyphenated().to_string(), vehicle_id))
    }
}

impl FromIterator<(String, i64)> for VehicleIdentifierMap {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (external_id, vehicle_id) in iter {
            map.insert(external_id, vehicle_id);
        }
        map
    }
}

/// UUIDs are keyed by their lowercase hyphenated form; anything else as given
fn normalize_identifier(raw: &str) -> String {
    match uuid::Uuid::parse_str(raw) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => raw.to_string(),
    }
}

// ============================================================================
// ROW PARSING
// ============================================================================

/// A validated row, ready to become a `NewExpense`
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub vehicle_id: i64,
    pub expense_type: String,
    pub date: NaiveDate,
    pub mileage: Option<i64>,
    pub amount: f64,
    pub details: Option<String>,
    pub warnings: Vec<RowWarning>,
}

impl ParsedRow {
    pub fn into_expense(self, user_id: i64) -> NewExpense {
        NewExpense {
            user_id,
            vehicle_id: self.vehicle_id,
            date: self.date,
            mileage: self.mileage,
            amount: self.amount,
            expense_type: self.expense_type,
            details: self.details,
            created_at: Utc::now(),
        }
    }
}

/// Validate and coerce one data row.
///
/// Checks run in a fixed order; the first failing check decides the
/// `RowError`. Mileage and details problems are reported as warnings.
pub fn parse_row<S: AsRef<str>>(
    fields: &[S],
    vehicles: &VehicleIdentifierMap,
) -> Result<ParsedRow, RowError> {
    if fields.len() < MIN_COLUMNS {
        return Err(RowError::InsufficientColumns { found: fields.len() });
    }
    let field: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();

    let amount_cents: i64 = field[COL_AMOUNT]
        .parse()
        .map_err(|e: std::num::ParseIntError| RowError::InvalidAmount {
            value: field[COL_AMOUNT].to_string(),
            reason: e.to_string(),
        })?;

    let mut warnings = Vec::new();
    let mileage = match parse_mileage(field[COL_MILEAGE]) {
        Ok(mileage) => mileage,
        Err(warning) => {
            warnings.push(warning);
            None
        }
    };

    let vehicle_id = vehicles
        .resolve(field[COL_VEHICLE])
        .ok_or_else(|| RowError::UnknownVehicle(field[COL_VEHICLE].to_string()))?;

    let date = parse_date(field[COL_DATE])?;

    let amount = cents_to_amount(amount_cents);

    let details = match parse_details(field[COL_DETAILS]) {
        Ok(details) => details,
        Err(warning) => {
            warnings.push(warning);
            None
        }
    };

    Ok(ParsedRow {
        vehicle_id,
        expense_type: field[COL_EXPENSE_TYPE].to_string(),
        date,
        mileage,
        amount,
        details,
        warnings,
    })
}

/// Empty and "0" mean "no reading"
fn parse_mileage(raw: &str) -> Result<Option<i64>, RowWarning> {
    if raw.is_empty() || raw == "0" {
        return Ok(None);
    }

    raw.parse::<i64>()
        .map(Some)
        .map_err(|e| RowWarning::InvalidMileage {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Strict YYYY-MM-DD: exactly ten characters, zero padded, a real calendar day
fn parse_date(raw: &str) -> Result<NaiveDate, RowError> {
    let invalid = || RowError::InvalidDate {
        value: raw.to_string(),
    };

    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())
}

fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Empty and "{}" mean "no details". Valid JSON is kept as the original text.
fn parse_details(raw: &str) -> Result<Option<String>, RowWarning> {
    if raw.is_empty() || raw == "{}" {
        return Ok(None);
    }

    serde_json::from_str::<serde_json::Value>(raw)
        .map(|_| Some(raw.to_string()))
        .map_err(|e| RowWarning::InvalidDetails {
            reason: e.to_string(),
        })
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows committed to the store (degraded rows included)
    pub imported: usize,
    /// Rows skipped for invalid input
    pub skipped: usize,
    /// Committed rows that carried at least one warning
    pub degraded: usize,
}

/// Imports expense rows for one user
pub struct CsvImporter<'a> {
    conn: &'a Connection,
    vehicles: &'a VehicleIdentifierMap,
    user_id: i64,
}

impl<'a> CsvImporter<'a> {
    pub fn new(conn: &'a Connection, vehicles: &'a VehicleIdentifierMap, user_id: i64) -> Self {
        CsvImporter {
            conn,
            vehicles,
            user_id,
        }
    }

    /// Import every data row of the file at `csv_path`
    pub fn import_file(&self, csv_path: &Path) -> Result<ImportSummary, ImportError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(csv_path)
            .map_err(|source| ImportError::Open {
                path: csv_path.display().to_string(),
                source,
            })?;

        self.import_reader(reader)
    }

    /// Import from any CSV reader. The first record is the header.
    pub fn import_reader<R: std::io::Read>(
        &self,
        mut reader: csv::Reader<R>,
    ) -> Result<ImportSummary, ImportError> {
        let mut records = reader.records();

        match records.next() {
            None => return Err(ImportError::Empty),
            Some(Err(source)) => return Err(ImportError::Read { row: 1, source }),
            Some(Ok(_header)) => {}
        }

        if self.vehicles.is_empty() {
            warn!("No vehicle mappings given; every row will be skipped");
        }

        // Read the whole file before writing so a read error leaves the store untouched.
        // Row numbers are 1-based file rows; the header is row 1
        let rows = records
            .enumerate()
            .map(|(index, result)| {
                let row = index + 2;
                result
                    .map(|record| (row, record))
                    .map_err(|source| ImportError::Read { row, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(rows = rows.len(), "Read CSV data rows");

        let mut summary = ImportSummary::default();

        for (row, record) in rows {
            let fields: Vec<&str> = record.iter().collect();

            let parsed = match parse_row(&fields, self.vehicles) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(row, error = %e, "Skipping row");
                    summary.skipped += 1;
                    continue;
                }
            };

            for warning in &parsed.warnings {
                warn!(row, warning = %warning, "Row imported with missing field");
            }
            if !parsed.warnings.is_empty() {
                summary.degraded += 1;
            }

            insert_expense(self.conn, &parsed.into_expense(self.user_id))
                .map_err(|source| ImportError::Insert { row, source })?;

            summary.imported += 1;
            if summary.imported % PROGRESS_INTERVAL == 0 {
                info!(imported = summary.imported, "Imported {} expenses...", summary.imported);
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            degraded = summary.degraded,
            "Successfully imported {} expenses",
            summary.imported
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        count_expenses, create_user, create_vehicle, get_expenses_for_user, setup_database,
        NewVehicle,
    };
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    const KIA: &str = "8432be0a-80d4-4e53-85c3-9c91a2934cca";
    const ROVER: &str = "a28da350-c686-42e5-b191-f0b6ce315852";
    const HEADER: &str = "id,vehicle,type,date,amount,mileage,details\n";

    fn test_vehicles() -> VehicleIdentifierMap {
        VehicleIdentifierMap::new().with(KIA, 1).with(ROVER, 2)
    }

    /// User 1 owning vehicles 1 (KIA) and 2 (ROVER)
    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let user_id = create_user(&conn, "owner", "h", None, None).unwrap();
        for name in ["Kia", "Rover"] {
            create_vehicle(
                &conn,
                &NewVehicle {
                    user_id,
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        conn
    }

    /// Collects formatted log output for assertions
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn row(vehicle: &str, date: &str, amount: &str, mileage: &str, details: &str) -> Vec<String> {
        ["x", vehicle, "fuel", date, amount, mileage, details]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn import_str(conn: &Connection, csv_text: &str) -> Result<ImportSummary, ImportError> {
        let vehicles = test_vehicles();
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.as_bytes());
        CsvImporter::new(conn, &vehicles, 1).import_reader(reader)
    }

    #[test]
    fn test_amount_cents_become_currency() {
        let parsed = parse_row(&row(KIA, "2024-01-15", "1234", "", ""), &test_vehicles()).unwrap();

        assert_eq!(parsed.amount, 12.34);
        assert_eq!(parsed.vehicle_id, 1);
        assert_eq!(parsed.expense_type, "fuel");
    }

    #[test]
    fn test_too_few_columns_skipped() {
        let fields = vec!["x", KIA, "fuel", "2024-01-15", "100", ""];

        let err = parse_row(&fields, &test_vehicles()).unwrap_err();

        assert_eq!(err, RowError::InsufficientColumns { found: 6 });
    }

    #[test]
    fn test_invalid_amount_skipped() {
        let err = parse_row(&row(KIA, "2024-01-15", "12.34", "", ""), &test_vehicles()).unwrap_err();

        assert!(matches!(err, RowError::InvalidAmount { .. }));
    }

    #[test]
    fn test_amount_checked_before_vehicle() {
        let err = parse_row(&row("unknown", "bad", "abc", "", ""), &test_vehicles()).unwrap_err();

        assert!(matches!(err, RowError::InvalidAmount { .. }));
    }

    #[test]
    fn test_empty_or_zero_mileage_is_absent() {
        let vehicles = test_vehicles();

        let empty = parse_row(&row(KIA, "2024-01-15", "100", "", ""), &vehicles).unwrap();
        let zero = parse_row(&row(KIA, "2024-01-15", "100", "0", ""), &vehicles).unwrap();
        let some = parse_row(&row(KIA, "2024-01-15", "100", "56789", ""), &vehicles).unwrap();

        assert_eq!(empty.mileage, None);
        assert_eq!(zero.mileage, None);
        assert!(zero.warnings.is_empty());
        assert_eq!(some.mileage, Some(56789));
    }

    #[test]
    fn test_bad_mileage_degrades_row() {
        let parsed = parse_row(&row(KIA, "2024-01-15", "100", "abc", ""), &test_vehicles()).unwrap();

        assert_eq!(parsed.mileage, None);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(matches!(parsed.warnings[0], RowWarning::InvalidMileage { .. }));
    }

    #[test]
    fn test_unknown_vehicle_skipped() {
        let err = parse_row(
            &row("00000000-0000-0000-0000-000000000000", "2024-01-15", "100", "", ""),
            &test_vehicles(),
        )
        .unwrap_err();

        assert!(matches!(err, RowError::UnknownVehicle(_)));
    }

    #[test]
    fn test_strict_date_format() {
        let vehicles = test_vehicles();

        for bad in ["2024-1-15", "15/01/2024", "2024-02-30", "2024-01-15T00:00:00", " 2024-01-15", ""] {
            let err = parse_row(&row(KIA, bad, "100", "", ""), &vehicles).unwrap_err();
            assert!(matches!(err, RowError::InvalidDate { .. }), "accepted {:?}", bad);
        }

        let leap = parse_row(&row(KIA, "2024-02-29", "100", "", ""), &vehicles).unwrap();
        assert_eq!(leap.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_details_handling() {
        let vehicles = test_vehicles();
        let note = r#"{"note":"oil change"}"#;

        let kept = parse_row(&row(KIA, "2024-01-15", "100", "", note), &vehicles).unwrap();
        let empty_obj = parse_row(&row(KIA, "2024-01-15", "100", "", "{}"), &vehicles).unwrap();
        let broken = parse_row(&row(KIA, "2024-01-15", "100", "", "{note"), &vehicles).unwrap();

        assert_eq!(kept.details.as_deref(), Some(note));
        assert_eq!(empty_obj.details, None);
        assert_eq!(broken.details, None);
        assert!(matches!(broken.warnings[0], RowWarning::InvalidDetails { .. }));
    }

    #[test]
    fn test_parse_vehicle_entry() {
        let (id, vehicle) =
            VehicleIdentifierMap::parse_entry("8432BE0A-80D4-4E53-85C3-9C91A2934CCA=1").unwrap();

        assert_eq!(id, KIA);
        assert_eq!(vehicle, 1);
        assert!(VehicleIdentifierMap::parse_entry("not-a-uuid=1").is_err());
        assert!(VehicleIdentifierMap::parse_entry(&format!("{}=one", KIA)).is_err());
        assert!(VehicleIdentifierMap::parse_entry(KIA).is_err());
    }

    #[test]
    fn test_vehicle_lookup_ignores_uuid_case() {
        let upper = "8432BE0A-80D4-4E53-85C3-9C91A2934CCA";
        let from_flag: VehicleIdentifierMap =
            [VehicleIdentifierMap::parse_entry(&format!("{}=1", upper)).unwrap()]
                .into_iter()
                .collect();
        let from_builder = VehicleIdentifierMap::new().with(upper, 1);

        assert_eq!(from_flag.resolve(upper), Some(1));
        assert_eq!(from_flag.resolve(KIA), Some(1));
        assert_eq!(from_builder.resolve(KIA), Some(1));
        assert_eq!(from_flag.resolve("8432be0a80d44e5385c39c91a2934cca"), Some(1));
        assert_eq!(from_flag.resolve(ROVER), None);

        let parsed = parse_row(&row(upper, "2024-01-15", "100", "", ""), &from_flag).unwrap();
        assert_eq!(parsed.vehicle_id, 1);
    }

    #[test]
    fn test_non_uuid_identifier_matches_exactly() {
        let vehicles = VehicleIdentifierMap::new().with("legacy-kia", 1);

        assert_eq!(vehicles.resolve("legacy-kia"), Some(1));
        assert_eq!(vehicles.resolve("LEGACY-KIA"), None);
    }

    #[test]
    fn test_import_mixed_rows() {
        let conn = test_conn();
        let csv_text = format!(
            "{HEADER}\
             1,{KIA},fuel,2024-01-15,1234,0,\n\
             2,{ROVER},service,2024-02-01,25000,81000,\"{{\"\"note\"\":\"\"oil change\"\"}}\"\n\
             3,00000000-0000-0000-0000-000000000000,fuel,2024-02-02,500,,\n\
             4,{KIA},fuel,2024-02-03,abc,,\n\
             5,{KIA},fuel,03/02/2024,500,,\n\
             6,{KIA},short\n\
             7,{KIA},parking,2024-02-04,300,abc,{{bad\n"
        );

        let summary = import_str(&conn, &csv_text).unwrap();

        assert_eq!(summary.imported, 3);
        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.degraded, 1);
        assert_eq!(count_expenses(&conn).unwrap(), 3);

        let stored = get_expenses_for_user(&conn, 1).unwrap();
        let fuel = stored.iter().find(|e| e.expense_type == "fuel").unwrap();
        assert_eq!(fuel.amount, 12.34);
        assert_eq!(fuel.date, "2024-01-15");
        assert_eq!(fuel.mileage, None);

        let service = stored.iter().find(|e| e.expense_type == "service").unwrap();
        assert_eq!(service.details.as_deref(), Some(r#"{"note":"oil change"}"#));
        assert_eq!(service.amount, 250.0);
        assert_eq!(service.vehicle_id, 2);

        let parking = stored.iter().find(|e| e.expense_type == "parking").unwrap();
        assert_eq!(parking.mileage, None);
        assert_eq!(parking.details, None);

        assert!(stored.iter().all(|e| e.vehicle_id == 1 || e.vehicle_id == 2));

        println!("✅ Mixed row import test PASSED");
    }

    #[test]
    fn test_header_only_imports_nothing() {
        let conn = test_conn();

        let summary = import_str(&conn, HEADER).unwrap();

        assert_eq!(summary, ImportSummary::default());
        assert_eq!(count_expenses(&conn).unwrap(), 0);
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let conn = test_conn();

        let err = import_str(&conn, "").unwrap_err();

        assert!(matches!(err, ImportError::Empty));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let conn = test_conn();
        let vehicles = test_vehicles();

        let err = CsvImporter::new(&conn, &vehicles, 1)
            .import_file(Path::new("/nonexistent/expenses.csv"))
            .unwrap_err();

        assert!(matches!(err, ImportError::Open { .. }));
    }

    #[test]
    fn test_store_failure_aborts_run() {
        let conn = test_conn();
        conn.execute("DROP TABLE expenses", []).unwrap();
        let csv_text = format!(
            "{HEADER}1,{KIA},fuel,2024-01-15,1234,,\n2,{KIA},fuel,2024-01-16,999,,\n"
        );

        let err = import_str(&conn, &csv_text).unwrap_err();

        assert!(matches!(err, ImportError::Insert { row: 2, .. }));
    }

    #[test]
    fn test_read_error_leaves_store_untouched() {
        let conn = test_conn();
        let vehicles = test_vehicles();
        let mut bytes = format!("{HEADER}1,{KIA},fuel,2024-01-15,1234,,\n2,{KIA},").into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",2024-01-16,999,,\n");
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let err = CsvImporter::new(&conn, &vehicles, 1)
            .import_reader(reader)
            .unwrap_err();

        assert!(matches!(err, ImportError::Read { row: 3, .. }));
        assert_eq!(count_expenses(&conn).unwrap(), 0);
    }

    #[test]
    fn test_mapping_to_missing_vehicle_aborts_run() {
        let conn = test_conn();
        let vehicles = VehicleIdentifierMap::new().with(KIA, 99);
        let csv_text = format!("{HEADER}1,{KIA},fuel,2024-01-15,1234,,\n");
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let err = CsvImporter::new(&conn, &vehicles, 1)
            .import_reader(reader)
            .unwrap_err();

        assert!(matches!(err, ImportError::Insert { row: 2, .. }));
        assert_eq!(count_expenses(&conn).unwrap(), 0);
    }

    #[test]
    fn test_progress_logged_every_fifty_rows() {
        let conn = test_conn();
        let mut csv_text = HEADER.to_string();
        for n in 1..=120 {
            csv_text.push_str(&format!("{n},{KIA},fuel,2024-03-01,{},,\n", n * 100));
        }
        // A skipped row does not count towards progress
        csv_text.push_str(&format!("121,{KIA},fuel,bad-date,100,,\n"));

        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let capture = capture.clone();
                move || capture.clone()
            })
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        let summary =
            tracing::subscriber::with_default(subscriber, || import_str(&conn, &csv_text)).unwrap();
        let logs = capture.text();

        assert_eq!(summary.imported, 120);
        assert_eq!(summary.skipped, 1);
        assert!(logs.contains("Imported 50 expenses..."));
        assert!(logs.contains("Imported 100 expenses..."));
        assert_eq!(logs.matches("expenses...").count(), 2);
        assert!(logs.contains("Successfully imported 120 expenses"));
    }

    #[test]
    fn test_import_file_from_disk() {
        let conn = test_conn();
        let vehicles = test_vehicles();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}").unwrap();
        for day in 1..=60 {
            writeln!(file, "{day},{KIA},fuel,2024-03-{:02},{},,", (day % 28) + 1, day * 100).unwrap();
        }
        file.flush().unwrap();

        let summary = CsvImporter::new(&conn, &vehicles, 1)
            .import_file(file.path())
            .unwrap();

        assert_eq!(summary.imported, 60);
        assert_eq!(get_expenses_for_user(&conn, 1).unwrap().len(), 60);
    }
}
