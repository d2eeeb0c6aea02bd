//! Roster file import.
//!
//! Parses an uploaded CSV roster into rows ready for the database. Bad rows
//! are skipped and reported with their line number, good rows are kept.

use std::collections::HashMap;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{AppError, AppResult};
use crate::models::{NewRosterEntry, Schedule};
use crate::utils::timesheet::{office_minutes, parse_clock, parse_date, parse_duration_minutes, parse_flag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    EmployeeId,
    Name,
    Team,
    Date,
    Shift,
    Schedule,
    FirstIn,
    LastOut,
    NetOfficeTime,
    Status,
}

const REQUIRED_COLUMNS: [Column; 6] = [
    Column::EmployeeId,
    Column::Name,
    Column::Team,
    Column::Date,
    Column::Shift,
    Column::Schedule,
];

impl Column {
    fn from_header(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .trim_start_matches('\u{feff}')
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "employee_id" | "emp_id" | "employee_code" | "id" => Some(Self::EmployeeId),
            "name" | "employee_name" => Some(Self::Name),
            "team" | "team_name" | "teamname" => Some(Self::Team),
            "date" | "work_date" => Some(Self::Date),
            "shift" => Some(Self::Shift),
            "schedule" | "attendance" => Some(Self::Schedule),
            "first_in" | "in_time" => Some(Self::FirstIn),
            "last_out" | "out_time" => Some(Self::LastOut),
            "net_office_time" | "office_time" | "net_time" => Some(Self::NetOfficeTime),
            "status" | "present" => Some(Self::Status),
            _ => None,
        }
    }

    const fn header(self) -> &'static str {
        match self {
            Self::EmployeeId => "employee_id",
            Self::Name => "name",
            Self::Team => "team",
            Self::Date => "date",
            Self::Shift => "shift",
            Self::Schedule => "schedule",
            Self::FirstIn => "first_in",
            Self::LastOut => "last_out",
            Self::NetOfficeTime => "net_office_time",
            Self::Status => "status",
        }
    }

    /// Longest value the `roster_entries` column accepts, in characters.
    const fn max_chars(self) -> Option<usize> {
        match self {
            Self::EmployeeId | Self::Shift => Some(50),
            Self::Name => Some(150),
            Self::Team => Some(100),
            Self::Schedule => Some(20),
            _ => None,
        }
    }
}

/// A skipped row and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: u64,
    pub error: String,
}

/// Result of parsing one roster file.
#[derive(Debug, Default)]
pub struct ParsedRoster {
    pub entries: Vec<NewRosterEntry>,
    pub errors: Vec<RowError>,
}

/// Content hash used to detect repeated uploads of the same file.
pub fn file_hash(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

/// Parses roster CSV bytes.
///
/// Fails only when the header is unusable; row problems end up in
/// [`ParsedRoster::errors`]. Rows repeating an earlier `(employee_id, date)`
/// pair replace it.
pub fn parse_roster(bytes: &[u8]) -> AppResult<ParsedRoster> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            columns.entry(column).or_insert(idx);
        }
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(c))
        .map(|c| c.header())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut parsed = ParsedRoster::default();
    let mut seen: HashMap<(String, chrono::NaiveDate), usize> = HashMap::new();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                parsed.errors.push(RowError {
                    line,
                    error: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);

        if record.iter().all(str::is_empty) {
            continue;
        }

        let field = |column: Column| {
            columns
                .get(&column)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
        };

        match parse_row(field) {
            Ok(entry) => {
                let key = (entry.employee_id.clone(), entry.work_date);
                if let Some(&existing) = seen.get(&key) {
                    parsed.entries[existing] = entry;
                } else {
                    seen.insert(key, parsed.entries.len());
                    parsed.entries.push(entry);
                }
            }
            Err(error) => parsed.errors.push(RowError { line, error }),
        }
    }

    Ok(parsed)
}

fn parse_row<'a>(field: impl Fn(Column) -> &'a str) -> Result<NewRosterEntry, String> {
    let required = |column: Column| -> Result<String, String> {
        let value = field(column);
        if value.is_empty() {
            return Err(format!("Missing value for '{}'", column.header()));
        }
        if let Some(max) = column.max_chars() {
            if value.chars().count() > max {
                return Err(format!(
                    "Value for '{}' is longer than {max} characters",
                    column.header()
                ));
            }
        }
        Ok(value.to_string())
    };

    let employee_id = required(Column::EmployeeId)?;
    let name = required(Column::Name)?;
    let team = required(Column::Team)?;
    let raw_date = required(Column::Date)?;
    let work_date = parse_date(&raw_date).ok_or_else(|| format!("Invalid date '{raw_date}'"))?;
    let shift = required(Column::Shift)?;
    let schedule = required(Column::Schedule)?.to_ascii_uppercase();

    let first_in = optional_clock(field(Column::FirstIn), Column::FirstIn)?;
    let last_out = optional_clock(field(Column::LastOut), Column::LastOut)?;

    let raw_net = field(Column::NetOfficeTime);
    let net_office_minutes = if raw_net.is_empty() || raw_net == "-" {
        match (first_in, last_out) {
            (Some(start), Some(end)) => Some(office_minutes(start, end)),
            _ => None,
        }
    } else {
        Some(
            parse_duration_minutes(raw_net)
                .ok_or_else(|| format!("Invalid net office time '{raw_net}'"))?,
        )
    };

    let raw_status = field(Column::Status);
    let present = if raw_status.is_empty() {
        Schedule::classify(&schedule).is_working_day()
    } else {
        parse_flag(raw_status).ok_or_else(|| format!("Invalid status '{raw_status}'"))?
    };

    Ok(NewRosterEntry {
        employee_id,
        name,
        team,
        work_date,
        shift,
        schedule,
        first_in,
        last_out,
        net_office_minutes,
        present,
    })
}

fn optional_clock(raw: &str, column: Column) -> Result<Option<chrono::NaiveTime>, String> {
    if raw.is_empty() || raw == "-" {
        return Ok(None);
    }
    parse_clock(raw)
        .map(Some)
        .ok_or_else(|| format!("Invalid time '{raw}' for '{}'", column.header()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const HEADER: &str = "Employee ID,Name,Team,Date,Shift,Schedule,First In,Last Out,Net Office Time,Status\n";

    #[test]
    fn test_parse_roster_valid_rows() {
        let csv = format!(
            "{HEADER}\
             E100,Asha Rao,Middleware,2025-10-01,General,WFO,09:00,18:30,,\n\
             E101,Ravi K,Middleware,01/10/2025,Night,wfh,22:00,07:00,08:45,True\n"
        );

        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.entries.len(), 2);

        let first = &parsed.entries[0];
        assert_eq!(first.employee_id, "E100");
        assert_eq!(first.work_date, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(first.first_in, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(first.net_office_minutes, Some(570));
        assert!(first.present);

        let second = &parsed.entries[1];
        assert_eq!(second.schedule, "WFH");
        assert_eq!(second.net_office_minutes, Some(525));
    }

    #[test]
    fn test_parse_roster_reports_bad_rows_with_line() {
        let csv = format!(
            "{HEADER}\
             E100,Asha Rao,Middleware,2025-10-01,General,WFO,09:00,18:00,,\n\
             E101,Ravi K,Middleware,not-a-date,General,WFO,09:00,18:00,,\n\
             ,Nameless,Middleware,2025-10-01,General,WFO,,,,\n\
             E102,Meera,Middleware,2025-10-01,General,WFO,25:99,18:00,,\n"
        );

        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        let lines: Vec<u64> = parsed.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(parsed.errors[0].error.contains("Invalid date"));
        assert!(parsed.errors[1].error.contains("employee_id"));
        assert!(parsed.errors[2].error.contains("first_in"));
    }

    #[test]
    fn test_parse_roster_rejects_overlong_values() {
        let long_id = "E".repeat(60);
        let long_schedule = "W".repeat(25);
        let csv = format!(
            "employee_id,name,team,date,shift,schedule\n\
             {long_id},Asha,MW,2025-10-02,General,WFO\n\
             E2,Ravi,MW,2025-10-02,General,{long_schedule}\n\
             E3,Meera,MW,2025-10-02,General,WFH\n"
        );

        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].employee_id, "E3");

        let lines: Vec<u64> = parsed.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(parsed.errors[0].error.contains("employee_id"));
        assert!(parsed.errors[1].error.contains("schedule"));
    }

    #[test]
    fn test_parse_roster_limit_counts_characters() {
        // 한글 이름 150자는 바이트로는 길지만 허용되어야 함
        let name = "가".repeat(150);
        let csv = format!(
            "employee_id,name,team,date,shift,schedule\n\
             E1,{name},MW,2025-10-02,General,WFO\n"
        );
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.entries[0].name.chars().count(), 150);
    }

    #[test]
    fn test_parse_roster_huge_net_office_time_is_row_error() {
        let csv = "employee_id,name,team,date,shift,schedule,net_office_time\n\
                   E1,Asha,MW,2025-10-02,General,WFO,35791395:00\n\
                   E2,Ravi,MW,2025-10-02,General,WFO,08:30\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].net_office_minutes, Some(510));
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line, 2);
        assert!(parsed.errors[0].error.contains("net office time"));
    }

    #[test]
    fn test_parse_roster_missing_required_columns() {
        let csv = "Name,Team,Date\nAsha,MW,2025-10-01\n";
        let err = parse_roster(csv.as_bytes()).unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("employee_id"));
                assert!(msg.contains("schedule"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_roster_optional_columns_absent() {
        let csv = "employee_id,name,team,date,shift,schedule\nE1,Asha,MW,2025-10-02,General,WO\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        let entry = &parsed.entries[0];
        assert_eq!(entry.first_in, None);
        assert_eq!(entry.net_office_minutes, None);
        assert!(!entry.present);
    }

    #[test]
    fn test_parse_roster_later_duplicate_wins() {
        let csv = "employee_id,name,team,date,shift,schedule\n\
                   E1,Asha,MW,2025-10-02,General,WFO\n\
                   E1,Asha,MW,2025-10-02,General,PL\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].schedule, "PL");
    }

    #[test]
    fn test_file_hash_is_stable() {
        assert_eq!(file_hash(b"roster"), file_hash(b"roster"));
        assert_ne!(file_hash(b"roster"), file_hash(b"roster2"));
        assert_eq!(file_hash(b"").len(), 16);
    }
}
