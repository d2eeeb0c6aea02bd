//! Project roster model.
//!
//! Contains roster entries, the attendance schedule codes, search filters,
//! the per-employee aggregates and the repository for database operations.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{AppError, AppResult};

/// Attendance code from the roster's schedule column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Work from office
    Wfo,
    /// Work from home
    Wfh,
    /// Week off
    Wo,
    /// Planned leave
    Pl,
    /// Sick leave
    Sl,
    /// Casual leave
    Cl,
    /// Unspecified leave
    Leave,
    Other,
}

impl Schedule {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WFO" => Self::Wfo,
            "WFH" => Self::Wfh,
            "WO" => Self::Wo,
            "PL" => Self::Pl,
            "SL" => Self::Sl,
            "CL" => Self::Cl,
            "LEAVE" | "L" => Self::Leave,
            _ => Self::Other,
        }
    }

    pub const fn is_working_day(self) -> bool {
        matches!(self, Self::Wfo | Self::Wfh)
    }

    pub const fn is_leave(self) -> bool {
        matches!(self, Self::Pl | Self::Sl | Self::Cl | Self::Leave)
    }
}

/// Roster row as stored in `roster_entries`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub roster_id: i64,
    pub employee_id: String,
    pub name: String,
    pub team: String,
    pub work_date: NaiveDate,
    pub shift: String,
    pub schedule: String,
    pub first_in: Option<NaiveTime>,
    pub last_out: Option<NaiveTime>,
    pub net_office_minutes: Option<i32>,
    pub present: bool,
    pub comment: Option<String>,
    pub annotation_status: Option<bool>,
    pub annotated_by: Option<String>,
    pub annotated_at: Option<DateTime<Utc>>,
}

/// A parsed roster row ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRosterEntry {
    pub employee_id: String,
    pub name: String,
    pub team: String,
    pub work_date: NaiveDate,
    pub shift: String,
    pub schedule: String,
    pub first_in: Option<NaiveTime>,
    pub last_out: Option<NaiveTime>,
    pub net_office_minutes: Option<i32>,
    pub present: bool,
}

/// Search filters shared by every roster query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterFilter {
    pub name_query: Option<String>,
    pub employee_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub team: Option<String>,
    pub shift: Option<String>,
}

impl RosterFilter {
    /// Stable cache key fragment for this filter set.
    ///
    /// Hash of the MessagePack encoding, so free-text values cannot collide
    /// across fields.
    pub fn cache_key(&self) -> AppResult<String> {
        let encoded = rmp_serde::to_vec(self)
            .map_err(|e| AppError::Internal(format!("Filter encoding failed: {e}")))?;
        Ok(format!("{:016x}", xxh3_64(&encoded)))
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(q) = &self.name_query {
            qb.push(" AND name ILIKE ")
                .push_bind(format!("%{}%", escape_like(q)));
        }
        if let Some(id) = &self.employee_id {
            qb.push(" AND employee_id = ").push_bind(id.clone());
        }
        if let Some(start) = self.start_date {
            qb.push(" AND work_date >= ").push_bind(start);
        }
        if let Some(end) = self.end_date {
            qb.push(" AND work_date <= ").push_bind(end);
        }
        if let Some(team) = &self.team {
            qb.push(" AND LOWER(team) = LOWER(").push_bind(team.clone()).push(")");
        }
        if let Some(shift) = &self.shift {
            qb.push(" AND LOWER(shift) = LOWER(").push_bind(shift.clone()).push(")");
        }
    }
}

/// Escapes `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Attendance totals for one employee over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceCounts {
    pub wfo: u32,
    pub wfh: u32,
    pub week_off: u32,
    pub planned_leave: u32,
    pub leaves: u32,
}

impl AttendanceCounts {
    pub const fn working_days(&self) -> u32 {
        self.wfo + self.wfh
    }

    fn add(&mut self, schedule: Schedule) {
        match schedule {
            Schedule::Wfo => self.wfo += 1,
            Schedule::Wfh => self.wfh += 1,
            Schedule::Wo => self.week_off += 1,
            Schedule::Pl => self.planned_leave += 1,
            Schedule::Sl | Schedule::Cl | Schedule::Leave | Schedule::Other => {}
        }
        if schedule.is_leave() {
            self.leaves += 1;
        }
    }
}

/// Per-employee summary produced by the `count` search action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeSummary {
    pub employee_id: String,
    pub name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub counts: AttendanceCounts,
}

/// Aggregates entries per employee, ordered by employee id.
///
/// The period is the filter's date range when given, otherwise the span of
/// the employee's own rows.
pub fn summarize_attendance(entries: &[RosterEntry], filter: &RosterFilter) -> Vec<EmployeeSummary> {
    let mut by_employee: BTreeMap<&str, EmployeeSummary> = BTreeMap::new();

    for entry in entries {
        let summary = by_employee
            .entry(entry.employee_id.as_str())
            .or_insert_with(|| EmployeeSummary {
                employee_id: entry.employee_id.clone(),
                name: entry.name.clone(),
                period_start: entry.work_date,
                period_end: entry.work_date,
                counts: AttendanceCounts::default(),
            });
        summary.period_start = summary.period_start.min(entry.work_date);
        summary.period_end = summary.period_end.max(entry.work_date);
        summary.counts.add(Schedule::classify(&entry.schedule));
    }

    by_employee
        .into_values()
        .map(|mut summary| {
            if let Some(start) = filter.start_date {
                summary.period_start = start;
            }
            if let Some(end) = filter.end_date {
                summary.period_end = end;
            }
            summary
        })
        .collect()
}

/// Working-day entries whose net office time is under `threshold_minutes`.
///
/// A working day with no recorded office time counts as zero minutes.
pub fn low_hour_entries(entries: &[RosterEntry], threshold_minutes: i32) -> Vec<&RosterEntry> {
    entries
        .iter()
        .filter(|e| Schedule::classify(&e.schedule).is_working_day())
        .filter(|e| e.net_office_minutes.unwrap_or(0) < threshold_minutes)
        .collect()
}

/// Outcome of writing a batch of roster rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// Rows written per `UNNEST` statement during an import.
const IMPORT_BATCH_ROWS: usize = 1000;

const ROSTER_COLUMNS: &str = "roster_id, employee_id, name, team, work_date, shift, schedule, \
     first_in, last_out, net_office_minutes, present, comment, annotation_status, \
     annotated_by, annotated_at";

/// Roster repository.
pub struct RosterRepository;

impl RosterRepository {
    /// Returns true when a file with this content hash was already imported.
    pub async fn upload_exists(pool: &sqlx::PgPool, file_hash: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM roster_uploads WHERE file_hash = $1)",
        )
        .bind(file_hash)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Writes all rows and the upload record in one transaction.
    ///
    /// Existing `(employee_id, work_date)` rows get new attendance values but
    /// keep their annotations. Returns `None` when another request imported
    /// the same file hash first.
    pub async fn import(
        pool: &sqlx::PgPool,
        entries: &[NewRosterEntry],
        file_name: &str,
        file_hash: &str,
        uploaded_by: &str,
    ) -> AppResult<Option<UpsertOutcome>> {
        let mut tx = pool.begin().await?;

        let upload_id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO roster_uploads (file_name, file_hash, row_count, uploaded_by, uploaded_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (file_hash) DO NOTHING
            RETURNING upload_id
            ",
        )
        .bind(file_name)
        .bind(file_hash)
        .bind(i32::try_from(entries.len()).unwrap_or(i32::MAX))
        .bind(uploaded_by)
        .fetch_optional(&mut *tx)
        .await?;

        if upload_id.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut outcome = UpsertOutcome::default();
        for batch in entries.chunks(IMPORT_BATCH_ROWS) {
            for inserted in Self::upsert_batch(&mut tx, batch).await? {
                if inserted {
                    outcome.inserted += 1;
                } else {
                    outcome.updated += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(Some(outcome))
    }

    /// Upserts one batch through `UNNEST` arrays and returns, per row,
    /// whether it was inserted.
    ///
    /// Rows must be unique on `(employee_id, work_date)` within the batch.
    async fn upsert_batch(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        batch: &[NewRosterEntry],
    ) -> AppResult<Vec<bool>> {
        let mut employee_ids = Vec::with_capacity(batch.len());
        let mut names = Vec::with_capacity(batch.len());
        let mut teams = Vec::with_capacity(batch.len());
        let mut work_dates = Vec::with_capacity(batch.len());
        let mut shifts = Vec::with_capacity(batch.len());
        let mut schedules = Vec::with_capacity(batch.len());
        let mut first_ins = Vec::with_capacity(batch.len());
        let mut last_outs = Vec::with_capacity(batch.len());
        let mut net_minutes = Vec::with_capacity(batch.len());
        let mut presents = Vec::with_capacity(batch.len());

        for entry in batch {
            employee_ids.push(entry.employee_id.as_str());
            names.push(entry.name.as_str());
            teams.push(entry.team.as_str());
            work_dates.push(entry.work_date);
            shifts.push(entry.shift.as_str());
            schedules.push(entry.schedule.as_str());
            first_ins.push(entry.first_in);
            last_outs.push(entry.last_out);
            net_minutes.push(entry.net_office_minutes);
            presents.push(entry.present);
        }

        let inserted = sqlx::query_scalar::<_, bool>(
            r"
            INSERT INTO roster_entries (
                employee_id, name, team, work_date, shift, schedule,
                first_in, last_out, net_office_minutes, present
            )
            SELECT * FROM UNNEST(
                $1::VARCHAR[], $2::VARCHAR[], $3::VARCHAR[], $4::DATE[], $5::VARCHAR[],
                $6::VARCHAR[], $7::TIME[], $8::TIME[], $9::INT4[], $10::BOOL[]
            )
            ON CONFLICT (employee_id, work_date) DO UPDATE SET
                name = EXCLUDED.name,
                team = EXCLUDED.team,
                shift = EXCLUDED.shift,
                schedule = EXCLUDED.schedule,
                first_in = EXCLUDED.first_in,
                last_out = EXCLUDED.last_out,
                net_office_minutes = EXCLUDED.net_office_minutes,
                present = EXCLUDED.present
            RETURNING (xmax = 0)
            ",
        )
        .bind(&employee_ids)
        .bind(&names)
        .bind(&teams)
        .bind(&work_dates)
        .bind(&shifts)
        .bind(&schedules)
        .bind(&first_ins)
        .bind(&last_outs)
        .bind(&net_minutes)
        .bind(&presents)
        .fetch_all(&mut **tx)
        .await?;

        Ok(inserted)
    }

    /// Rows matching `filter`, ordered by date then name.
    pub async fn search(
        pool: &sqlx::PgPool,
        filter: &RosterFilter,
        limit: Option<i64>,
    ) -> AppResult<Vec<RosterEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ROSTER_COLUMNS} FROM roster_entries WHERE TRUE"
        ));
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY work_date ASC, name ASC, roster_id ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb.build_query_as::<RosterEntry>().fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn distinct_teams(pool: &sqlx::PgPool) -> AppResult<Vec<String>> {
        let teams = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT team FROM roster_entries WHERE team <> '' ORDER BY team",
        )
        .fetch_all(pool)
        .await?;
        Ok(teams)
    }

    pub async fn distinct_shifts(pool: &sqlx::PgPool) -> AppResult<Vec<String>> {
        let shifts = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT shift FROM roster_entries WHERE shift <> '' ORDER BY shift",
        )
        .fetch_all(pool)
        .await?;
        Ok(shifts)
    }

    /// Distinct `YYYY-MM` months that have rows matching `filter`.
    pub async fn months(pool: &sqlx::PgPool, filter: &RosterFilter) -> AppResult<Vec<String>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT DISTINCT TO_CHAR(work_date, 'YYYY-MM') AS month FROM roster_entries WHERE TRUE",
        );
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY month");

        let months = qb.build_query_scalar::<String>().fetch_all(pool).await?;
        Ok(months)
    }

    /// Stores an annotation. Returns false when the row does not exist.
    pub async fn annotate(
        pool: &sqlx::PgPool,
        roster_id: i64,
        comment: &str,
        status: bool,
        annotated_by: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE roster_entries
            SET comment = $2, annotation_status = $3, annotated_by = $4, annotated_at = NOW()
            WHERE roster_id = $1
            ",
        )
        .bind(roster_id)
        .bind(comment)
        .bind(status)
        .bind(annotated_by)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(employee_id: &str, day: u32, schedule: &str, minutes: Option<i32>) -> RosterEntry {
        RosterEntry {
            roster_id: i64::from(day),
            employee_id: employee_id.to_string(),
            name: format!("Employee {employee_id}"),
            team: "Middleware".to_string(),
            work_date: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            shift: "General".to_string(),
            schedule: schedule.to_string(),
            first_in: None,
            last_out: None,
            net_office_minutes: minutes,
            present: minutes.is_some(),
            comment: None,
            annotation_status: None,
            annotated_by: None,
            annotated_at: None,
        }
    }

    #[test]
    fn test_schedule_classify() {
        assert_eq!(Schedule::classify("wfo"), Schedule::Wfo);
        assert_eq!(Schedule::classify(" WFH "), Schedule::Wfh);
        assert_eq!(Schedule::classify("leave"), Schedule::Leave);
        assert_eq!(Schedule::classify("Holiday"), Schedule::Other);
        assert!(Schedule::Wfh.is_working_day());
        assert!(!Schedule::Wo.is_working_day());
        assert!(Schedule::Sl.is_leave());
        assert!(!Schedule::Wo.is_leave());
    }

    #[test]
    fn test_summarize_attendance_counts() {
        let entries = vec![
            entry("E1", 1, "WFO", Some(540)),
            entry("E1", 2, "WFH", Some(500)),
            entry("E1", 3, "WO", None),
            entry("E1", 4, "PL", None),
            entry("E1", 5, "SL", None),
            entry("E2", 2, "WFO", Some(560)),
        ];

        let summaries = summarize_attendance(&entries, &RosterFilter::default());
        assert_eq!(summaries.len(), 2);

        let e1 = &summaries[0];
        assert_eq!(e1.employee_id, "E1");
        assert_eq!(e1.counts.wfo, 1);
        assert_eq!(e1.counts.wfh, 1);
        assert_eq!(e1.counts.week_off, 1);
        assert_eq!(e1.counts.planned_leave, 1);
        assert_eq!(e1.counts.leaves, 2);
        assert_eq!(e1.counts.working_days(), 2);
        assert_eq!(e1.period_start, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(e1.period_end, NaiveDate::from_ymd_opt(2025, 10, 5).unwrap());
    }

    #[test]
    fn test_summarize_attendance_uses_filter_period() {
        let entries = vec![entry("E1", 3, "WFO", Some(540))];
        let filter = RosterFilter {
            start_date: NaiveDate::from_ymd_opt(2025, 10, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 10, 31),
            ..RosterFilter::default()
        };

        let summaries = summarize_attendance(&entries, &filter);
        assert_eq!(summaries[0].period_start, filter.start_date.unwrap());
        assert_eq!(summaries[0].period_end, filter.end_date.unwrap());
    }

    #[test]
    fn test_low_hour_entries() {
        let entries = vec![
            entry("E1", 1, "WFO", Some(539)),
            entry("E1", 2, "WFO", Some(540)),
            entry("E1", 3, "WFH", None),
            entry("E1", 4, "WO", None),
            entry("E1", 5, "PL", Some(0)),
        ];

        let low = low_hour_entries(&entries, 540);
        let days: Vec<u32> = low.iter().map(|e| chrono::Datelike::day(&e.work_date)).collect();
        assert_eq!(days, vec![1, 3]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filter_cache_key_distinguishes_fields() {
        let a = RosterFilter {
            team: Some("MQ".to_string()),
            ..RosterFilter::default()
        };
        let b = RosterFilter {
            shift: Some("MQ".to_string()),
            ..RosterFilter::default()
        };
        assert_ne!(a.cache_key().unwrap(), b.cache_key().unwrap());
        assert_eq!(a.cache_key().unwrap(), a.clone().cache_key().unwrap());
    }

    #[test]
    fn test_filter_cache_key_separator_in_values() {
        // 값 안의 구분자가 다른 필드와 섞이면 안 됨
        let a = RosterFilter {
            name_query: Some("a|id=b".to_string()),
            ..RosterFilter::default()
        };
        let b = RosterFilter {
            name_query: Some("a".to_string()),
            employee_id: Some("b|id=".to_string()),
            ..RosterFilter::default()
        };
        assert_ne!(a.cache_key().unwrap(), b.cache_key().unwrap());
    }
}
