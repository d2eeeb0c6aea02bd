//! Project roster request and response shapes.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::schemas::non_blank;
use crate::error::{AppError, AppResult};
use crate::models::{EmployeeSummary, RosterEntry, RosterFilter};
use crate::utils::timesheet::{flag_str, format_minutes, parse_date, parse_wire_flag};
use crate::utils::RowError;

/// Query string of the roster search view.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Name substring
    #[serde(default)]
    pub q: Option<String>,
    /// Employee id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub teamname: Option<String>,
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Alternate outputs of the search view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchAction {
    GetTeams,
    GetShifts,
    GetMonths,
    Count,
    LowHours,
}

impl FromStr for SearchAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "get_teams" => Ok(Self::GetTeams),
            "get_shifts" => Ok(Self::GetShifts),
            "get_months" => Ok(Self::GetMonths),
            "count" => Ok(Self::Count),
            "low_hours" => Ok(Self::LowHours),
            other => Err(AppError::BadRequest(format!("Unknown action '{other}'"))),
        }
    }
}

impl SearchQuery {
    /// Parsed `action`, `None` for a plain search.
    pub fn action(&self) -> AppResult<Option<SearchAction>> {
        non_blank(self.action.as_deref())
            .map(|a| a.parse())
            .transpose()
    }

    /// Builds the row filter, rejecting bad or inverted dates.
    pub fn filter(&self) -> AppResult<RosterFilter> {
        let start_date = parse_query_date("start_date", self.start_date.as_deref())?;
        let end_date = parse_query_date("end_date", self.end_date.as_deref())?;

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(AppError::BadRequest(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        Ok(RosterFilter {
            name_query: non_blank(self.q.as_deref()),
            employee_id: non_blank(self.id.as_deref()),
            start_date,
            end_date,
            team: non_blank(self.teamname.as_deref()),
            shift: non_blank(self.shift.as_deref()),
        })
    }
}

fn parse_query_date(field: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    non_blank(value)
        .map(|raw| {
            parse_date(&raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {field} '{raw}'")))
        })
        .transpose()
}

/// Attendance block of a search row.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceView {
    pub first_in: Option<String>,
    pub last_out: Option<String>,
    pub net_office_time: Option<String>,
    pub status: &'static str,
}

/// One row of the plain search result.
#[derive(Debug, Clone, Serialize)]
pub struct RosterRowView {
    pub id: i64,
    pub roster_id: i64,
    pub name: String,
    pub team: String,
    pub date: NaiveDate,
    pub shift: String,
    pub schedule: String,
    pub attendance: AttendanceView,
    pub comment: Option<String>,
    pub annotation_status: Option<&'static str>,
}

impl From<RosterEntry> for RosterRowView {
    fn from(e: RosterEntry) -> Self {
        Self {
            id: e.roster_id,
            roster_id: e.roster_id,
            attendance: AttendanceView {
                first_in: e.first_in.map(|t| t.format("%H:%M").to_string()),
                last_out: e.last_out.map(|t| t.format("%H:%M").to_string()),
                net_office_time: e.net_office_minutes.map(format_minutes),
                status: flag_str(e.present),
            },
            name: e.name,
            team: e.team,
            date: e.work_date,
            shift: e.shift,
            schedule: e.schedule,
            comment: e.comment,
            annotation_status: e.annotation_status.map(flag_str),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountsView {
    #[serde(rename = "Total WFO")]
    pub total_wfo: u32,
    #[serde(rename = "Total WFH")]
    pub total_wfh: u32,
    #[serde(rename = "Total WO")]
    pub total_wo: u32,
    #[serde(rename = "Total PL")]
    pub total_pl: u32,
    #[serde(rename = "Total working days")]
    pub total_working_days: u32,
    #[serde(rename = "Total Leaves")]
    pub total_leaves: u32,
}

/// One employee in the `count` action result.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeCountView {
    pub employee: String,
    pub employee_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub counts: CountsView,
}

impl From<EmployeeSummary> for EmployeeCountView {
    fn from(s: EmployeeSummary) -> Self {
        Self {
            counts: CountsView {
                total_wfo: s.counts.wfo,
                total_wfh: s.counts.wfh,
                total_wo: s.counts.week_off,
                total_pl: s.counts.planned_leave,
                total_working_days: s.counts.working_days(),
                total_leaves: s.counts.leaves,
            },
            employee: s.name,
            employee_id: s.employee_id,
            period_start: s.period_start,
            period_end: s.period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LowHoursView {
    pub name: String,
    pub employee_id: String,
    pub team: String,
    pub date: NaiveDate,
    pub shift: String,
    pub net_office_time: String,
    pub status: &'static str,
}

impl From<&RosterEntry> for LowHoursView {
    fn from(e: &RosterEntry) -> Self {
        Self {
            name: e.name.clone(),
            employee_id: e.employee_id.clone(),
            team: e.team.clone(),
            date: e.work_date,
            shift: e.shift.clone(),
            net_office_time: format_minutes(e.net_office_minutes.unwrap_or(0)),
            status: flag_str(e.present),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LowHoursResponse {
    pub employees_with_low_hours: Vec<LowHoursView>,
}

#[derive(Debug, Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ShiftsResponse {
    pub shifts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MonthsResponse {
    pub months: Vec<String>,
}

/// Response of the roster upload view.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: usize,
    pub errors: Vec<RowError>,
    pub duplicate: bool,
}

impl UploadResponse {
    /// Response for a file whose content was imported before.
    pub fn duplicate(file_name: String) -> Self {
        Self {
            message: "File already uploaded".to_string(),
            file_name,
            inserted: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            duplicate: true,
        }
    }
}

/// Annotation update request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnnotationRequest {
    #[validate(required(message = "roster_id is required"))]
    #[serde(default)]
    pub roster_id: Option<i64>,

    #[validate(
        required(message = "comment is required"),
        length(max = 1000, message = "comment must be at most 1000 characters")
    )]
    #[serde(default)]
    pub comment: Option<String>,

    /// `"True"` or `"False"`, defaults to `"True"`
    #[serde(default)]
    pub status: Option<String>,
}

impl AnnotationRequest {
    /// Returns `(roster_id, trimmed comment, status)` after presence checks.
    pub fn parts(&self) -> AppResult<(i64, String, bool)> {
        let roster_id = self
            .roster_id
            .ok_or_else(|| AppError::Validation("roster_id is required".to_string()))?;
        let comment = non_blank(self.comment.as_deref())
            .ok_or_else(|| AppError::Validation("comment must not be blank".to_string()))?;
        let status = match non_blank(self.status.as_deref()) {
            None => true,
            Some(raw) => parse_wire_flag(&raw)
                .ok_or_else(|| AppError::Validation(format!("Invalid status '{raw}'")))?,
        };
        Ok((roster_id, comment, status))
    }
}

#[derive(Debug, Serialize)]
pub struct AnnotationResponse {
    pub message: &'static str,
    pub roster_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{summarize_attendance, AttendanceCounts};
    use chrono::NaiveTime;

    fn roster_entry() -> RosterEntry {
        RosterEntry {
            roster_id: 12,
            employee_id: "E100".to_string(),
            name: "Asha Rao".to_string(),
            team: "Middleware".to_string(),
            work_date: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
            shift: "General".to_string(),
            schedule: "WFO".to_string(),
            first_in: NaiveTime::from_hms_opt(9, 5, 0),
            last_out: NaiveTime::from_hms_opt(17, 45, 0),
            net_office_minutes: Some(520),
            present: true,
            comment: None,
            annotation_status: Some(false),
            annotated_by: None,
            annotated_at: None,
        }
    }

    // ============ SearchQuery 테스트 ============

    #[test]
    fn test_search_query_filter_trims_and_drops_blanks() {
        let query = SearchQuery {
            q: Some(" asha ".to_string()),
            id: Some(String::new()),
            teamname: Some("Middleware".to_string()),
            start_date: Some("2025-10-01".to_string()),
            end_date: Some("31-10-2025".to_string()),
            ..SearchQuery::default()
        };

        let filter = query.filter().unwrap();
        assert_eq!(filter.name_query.as_deref(), Some("asha"));
        assert!(filter.employee_id.is_none());
        assert_eq!(filter.team.as_deref(), Some("Middleware"));
        assert_eq!(filter.end_date, NaiveDate::from_ymd_opt(2025, 10, 31));
    }

    #[test]
    fn test_search_query_rejects_inverted_range() {
        let query = SearchQuery {
            start_date: Some("2025-10-31".to_string()),
            end_date: Some("2025-10-01".to_string()),
            ..SearchQuery::default()
        };
        assert!(matches!(query.filter(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_search_query_rejects_bad_date() {
        let query = SearchQuery {
            start_date: Some("yesterday".to_string()),
            ..SearchQuery::default()
        };
        match query.filter() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("start_date")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_search_action_parse() {
        let mut query = SearchQuery::default();
        assert_eq!(query.action().unwrap(), None);

        query.action = Some("low_hours".to_string());
        assert_eq!(query.action().unwrap(), Some(SearchAction::LowHours));

        query.action = Some("delete_all".to_string());
        assert!(query.action().is_err());
    }

    // ============ 뷰 변환 테스트 ============

    #[test]
    fn test_roster_row_view_shape() {
        let json = serde_json::to_value(RosterRowView::from(roster_entry())).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["roster_id"], 12);
        assert_eq!(json["date"], "2025-10-06");
        assert_eq!(json["attendance"]["first_in"], "09:05");
        assert_eq!(json["attendance"]["net_office_time"], "08:40");
        assert_eq!(json["attendance"]["status"], "True");
        assert_eq!(json["annotation_status"], "False");
        assert!(json["comment"].is_null());
    }

    #[test]
    fn test_employee_count_view_keys() {
        let summaries = summarize_attendance(&[roster_entry()], &RosterFilter::default());
        let view = EmployeeCountView::from(summaries.into_iter().next().unwrap());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["employee"], "Asha Rao");
        assert_eq!(json["counts"]["Total WFO"], 1);
        assert_eq!(json["counts"]["Total working days"], 1);
        assert_eq!(json["counts"]["Total Leaves"], 0);
        assert_eq!(json["period_start"], "2025-10-06");
    }

    #[test]
    fn test_counts_view_from_summary() {
        let summary = EmployeeSummary {
            employee_id: "E1".to_string(),
            name: "E".to_string(),
            period_start: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
            counts: AttendanceCounts {
                wfo: 10,
                wfh: 5,
                week_off: 8,
                planned_leave: 2,
                leaves: 3,
            },
        };
        let view = EmployeeCountView::from(summary);
        assert_eq!(view.counts.total_working_days, 15);
        assert_eq!(view.counts.total_pl, 2);
        assert_eq!(view.counts.total_leaves, 3);
    }

    #[test]
    fn test_low_hours_view() {
        let json = serde_json::to_value(LowHoursView::from(&roster_entry())).unwrap();
        assert_eq!(json["net_office_time"], "08:40");
        assert_eq!(json["employee_id"], "E100");
        assert_eq!(json["status"], "True");
    }

    #[test]
    fn test_upload_response_duplicate() {
        let json = serde_json::to_value(UploadResponse::duplicate("oct.csv".to_string())).unwrap();
        assert_eq!(json["duplicate"], true);
        assert_eq!(json["fileName"], "oct.csv");
        assert_eq!(json["inserted"], 0);
    }

    // ============ AnnotationRequest 테스트 ============

    #[test]
    fn test_annotation_request_parts() {
        let req: AnnotationRequest =
            serde_json::from_str(r#"{"roster_id": 3, "comment": " late badge ", "status": "False"}"#)
                .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.parts().unwrap(), (3, "late badge".to_string(), false));
    }

    #[test]
    fn test_annotation_request_status_defaults_true() {
        let req: AnnotationRequest =
            serde_json::from_str(r#"{"roster_id": 3, "comment": "ok"}"#).unwrap();
        assert!(req.parts().unwrap().2);
    }

    #[test]
    fn test_annotation_request_status_only_true_or_false() {
        let parse = |status: &str| {
            AnnotationRequest {
                roster_id: Some(3),
                comment: Some("ok".to_string()),
                status: Some(status.to_string()),
            }
            .parts()
        };

        assert!(!parse("false").unwrap().2);
        assert!(parse("TRUE").unwrap().2);
        for status in ["yes", "1", "absent", "❌"] {
            assert!(matches!(parse(status), Err(AppError::Validation(_))), "{status}");
        }
    }

    #[test]
    fn test_annotation_request_blank_comment() {
        let req: AnnotationRequest =
            serde_json::from_str(r#"{"roster_id": 3, "comment": "   "}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(matches!(req.parts(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_annotation_request_comment_too_long() {
        let req = AnnotationRequest {
            roster_id: Some(1),
            comment: Some("x".repeat(1001)),
            status: None,
        };
        assert!(req.validate().is_err());
    }
}
