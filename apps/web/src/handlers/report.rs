//! Sales report endpoint (admin only).
//!
//! `GET /api/reports/` covers all time. `?start=YYYY-MM-DD&end=YYYY-MM-DD`
//! restricts the sales and service sums to that inclusive range; the daily
//! and month-to-date rollups ignore it.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tally_core::validation::{parse_date, ValidationErrors};
use tally_core::{Requirement, ValidationError};
use tally_db::{DateRange, SalesReport};

use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ReportQuery {
    /// Both bounds or neither; `start` must not be after `end`.
    fn range(&self) -> Result<Option<DateRange>, ValidationErrors> {
        let start = self.start.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let end = self.end.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut errors = ValidationErrors::new();
        let range = match (start, end) {
            (None, None) => return Ok(None),
            (Some(start), Some(end)) => {
                let start = errors.check(parse_date("start", start));
                let end = errors.check(parse_date("end", end));
                start.zip(end)
            }
            (Some(_), None) => {
                errors.push(ValidationError::Required {
                    field: "end".to_string(),
                });
                None
            }
            (None, Some(_)) => {
                errors.push(ValidationError::Required {
                    field: "start".to_string(),
                });
                None
            }
        };

        match range {
            Some((start, end)) if start > end => {
                errors.push(ValidationError::InvalidFormat {
                    field: "end".to_string(),
                    reason: "must not be before start".to_string(),
                });
                Err(errors)
            }
            Some((start, end)) => Ok(Some(DateRange { start, end })),
            None => Err(errors),
        }
    }
}

/// `GET /api/reports/`
pub async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<SalesReport>> {
    user.require(Requirement::Admin)?;

    let range = query.range()?;
    let report = state.db.reports().summary(range, Utc::now().date_naive()).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn query(start: Option<&str>, end: Option<&str>) -> ReportQuery {
        ReportQuery {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    #[test]
    fn test_no_range() {
        assert_eq!(query(None, None).range().unwrap(), None);
        assert_eq!(query(Some(""), Some(" ")).range().unwrap(), None);
    }

    #[test]
    fn test_inclusive_range() {
        let range = query(Some("2026-03-01"), Some("2026-03-31")).range().unwrap().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());

        assert!(query(Some("2026-03-05"), Some("2026-03-05")).range().is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        let half = query(Some("2026-03-01"), None).range().unwrap_err();
        assert_eq!(half.iter().next().map(|e| e.field()), Some("end"));

        let reversed = query(Some("2026-03-31"), Some("2026-03-01")).range().unwrap_err();
        assert_eq!(reversed.len(), 1);

        let garbled = query(Some("March"), Some("2026-03-01")).range().unwrap_err();
        assert_eq!(garbled.iter().next().map(|e| e.field()), Some("start"));
    }
}
