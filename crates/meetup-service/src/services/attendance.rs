//! Attendance responses and schedule conflict detection.
//!
//! # Intervals
//!
//! - The candidate activity occupies `[date, end_time]`, or two hours from
//!   `date` when it has no end time.
//! - An existing ATTENDING activity with an end time occupies `[date, end_time]`.
//! - An existing activity without an end time occupies its whole local
//!   calendar day `[00:00, next 00:00)`, with days cut at the configured
//!   calendar offset.
//!
//! Two intervals conflict iff `existing.start < candidate.end` and
//! `existing.end > candidate.start`, so intervals that only share a boundary
//! instant do not conflict.

use crate::errors::MeetupError;
use crate::models::{
    AttendanceOutcome, AttendanceStatus, AttendingActivityRow, CalendarEvent, CalendarQuery,
    ScheduleConflict,
};
use crate::observability::metrics;
use crate::repositories::{ActivitiesRepository, AttendancesRepository};
use crate::services::access::ensure_host_or_member;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use common::types::{ActivityId, MeetingId, UserId};
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Assumed length of a candidate activity without an end time.
const DEFAULT_ACTIVITY_HOURS: i64 = 2;

/// A time span used for overlap tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Interval of the activity the user wants to attend.
pub fn candidate_interval(date: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Interval {
    Interval {
        start: date,
        end: end_time.unwrap_or(date + Duration::hours(DEFAULT_ACTIVITY_HOURS)),
    }
}

/// Interval an already-attended activity blocks out.
pub fn existing_interval(
    date: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> Interval {
    match end_time {
        Some(end) => Interval { start: date, end },
        None => {
            let day = date.with_timezone(&offset).date_naive();
            let start = local_midnight(day, offset);
            Interval {
                start,
                end: start + Duration::days(1),
            }
        }
    }
}

/// Conflicting activities, ordered by start time.
pub fn find_conflicts(
    candidate: Interval,
    attending: &[AttendingActivityRow],
    offset: FixedOffset,
) -> Vec<ScheduleConflict> {
    let mut conflicts: Vec<ScheduleConflict> = attending
        .iter()
        .filter_map(|row| {
            let existing = existing_interval(row.starts_at, row.ends_at, offset);
            existing.overlaps(&candidate).then(|| ScheduleConflict {
                activity_id: ActivityId(row.activity_id),
                activity_title: row.title.clone(),
                meeting_id: MeetingId(row.meeting_id),
                meeting_title: row.meeting_title.clone(),
                start: row.starts_at,
                end: existing.end,
            })
        })
        .collect();

    conflicts.sort_by(|a, b| a.start.cmp(&b.start).then(a.activity_id.cmp(&b.activity_id)));
    conflicts
}

/// First and last instant of the calendar month containing `now`.
pub fn default_month_range(
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MeetupError> {
    let local = now.with_timezone(&offset);
    let (next_year, next_month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };

    let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1).ok_or(MeetupError::Internal)?;
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or(MeetupError::Internal)?;

    Ok((
        local_midnight(first, offset),
        local_midnight(next, offset) - Duration::microseconds(1),
    ))
}

/// Inclusive calendar range for a query.
///
/// A missing bound is taken from the month of the other bound, or from the
/// current month when both are missing.
pub fn resolve_range(
    query: &CalendarQuery,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MeetupError> {
    let (start, end) = match (query.start, query.end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, default_month_range(start, offset)?.1),
        (None, Some(end)) => (default_month_range(end, offset)?.0, end),
        (None, None) => default_month_range(now, offset)?,
    };

    if start > end {
        return Err(MeetupError::BadRequest(
            "start must not be after end".to_string(),
        ));
    }
    Ok((start, end))
}

fn local_midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    (naive - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

pub struct AttendanceService;

impl AttendanceService {
    /// Record the caller's response to an activity.
    ///
    /// An unconfirmed ATTENDING response is checked against the caller's other
    /// ATTENDING activities first. On conflict nothing is written and the
    /// outcome lists the conflicts.
    #[instrument(skip_all, name = "meetup.service.update_attendance", fields(activity_id = %activity_id, user_id = %user_id, status = ?status))]
    pub async fn update_attendance(
        pool: &PgPool,
        offset: FixedOffset,
        activity_id: Uuid,
        user_id: UserId,
        status: AttendanceStatus,
        confirmed: bool,
    ) -> Result<AttendanceOutcome, MeetupError> {
        let context = ActivitiesRepository::find_with_meeting(pool, activity_id)
            .await?
            .ok_or_else(|| MeetupError::NotFound("Activity not found".to_string()))?;
        ensure_host_or_member(
            pool,
            context.activity.meeting_id,
            context.meeting_host_id,
            user_id,
        )
        .await?;

        if status == AttendanceStatus::Attending && !confirmed {
            let attending =
                AttendancesRepository::list_other_attending(pool, user_id.0, activity_id).await?;
            let candidate =
                candidate_interval(context.activity.starts_at, context.activity.ends_at);
            let conflicts = find_conflicts(candidate, &attending, offset);

            if !conflicts.is_empty() {
                metrics::record_attendance_conflict();
                debug!(
                    target: "meetup.services.attendance",
                    activity_id = %activity_id,
                    user_id = %user_id,
                    conflicts = conflicts.len(),
                    "Attendance not recorded: schedule conflict"
                );
                return Ok(AttendanceOutcome {
                    has_conflict: true,
                    conflicts,
                    attendance: None,
                });
            }
        }

        let row = AttendancesRepository::upsert(pool, activity_id, user_id.0, status).await?;

        info!(
            target: "meetup.services.attendance",
            activity_id = %activity_id,
            user_id = %user_id,
            status = status.as_db_str(),
            confirmed,
            "Attendance recorded"
        );

        Ok(AttendanceOutcome {
            has_conflict: false,
            conflicts: Vec::new(),
            attendance: Some(row.into_response()?),
        })
    }

    /// ATTENDING activities whose start falls inside the requested range.
    #[instrument(skip_all, name = "meetup.service.calendar_events", fields(user_id = %user_id))]
    pub async fn my_calendar_events(
        pool: &PgPool,
        offset: FixedOffset,
        user_id: UserId,
        query: &CalendarQuery,
    ) -> Result<Vec<CalendarEvent>, MeetupError> {
        let (start, end) = resolve_range(query, Utc::now(), offset)?;
        let rows = AttendancesRepository::list_calendar_events(pool, user_id.0, start, end).await?;
        Ok(rows.into_iter().map(CalendarEvent::from).collect())
    }
}
