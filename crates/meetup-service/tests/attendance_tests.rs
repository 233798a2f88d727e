//! Attendance and calendar integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use common::types::{ActivityId, UserId};
use meetup_service::errors::MeetupError;
use meetup_service::models::{AttendanceStatus, CalendarQuery, CreateActivityRequest};
use meetup_service::services::{ActivityService, AttendanceService};
use meetup_test_utils::*;
use sqlx::PgPool;
use uuid::Uuid;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

async fn attendance_rows(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM activity_attendances WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A host, an approved member and two meetings the member belongs to.
struct World {
    host: Uuid,
    member: Uuid,
    hike: Uuid,
    dinner: Uuid,
}

async fn world(pool: &PgPool) -> Result<World> {
    let host = create_user(pool, "host").await?;
    let member = create_user(pool, "member").await?;
    let hike = MeetingSeed::default().with_title("Hiking club").insert(pool, host).await?;
    let dinner = MeetingSeed::default().with_title("Supper club").insert(pool, host).await?;
    insert_participant(pool, hike, member, "APPROVED").await?;
    insert_participant(pool, dinner, member, "APPROVED").await?;
    Ok(World {
        host,
        member,
        hike,
        dinner,
    })
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_conflict_reported_and_nothing_written(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let morning = create_activity(&pool, w.hike, w.host, "Ridge walk", at(10, 9), Some(at(10, 12))).await?;
    let brunch = create_activity(&pool, w.dinner, w.host, "Brunch", at(10, 11), None).await?;
    set_attendance(&pool, morning, w.member, "ATTENDING").await?;

    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        brunch,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;

    assert!(outcome.has_conflict);
    assert!(outcome.attendance.is_none());
    assert_eq!(outcome.conflicts.len(), 1);
    let conflict = &outcome.conflicts[0];
    assert_eq!(conflict.activity_id, ActivityId(morning));
    assert_eq!(conflict.activity_title, "Ridge walk");
    assert_eq!(conflict.meeting_title, "Hiking club");
    assert_eq!(conflict.start, at(10, 9));
    assert_eq!(conflict.end, at(10, 12));

    assert_eq!(attendance_rows(&pool, w.member).await, 1);

    // Confirming writes regardless of the conflict.
    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        brunch,
        UserId(w.member),
        AttendanceStatus::Attending,
        true,
    )
    .await?;
    assert!(!outcome.has_conflict);
    let attendance = outcome.attendance.unwrap();
    assert_eq!(attendance.status, AttendanceStatus::Attending);
    assert_eq!(attendance_rows(&pool, w.member).await, 2);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_open_ended_activity_blocks_its_whole_day(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let festival = create_activity(&pool, w.hike, w.host, "Festival", at(10, 8), None).await?;
    set_attendance(&pool, festival, w.member, "ATTENDING").await?;

    let late = create_activity(&pool, w.dinner, w.host, "Late supper", at(10, 21), Some(at(10, 23))).await?;
    let next_day = create_activity(&pool, w.dinner, w.host, "Breakfast", at(11, 7), Some(at(11, 8))).await?;

    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        late,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(outcome.has_conflict);
    assert_eq!(outcome.conflicts[0].end, at(11, 0));

    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        next_day,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_local_day_follows_calendar_offset(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    // 2025-06-10 20:00 UTC is 2025-06-11 05:00 at UTC+9.
    let festival = create_activity(&pool, w.hike, w.host, "Festival", at(10, 20), None).await?;
    set_attendance(&pool, festival, w.member, "ATTENDING").await?;
    // 2025-06-11 10:00 UTC is 19:00 the same local day at UTC+9.
    let evening = create_activity(&pool, w.dinner, w.host, "Evening", at(11, 10), Some(at(11, 11))).await?;

    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        evening,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict);

    let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
    let outcome = AttendanceService::update_attendance(
        &pool,
        seoul,
        evening,
        UserId(w.member),
        AttendanceStatus::Maybe,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict, "only ATTENDING is checked");

    let outcome = AttendanceService::update_attendance(
        &pool,
        seoul,
        evening,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(outcome.has_conflict);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_adjacent_activities_do_not_conflict(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let first = create_activity(&pool, w.hike, w.host, "Morning", at(10, 9), Some(at(10, 11))).await?;
    set_attendance(&pool, first, w.member, "ATTENDING").await?;
    // No end: defaults to two hours, 11:00-13:00.
    let second = create_activity(&pool, w.dinner, w.host, "Noon", at(10, 11), None).await?;

    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        second,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deleted_meeting_activities_ignored(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let old = create_activity(&pool, w.hike, w.host, "Ridge walk", at(10, 9), Some(at(10, 12))).await?;
    set_attendance(&pool, old, w.member, "ATTENDING").await?;
    sqlx::query("UPDATE meetings SET deleted_at = NOW() WHERE meeting_id = $1")
        .bind(w.hike)
        .execute(&pool)
        .await?;

    let brunch = create_activity(&pool, w.dinner, w.host, "Brunch", at(10, 10), None).await?;
    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        brunch,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancelled_meeting_activities_ignored(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let old = create_activity(&pool, w.hike, w.host, "Ridge walk", at(10, 9), Some(at(10, 12))).await?;
    set_attendance(&pool, old, w.member, "ATTENDING").await?;
    set_meeting_status(&pool, w.hike, "CANCELLED").await?;

    let brunch = create_activity(&pool, w.dinner, w.host, "Brunch", at(10, 10), None).await?;
    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        brunch,
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await?;
    assert!(!outcome.has_conflict);
    assert!(outcome.conflicts.is_empty());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_attendance_requires_membership(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let outsider = create_user(&pool, "outsider").await?;
    let pending = create_user(&pool, "pending").await?;
    insert_participant(&pool, w.hike, pending, "PENDING").await?;
    let activity = create_activity(&pool, w.hike, w.host, "Ridge walk", at(10, 9), None).await?;

    for user in [outsider, pending] {
        let result = AttendanceService::update_attendance(
            &pool,
            utc(),
            activity,
            UserId(user),
            AttendanceStatus::Attending,
            true,
        )
        .await;
        assert!(matches!(result, Err(MeetupError::Forbidden(_))));
    }

    // The host responds without a participant record.
    let outcome = AttendanceService::update_attendance(
        &pool,
        utc(),
        activity,
        UserId(w.host),
        AttendanceStatus::NotAttending,
        false,
    )
    .await?;
    assert!(outcome.attendance.is_some());

    let result = AttendanceService::update_attendance(
        &pool,
        utc(),
        Uuid::new_v4(),
        UserId(w.member),
        AttendanceStatus::Attending,
        false,
    )
    .await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_response_is_overwritten(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let activity = create_activity(&pool, w.hike, w.host, "Ridge walk", at(10, 9), None).await?;

    for status in [
        AttendanceStatus::Maybe,
        AttendanceStatus::Attending,
        AttendanceStatus::NotAttending,
    ] {
        let outcome = AttendanceService::update_attendance(
            &pool,
            utc(),
            activity,
            UserId(w.member),
            status,
            false,
        )
        .await?;
        assert_eq!(outcome.attendance.unwrap().status, status);
    }
    assert_eq!(attendance_rows(&pool, w.member).await, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_activity_permissions(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let outsider = create_user(&pool, "outsider").await?;
    let request = CreateActivityRequest {
        title: "Picnic".to_string(),
        date: at(12, 12),
        end_time: Some(at(12, 14)),
        location: Some("Riverside".to_string()),
        image_urls: vec!["https://img.example.com/picnic.png".to_string()],
    };

    let created =
        ActivityService::create_activity(&pool, w.hike, UserId(w.member), &request).await?;
    assert_eq!(created.created_by, UserId(w.member));
    assert_eq!(created.location, "Riverside");
    assert_eq!(created.image_urls.len(), 1);

    let result = ActivityService::create_activity(&pool, w.hike, UserId(outsider), &request).await;
    assert!(matches!(result, Err(MeetupError::Forbidden(_))));

    let result =
        ActivityService::create_activity(&pool, Uuid::new_v4(), UserId(w.host), &request).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    let result = ActivityService::list_activities(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_calendar_range(pool: PgPool) -> Result<()> {
    let w = world(&pool).await?;
    let early = create_activity(&pool, w.hike, w.host, "Early", at(2, 9), None).await?;
    let middle = create_activity(&pool, w.dinner, w.host, "Middle", at(15, 18), None).await?;
    let skipped = create_activity(&pool, w.hike, w.host, "Skipped", at(16, 9), None).await?;
    let july = create_activity(
        &pool,
        w.hike,
        w.host,
        "July",
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap(),
        None,
    )
    .await?;
    for activity in [early, middle, july] {
        set_attendance(&pool, activity, w.member, "ATTENDING").await?;
    }
    set_attendance(&pool, skipped, w.member, "NOT_ATTENDING").await?;

    let june = CalendarQuery {
        start: Some(at(1, 0)),
        end: Some(Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap()),
    };
    let events =
        AttendanceService::my_calendar_events(&pool, utc(), UserId(w.member), &june).await?;
    let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Early", "Middle"]);
    assert_eq!(events[1].meeting_title, "Supper club");

    // Only a start: the range runs to the end of that month.
    let from_mid_june = CalendarQuery {
        start: Some(at(10, 0)),
        end: None,
    };
    let events =
        AttendanceService::my_calendar_events(&pool, utc(), UserId(w.member), &from_mid_june)
            .await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].activity_id, ActivityId(middle));

    let inverted = CalendarQuery {
        start: Some(at(20, 0)),
        end: Some(at(10, 0)),
    };
    let result =
        AttendanceService::my_calendar_events(&pool, utc(), UserId(w.member), &inverted).await;
    assert!(matches!(result, Err(MeetupError::BadRequest(_))));

    Ok(())
}
