//! Meeting lifecycle integration tests.
//!
//! Cover creation with initial schedules, host-only edits, cancellation
//! fan-out through the outbox, soft delete and the detail view.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use chrono::{TimeZone, Utc};
use common::types::UserId;
use meetup_service::errors::MeetupError;
use meetup_service::models::{
    CreateMeetingRequest, MeetingStatus, ParticipantStatus, UpdateMeetingRequest,
};
use meetup_service::services::{ActivityService, MeetingLifecycleService, ParticipationService};
use meetup_test_utils::*;
use sqlx::PgPool;
use uuid::Uuid;

fn create_request(json: serde_json::Value) -> CreateMeetingRequest {
    serde_json::from_value(json).expect("valid create request")
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_meeting_with_schedules(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let request = create_request(serde_json::json!({
        "title": "  Sunday hike  ",
        "category": "outdoors",
        "capacity": 6,
        "auto_approve": true,
        "schedules": [
            { "title": "Trailhead", "date": "2025-05-11T01:00:00Z", "end_time": "2025-05-11T04:00:00Z" },
            { "title": "Lunch", "date": "2025-05-11T04:30:00Z" }
        ]
    }));

    let meeting = MeetingLifecycleService::create(&pool, UserId(host), &request).await?;
    assert_eq!(meeting.title, "Sunday hike");
    assert_eq!(meeting.status, MeetingStatus::Recruiting);
    assert_eq!(meeting.participant_count, 0);
    assert_eq!(meeting.host.user_id, host);
    assert!(meeting.auto_approve);

    let activities = ActivityService::list_activities(&pool, meeting.meeting_id.0).await?;
    assert_eq!(activities.len(), 2);
    assert_eq!(activities[0].title, "Trailhead");
    assert_eq!(
        activities[0].date,
        Utc.with_ymd_and_hms(2025, 5, 11, 1, 0, 0).unwrap()
    );
    assert!(activities.iter().all(|a| a.created_by == UserId(host)));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_meeting_validation(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;

    let request = create_request(serde_json::json!({
        "title": "Tiny", "category": "games", "capacity": 1
    }));
    let result = MeetingLifecycleService::create(&pool, UserId(host), &request).await;
    assert!(matches!(result, Err(MeetupError::BadRequest(_))));

    let request = create_request(serde_json::json!({
        "title": "Ghost", "category": "games", "capacity": 4
    }));
    let result = MeetingLifecycleService::create(&pool, UserId(Uuid::new_v4()), &request).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meetings")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancel_notifies_every_approved_participant(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let meeting = create_meeting(&pool, host, 10).await?;

    let mut approved = Vec::new();
    for i in 0..3 {
        let user = create_user(&pool, &format!("member-{i}")).await?;
        insert_participant(&pool, meeting, user, "APPROVED").await?;
        approved.push(user);
    }
    let pending = create_user(&pool, "pending").await?;
    insert_participant(&pool, meeting, pending, "PENDING").await?;

    let response = MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;
    assert_eq!(response.status, MeetingStatus::Cancelled);
    assert_eq!(response.notified_participants, 3);

    assert_outbox_count(&pool, "MEETING_CANCELLED", 3).await;
    for user in &approved {
        assert_eq!(outbox_count_for(&pool, *user, "MEETING_CANCELLED").await, 1);
    }
    assert_eq!(outbox_count_for(&pool, pending, "MEETING_CANCELLED").await, 0);

    let priorities: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT priority FROM notification_outbox WHERE notification_type = 'MEETING_CANCELLED'",
    )
    .fetch_all(&pool)
    .await?;
    assert_eq!(priorities, vec!["CRITICAL".to_string()]);

    let status: String = sqlx::query_scalar("SELECT status FROM meetings WHERE meeting_id = $1")
        .bind(meeting)
        .fetch_one(&pool)
        .await?;
    assert_eq!(status, "CANCELLED");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_cancel_is_rejected_without_notices(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let meeting = create_meeting(&pool, host, 4).await?;
    let user = create_user(&pool, "member").await?;
    insert_participant(&pool, meeting, user, "APPROVED").await?;

    MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;
    let result = MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await;

    assert!(matches!(result, Err(MeetupError::InvalidState(_))));
    assert_outbox_count(&pool, "MEETING_CANCELLED", 1).await;

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancel_requires_host(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let member = create_user(&pool, "member").await?;
    let meeting = create_meeting(&pool, host, 4).await?;
    insert_participant(&pool, meeting, member, "APPROVED").await?;

    let result = MeetingLifecycleService::cancel(&pool, meeting, UserId(member)).await;
    assert!(matches!(result, Err(MeetupError::Forbidden(_))));
    assert_eq!(total_outbox_count(&pool).await, 0);

    let result = MeetingLifecycleService::cancel(&pool, Uuid::new_v4(), UserId(host)).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancelled_meeting_rejects_applications(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let user = create_user(&pool, "late").await?;
    let meeting = create_meeting(&pool, host, 4).await?;

    MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;

    let result = ParticipationService::apply(&pool, meeting, UserId(user)).await;
    assert!(matches!(result, Err(MeetupError::InvalidState(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancel_rolls_back_when_fan_out_fails(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let meeting = create_meeting(&pool, host, 4).await?;
    for i in 0..2 {
        let user = create_user(&pool, &format!("member-{i}")).await?;
        insert_participant(&pool, meeting, user, "APPROVED").await?;
    }

    sqlx::query(
        r#"
        CREATE FUNCTION reject_outbox_insert() RETURNS trigger AS $$
        BEGIN
            RAISE EXCEPTION 'outbox unavailable';
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE TRIGGER reject_outbox_insert BEFORE INSERT ON notification_outbox \
         FOR EACH ROW EXECUTE FUNCTION reject_outbox_insert()",
    )
    .execute(&pool)
    .await?;

    let result = MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await;
    assert!(matches!(result, Err(MeetupError::Database(_))));

    let status: String = sqlx::query_scalar("SELECT status FROM meetings WHERE meeting_id = $1")
        .bind(meeting)
        .fetch_one(&pool)
        .await?;
    assert_eq!(status, "RECRUITING");
    assert_eq!(total_outbox_count(&pool).await, 0);

    // Once the outbox accepts rows again the host can cancel normally.
    sqlx::query("DROP TRIGGER reject_outbox_insert ON notification_outbox")
        .execute(&pool)
        .await?;
    let response = MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;
    assert_eq!(response.notified_participants, 2);
    assert_outbox_count(&pool, "MEETING_CANCELLED", 2).await;

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancelled_meeting_freezes_admission_decisions(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let meeting = create_meeting(&pool, host, 4).await?;
    let pending = create_user(&pool, "pending").await?;
    let member = create_user(&pool, "member").await?;
    let pending_id = insert_participant(&pool, meeting, pending, "PENDING").await?;
    let member_id = insert_participant(&pool, meeting, member, "APPROVED").await?;

    MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;

    for target in [ParticipantStatus::Approved, ParticipantStatus::Rejected] {
        let result =
            ParticipationService::update_status(&pool, meeting, pending_id, UserId(host), target)
                .await;
        assert!(matches!(result, Err(MeetupError::InvalidState(_))));
    }
    assert_participant_status(&pool, meeting, pending, "PENDING").await;
    assert_eq!(outbox_count_for(&pool, pending, "PARTICIPANT_APPROVED").await, 0);
    assert_eq!(outbox_count_for(&pool, pending, "PARTICIPANT_REJECTED").await, 0);

    // Removing a member is still allowed.
    let kicked = ParticipationService::update_status(
        &pool,
        meeting,
        member_id,
        UserId(host),
        ParticipantStatus::Kicked,
    )
    .await?;
    assert_eq!(kicked.status, ParticipantStatus::Kicked);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_capacity_respects_approved_count(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let meeting = create_meeting(&pool, host, 5).await?;
    for i in 0..3 {
        let user = create_user(&pool, &format!("member-{i}")).await?;
        insert_participant(&pool, meeting, user, "APPROVED").await?;
    }

    let patch = UpdateMeetingRequest {
        capacity: Some(2),
        ..Default::default()
    };
    let result = MeetingLifecycleService::update(&pool, meeting, UserId(host), &patch).await;
    assert!(matches!(result, Err(MeetupError::InvalidState(_))));

    let patch = UpdateMeetingRequest {
        capacity: Some(3),
        title: Some("Bigger table".to_string()),
        ..Default::default()
    };
    let updated = MeetingLifecycleService::update(&pool, meeting, UserId(host), &patch).await?;
    assert_eq!(updated.capacity, 3);
    assert_eq!(updated.title, "Bigger table");
    assert_eq!(updated.participant_count, 3);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_rules(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let other = create_user(&pool, "other").await?;
    let meeting = create_meeting(&pool, host, 4).await?;

    let patch = UpdateMeetingRequest {
        title: Some("Renamed".to_string()),
        ..Default::default()
    };
    let result = MeetingLifecycleService::update(&pool, meeting, UserId(other), &patch).await;
    assert!(matches!(result, Err(MeetupError::Forbidden(_))));

    let cancel_patch = UpdateMeetingRequest {
        status: Some(MeetingStatus::Cancelled),
        ..Default::default()
    };
    let result =
        MeetingLifecycleService::update(&pool, meeting, UserId(host), &cancel_patch).await;
    assert!(matches!(result, Err(MeetupError::BadRequest(_))));

    MeetingLifecycleService::cancel(&pool, meeting, UserId(host)).await?;
    let result = MeetingLifecycleService::update(&pool, meeting, UserId(host), &patch).await;
    assert!(matches!(result, Err(MeetupError::InvalidState(_))));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_rules(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let other = create_user(&pool, "other").await?;
    let recruiting = create_meeting(&pool, host, 4).await?;
    let completed = MeetingSeed::default()
        .with_status("COMPLETED")
        .insert(&pool, host)
        .await?;

    let result = MeetingLifecycleService::delete(&pool, recruiting, UserId(host)).await;
    assert!(matches!(result, Err(MeetupError::InvalidState(_))));

    let result = MeetingLifecycleService::delete(&pool, completed, UserId(other)).await;
    assert!(matches!(result, Err(MeetupError::Forbidden(_))));

    MeetingLifecycleService::delete(&pool, completed, UserId(host)).await?;

    let result = MeetingLifecycleService::find_one(&pool, completed, None).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));
    let result = MeetingLifecycleService::delete(&pool, completed, UserId(host)).await;
    assert!(matches!(result, Err(MeetupError::NotFound(_))));

    // The row stays, only hidden.
    let deleted: bool = sqlx::query_scalar(
        "SELECT deleted_at IS NOT NULL FROM meetings WHERE meeting_id = $1",
    )
    .bind(completed)
    .fetch_one(&pool)
    .await?;
    assert!(deleted);

    MeetingLifecycleService::cancel(&pool, recruiting, UserId(host)).await?;
    MeetingLifecycleService::delete(&pool, recruiting, UserId(host)).await?;

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_one_viewer_flags(pool: PgPool) -> Result<()> {
    let host = create_user(&pool, "host").await?;
    let viewer = create_user(&pool, "viewer").await?;
    let member = create_user(&pool, "member").await?;
    let meeting = create_meeting(&pool, host, 4).await?;
    bookmark_meeting(&pool, viewer, meeting).await?;
    insert_participant(&pool, meeting, viewer, "PENDING").await?;
    insert_participant(&pool, meeting, member, "APPROVED").await?;

    let anonymous = MeetingLifecycleService::find_one(&pool, meeting, None).await?;
    assert!(!anonymous.is_bookmarked);
    assert_eq!(anonymous.participant_status, None);
    assert_eq!(anonymous.meeting.participant_count, 1);
    assert_eq!(anonymous.meeting.host.nickname, "host");

    let detail = MeetingLifecycleService::find_one(&pool, meeting, Some(UserId(viewer))).await?;
    assert!(detail.is_bookmarked);
    assert_eq!(detail.participant_status, Some(ParticipantStatus::Pending));
    assert_eq!(detail.meeting.view_count, 2);

    Ok(())
}
