//! Meeting applications: one per user and meeting, decided once, listed by
//! applicant, meeting and creator.

use chrono::{Duration, Utc};
use pioneer_core::meeting::MeetingContent;
use pioneer_core::participation::ParticipationStatus;
use pioneer_core::publication::PageRequest;
use pioneer_core::roles::Role;
use pioneer_core::types::DbId;
use pioneer_db::models::participant::{CreateParticipant, ParticipantReview};
use pioneer_db::models::user::CreateUser;
use pioneer_db::repositories::{MeetingStore, ParticipantRepo, ParticipantScope, UserRepo};
use sqlx::PgPool;

async fn user(pool: &PgPool, email: &str, role: Role) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Someone".to_string(),
            password_hash: "hash".to_string(),
            role,
            company_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn meeting(store: &MeetingStore, creator: DbId, name: &str) -> DbId {
    let start = Utc::now() + Duration::days(7);
    let content = MeetingContent {
        name: name.to_string(),
        description: None,
        cover_image_url: None,
        start_time: start,
        end_time: start + Duration::hours(1),
    };
    store.create_root(creator, &(), &content).await.unwrap().root.id
}

fn application(meeting_id: DbId, user_id: DbId) -> CreateParticipant {
    CreateParticipant {
        meeting_id,
        user_id,
        join_reason: Some("Keen to attend".to_string()),
    }
}

async fn count(
    pool: &PgPool,
    scope: ParticipantScope,
    status: Option<ParticipationStatus>,
) -> i64 {
    ParticipantRepo::list(pool, scope, status, PageRequest::default())
        .await
        .unwrap()
        .1
}

#[sqlx::test(migrations = "./migrations")]
async fn one_application_per_user_and_meeting(pool: PgPool) {
    let creator = user(&pool, "host@example.com", Role::Company).await;
    let guest = user(&pool, "guest@example.com", Role::User).await;
    let store = MeetingStore::new(pool.clone());
    let meeting_id = meeting(&store, creator, "Kickoff").await;

    let first = ParticipantRepo::create(&pool, &application(meeting_id, guest))
        .await
        .unwrap();
    assert_eq!(first.status, ParticipationStatus::Pending);
    assert_eq!(first.join_reason.as_deref(), Some("Keen to attend"));

    let err = ParticipantRepo::create(&pool, &application(meeting_id, guest))
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("uq_meeting_participants_pair"));
}

#[sqlx::test(migrations = "./migrations")]
async fn applications_are_decided_once(pool: PgPool) {
    let creator = user(&pool, "host@example.com", Role::Company).await;
    let guest = user(&pool, "guest@example.com", Role::User).await;
    let store = MeetingStore::new(pool.clone());
    let meeting_id = meeting(&store, creator, "Kickoff").await;
    let pending = ParticipantRepo::create(&pool, &application(meeting_id, guest))
        .await
        .unwrap();

    let approve = ParticipantReview {
        status: ParticipationStatus::Approved,
        comment: Some("Welcome".to_string()),
        reviewer_id: creator,
    };
    let decided = ParticipantRepo::review(&pool, pending.id, &approve)
        .await
        .unwrap()
        .expect("pending application should be decided");
    assert_eq!(decided.status, ParticipationStatus::Approved);
    assert_eq!(decided.reviewed_by, Some(creator));
    assert!(decided.reviewed_at.is_some());

    let reject = ParticipantReview {
        status: ParticipationStatus::Rejected,
        comment: None,
        reviewer_id: creator,
    };
    assert!(ParticipantRepo::review(&pool, pending.id, &reject)
        .await
        .unwrap()
        .is_none());

    let stored = ParticipantRepo::find(&pool, meeting_id, pending.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ParticipationStatus::Approved);
    assert_eq!(stored.review_comment.as_deref(), Some("Welcome"));

    // The application belongs to its own meeting only.
    assert!(ParticipantRepo::find(&pool, meeting_id + 1, pending.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn listings_follow_the_scope(pool: PgPool) {
    let creator = user(&pool, "host@example.com", Role::Company).await;
    let other_creator = user(&pool, "rival@example.com", Role::Company).await;
    let alice = user(&pool, "alice@example.com", Role::User).await;
    let bob = user(&pool, "bob@example.com", Role::User).await;
    let store = MeetingStore::new(pool.clone());
    let kickoff = meeting(&store, creator, "Kickoff").await;
    let retro = meeting(&store, creator, "Retro").await;
    let elsewhere = meeting(&store, other_creator, "Elsewhere").await;

    for (meeting_id, user_id) in [(kickoff, alice), (kickoff, bob), (retro, alice), (elsewhere, bob)] {
        ParticipantRepo::create(&pool, &application(meeting_id, user_id))
            .await
            .unwrap();
    }
    let bob_kickoff = ParticipantRepo::list(
        &pool,
        ParticipantScope::Applicant(bob),
        None,
        PageRequest::default(),
    )
    .await
    .unwrap()
    .0
    .into_iter()
    .find(|p| p.meeting_id == kickoff)
    .unwrap();
    ParticipantRepo::review(
        &pool,
        bob_kickoff.id,
        &ParticipantReview {
            status: ParticipationStatus::Rejected,
            comment: None,
            reviewer_id: creator,
        },
    )
    .await
    .unwrap();

    assert_eq!(count(&pool, ParticipantScope::Meeting(kickoff), None).await, 2);
    assert_eq!(count(&pool, ParticipantScope::Creator(creator), None).await, 3);
    assert_eq!(
        count(&pool, ParticipantScope::Creator(creator), Some(ParticipationStatus::Pending)).await,
        2
    );
    assert_eq!(count(&pool, ParticipantScope::Applicant(alice), None).await, 2);
    assert_eq!(
        count(&pool, ParticipantScope::Applicant(bob), Some(ParticipationStatus::Rejected)).await,
        1
    );

    // Applications to a deleted meeting drop out of every listing.
    store.soft_delete_root(retro).await.unwrap();
    assert_eq!(count(&pool, ParticipantScope::Creator(creator), None).await, 2);
    assert_eq!(count(&pool, ParticipantScope::Applicant(alice), None).await, 1);
}
