//! Subscription engine: snapshot delivery, kind routing, cancellation.

use fitlab_core::live::queries::{
    observe_athletes, observe_athletes_by_sport, observe_unread_conversations,
};
use fitlab_core::repo::athlete_repo::SqliteAthleteRepository;
use fitlab_core::repo::message_repo::SqliteConversationRepository;
use fitlab_core::repo::opportunity_repo::SqliteOpportunityRepository;
use fitlab_core::{Athlete, CacheDb, Conversation, Message, MessageService, Opportunity, OpportunityType};
use std::sync::Arc;

fn open_cache() -> Arc<CacheDb> {
    CacheDb::open_in_memory().expect("in-memory cache should open")
}

#[test]
fn subscription_starts_with_current_snapshot() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");
    repo.put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("seed");

    let live = observe_athletes(&db).expect("subscribe");
    let first = live.try_recv().expect("initial snapshot is queued");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "a1");
}

#[test]
fn mutation_pushes_fresh_snapshot_before_returning() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    let live = observe_athletes(&db).expect("subscribe");
    let initial = live.try_recv().expect("initial snapshot");
    assert!(initial.is_empty());

    repo.put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("put");

    // Synchronous contract: the snapshot is already queued once put returns.
    let updated = live.try_recv().expect("post-mutation snapshot");
    assert_eq!(updated.len(), 1);
}

#[test]
fn snapshots_are_filtered_and_ordered() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    let live = observe_athletes_by_sport(&db, "Track").expect("subscribe");
    let _ = live.try_recv();

    repo.put_athletes(&[
        Athlete::new("a1", "Zoe", 20, "Track", "Austin"),
        Athlete::new("a2", "Ana", 22, "Track", "Denver"),
        Athlete::new("a3", "Ben", 23, "Swimming", "Austin"),
    ])
    .expect("seed");

    let snapshot = live.try_recv().expect("snapshot after batch");
    let names: Vec<String> = snapshot.into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Ana", "Zoe"]);
}

#[test]
fn unrelated_kinds_do_not_trigger_delivery() {
    let db = open_cache();
    let athletes = SqliteAthleteRepository::try_new(&db).expect("repo");
    let opportunities = SqliteOpportunityRepository::try_new(&db).expect("repo");

    let live = observe_athletes(&db).expect("subscribe");
    let _ = live.try_recv();

    opportunities
        .put_opportunity(&Opportunity::new(
            "o1",
            "Trial",
            OpportunityType::Trial,
            "Track",
            "Austin",
            5_000,
        ))
        .expect("unrelated mutation");
    assert!(live.try_recv().is_none(), "opportunity write must not wake athlete query");

    athletes
        .put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("related mutation");
    assert!(live.try_recv().is_some());
}

#[test]
fn message_traffic_refreshes_unread_conversations() {
    let db = open_cache();
    let conversations = SqliteConversationRepository::try_new(&db).expect("repo");
    let service = MessageService::try_new(&db).expect("service");

    conversations
        .put_conversation(&Conversation::new("c1", vec!["a1".into(), "a2".into()]))
        .expect("seed conversation");

    let live = observe_unread_conversations(&db).expect("subscribe");
    assert!(live.try_recv().expect("initial").is_empty());

    service
        .send_message(&Message::text("m1", "c1", "a1", "a2", "hi", 100))
        .expect("send");

    // send_message may notify per touched kind; the last snapshot wins.
    let mut latest = None;
    while let Some(snapshot) = live.try_recv() {
        latest = Some(snapshot);
    }
    let snapshot = latest.expect("delivery after send");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].unread_count, 1);
}

#[test]
fn cancelled_subscription_stops_receiving() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    let live = observe_athletes(&db).expect("subscribe");
    let _ = live.try_recv();
    assert_eq!(db.live_query_count(), 1);

    live.cancel();
    repo.put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("put after cancel");

    assert!(live.try_recv().is_none(), "no delivery after cancel");
    // Cancelled registrations are reaped during the notification pass.
    assert_eq!(db.live_query_count(), 0);
}

#[test]
fn dropping_the_handle_cancels_the_subscription() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    {
        let _live = observe_athletes(&db).expect("subscribe");
        assert_eq!(db.live_query_count(), 1);
    }

    repo.put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("put after drop");
    assert_eq!(db.live_query_count(), 0);
}

#[test]
fn each_subscriber_gets_its_own_stream() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    let first = observe_athletes(&db).expect("subscribe first");
    let second = observe_athletes(&db).expect("subscribe second");
    let _ = first.try_recv();
    let _ = second.try_recv();
    assert_ne!(first.id(), second.id());

    repo.put_athlete(&Athlete::new("a1", "Ana", 20, "Track", "Austin"))
        .expect("put");

    assert_eq!(first.try_recv().expect("first stream").len(), 1);
    assert_eq!(second.try_recv().expect("second stream").len(), 1);
}
