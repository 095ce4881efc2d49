//! Sync and write flows against a scripted transport.

use std::sync::Arc;

use proptest::prelude::*;

use reminders_protocol::time::{now_millis, timestamp_to_date};
use reminders_storage::{FileBackend, InMemoryBackend, RecordCache};
use reminders_sync_engine::folding::fold_records;
use reminders_sync_engine::{
    MockTransport, NewReminder, SyncConfig, SyncEngine, WriteError, Writer,
};
use reminders_testkit::prelude::*;

fn transport() -> MockTransport {
    let transport = MockTransport::new();
    transport.set_owner("_owner");
    transport
}

fn without_stamp(mut cache: RecordCache) -> RecordCache {
    cache.updated_at = None;
    cache
}

#[test]
fn buy_milk_end_to_end() {
    let transport = transport();
    transport.set_page(
        None,
        change_page(vec![list_record("List/SHOP", "Shopping")], "t1", false),
    );
    let engine = Arc::new(SyncEngine::new(
        SyncConfig::default(),
        transport,
        InMemoryBackend::new(),
    ));
    engine.sync(false).unwrap();

    let writer = Writer::new(Arc::clone(&engine));
    let created = writer
        .create(NewReminder::new("Buy milk").with_list("Shopping"))
        .unwrap();

    let cached = engine.get_reminder(&created.id).unwrap();
    assert_eq!(cached.title(), "Buy milk");
    assert_eq!(cached.list_name, "Shopping");
    assert!(!cached.is_completed());
    assert!(cached.record.change_tag.is_some());

    let done = writer.complete(created.short_id()).unwrap();
    assert!(done.is_completed());
    assert_eq!(done.record.completion_date, timestamp_to_date(now_millis()));
    assert!(engine.get_reminders(false).is_empty());
    assert_eq!(engine.get_reminders(true).len(), 1);
}

#[test]
fn untagged_reminder_is_stale() {
    let transport = transport();
    transport.set_page(
        None,
        change_page(
            vec![ReminderFixture::new("Reminder/NOTAG", "Old").tag(None).build()],
            "t1",
            false,
        ),
    );
    let engine = Arc::new(SyncEngine::new(
        SyncConfig::default(),
        transport,
        InMemoryBackend::new(),
    ));
    engine.sync(false).unwrap();
    let writer = Writer::new(Arc::clone(&engine));

    let complete = writer.complete("notag").unwrap_err();
    let delete = writer.delete("notag").unwrap_err();
    for err in [complete, delete] {
        assert!(matches!(err, WriteError::MissingChangeTag { .. }));
        assert!(err.to_string().contains("try running 'sync' first"));
    }
    assert!(engine.transport().modify_calls().is_empty());
}

#[test]
fn rejection_leaves_cache_and_file_untouched() {
    let transport = transport();
    transport.set_page(
        None,
        change_page(vec![ReminderFixture::new("Reminder/A1", "Walk").build()], "t1", false),
    );
    transport.push_modify_response(rejected("Reminder/A1", "CONFLICT", "record changed"));
    let engine = Arc::new(SyncEngine::new(
        SyncConfig::default(),
        transport,
        InMemoryBackend::new(),
    ));
    engine.sync(false).unwrap();
    let before = engine.cache();
    let writes = engine.store().backend().write_count();

    let err = Writer::new(Arc::clone(&engine)).complete("a1").unwrap_err();
    match err {
        WriteError::Rejected { code, reason } => {
            assert_eq!(code, "CONFLICT");
            assert_eq!(reason, "record changed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.cache(), before);
    assert_eq!(engine.store().backend().write_count(), writes);
}

#[test]
fn server_deletion_after_local_create() {
    let transport = Arc::new(transport());
    transport.set_page(
        None,
        change_page(vec![list_record("List/IN", "Inbox")], "t1", false),
    );
    let engine = Arc::new(SyncEngine::new(
        SyncConfig::default(),
        Arc::clone(&transport),
        InMemoryBackend::new(),
    ));
    engine.sync(false).unwrap();
    let created = Writer::new(Arc::clone(&engine))
        .create(NewReminder::new("Temp").with_list("inbox"))
        .unwrap();
    assert_eq!(created.list_name, "Inbox");

    transport.set_page(
        Some("t1"),
        change_page(
            vec![ReminderFixture::new(&created.id, "Temp").deleted().build()],
            "t2",
            false,
        ),
    );
    engine.sync(false).unwrap();
    assert!(engine.get_reminder(&created.id).is_none());
}

#[test]
fn cache_survives_restart() {
    let config = TempConfig::new();
    let transport = Arc::new(transport());
    transport.set_page(
        None,
        change_page(
            vec![
                list_record("List/W", "Work"),
                ReminderFixture::new("Reminder/X", "Report")
                    .in_list("List/W")
                    .due(1_710_460_800_000)
                    .notes("quarterly")
                    .build(),
            ],
            "t1",
            false,
        ),
    );

    let first = SyncEngine::new(
        SyncConfig::default(),
        Arc::clone(&transport),
        FileBackend::new(&config.paths.cache_file()),
    );
    first.sync(false).unwrap();

    let second = SyncEngine::new(
        SyncConfig::default(),
        Arc::clone(&transport),
        FileBackend::new(&config.paths.cache_file()),
    );
    assert_eq!(second.cache(), first.cache());
    let reminder = second.get_reminder("Reminder/X").unwrap();
    assert_eq!(reminder.list_name, "Work");
    assert_eq!(reminder.record.due.as_deref(), Some("2024-03-15"));
    assert_eq!(reminder.record.notes.as_deref(), Some("quarterly"));

    transport.clear_calls();
    let result = second.sync(false).unwrap();
    assert!(!result.full);
    assert_eq!(transport.calls().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn folding_twice_equals_once(pages in pages_strategy()) {
        for page in &pages {
            let mut once = RecordCache::new();
            fold_records(&mut once, page);
            let mut twice = once.clone();
            fold_records(&mut twice, page);
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn full_sync_equals_delta_syncs(pages in pages_strategy()) {
        let tokens: Vec<String> = (1..=pages.len()).map(|i| format!("t{i}")).collect();

        let full_transport = transport();
        let mut previous: Option<&str> = None;
        for (i, page) in pages.iter().enumerate() {
            let more = i + 1 < pages.len();
            full_transport.set_page(previous, change_page(page.clone(), &tokens[i], more));
            previous = Some(&tokens[i]);
        }
        let full = SyncEngine::new(SyncConfig::default(), full_transport, InMemoryBackend::new());
        let result = full.sync(false).unwrap();
        prop_assert_eq!(result.pages as usize, pages.len());

        let config = TempConfig::new();
        let delta_transport = Arc::new(transport());
        let mut previous: Option<&str> = None;
        for (i, page) in pages.iter().enumerate() {
            delta_transport.set_page(previous, change_page(page.clone(), &tokens[i], false));
            previous = Some(&tokens[i]);
        }
        for _ in &pages {
            let engine = SyncEngine::new(
                SyncConfig::default(),
                Arc::clone(&delta_transport),
                FileBackend::new(&config.paths.cache_file()),
            );
            engine.sync(false).unwrap();
        }
        let delta = SyncEngine::new(
            SyncConfig::default(),
            Arc::clone(&delta_transport),
            FileBackend::new(&config.paths.cache_file()),
        );

        prop_assert_eq!(without_stamp(full.cache()), without_stamp(delta.cache()));
    }
}
