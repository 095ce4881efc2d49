//! Property-based test generators using proptest.
//!
//! Change streams draw identifiers from small pools so that later records
//! overwrite and delete earlier ones, which is where folding bugs hide.

use proptest::prelude::*;
use reminders_protocol::cloudkit::RawRecord;

use crate::fixtures::{deleted_list_record, list_record, ReminderFixture};

/// Printable text mixing ASCII with multi-byte characters.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 .,!?éüßñ日本語😀]{0,40}").expect("Invalid regex")
}

/// Non-empty printable titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9éü日本😀][a-zA-Z0-9 éü日本😀]{0,30}").expect("Invalid regex")
}

/// List identifiers from a pool of four.
pub fn list_id_strategy() -> impl Strategy<Value = String> {
    (0u8..4).prop_map(|n| format!("List/L{n}"))
}

/// Reminder identifiers from a pool of eight.
pub fn reminder_id_strategy() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|n| format!("Reminder/R{n:02X}"))
}

/// A list upsert or deletion.
pub fn list_change_strategy() -> impl Strategy<Value = RawRecord> {
    prop_oneof![
        3 => (list_id_strategy(), title_strategy()).prop_map(|(id, name)| list_record(&id, &name)),
        1 => list_id_strategy().prop_map(|id| deleted_list_record(&id)),
    ]
}

/// A reminder upsert, hard delete, or soft delete.
pub fn reminder_change_strategy() -> impl Strategy<Value = RawRecord> {
    (
        reminder_id_strategy(),
        title_strategy(),
        list_id_strategy(),
        any::<bool>(),
        prop_oneof![Just(0i64), Just(1), Just(5), Just(9)],
        0u8..8,
    )
        .prop_map(|(id, title, list, completed, priority, kind)| {
            let mut fixture = ReminderFixture::new(&id, &title)
                .in_list(&list)
                .priority(priority);
            if completed {
                fixture = fixture.completed_at(1_700_000_000_000);
            }
            let fixture = match kind {
                0 => fixture.deleted(),
                1 => fixture.soft_deleted(),
                _ => fixture,
            };
            fixture.build()
        })
}

/// Any change record, including types the client ignores.
pub fn change_record_strategy() -> impl Strategy<Value = RawRecord> {
    prop_oneof![
        2 => list_change_strategy(),
        6 => reminder_change_strategy(),
        1 => "[A-Za-z]{1,12}"
            .prop_filter("must not be a known type", |t| {
                !matches!(t.as_str(), "List" | "ReminderList" | "Reminder")
            })
            .prop_map(|record_type| RawRecord {
                record_name: format!("Other/{record_type}"),
                record_type,
                ..RawRecord::default()
            }),
    ]
}

/// A stream of non-empty pages.
pub fn pages_strategy() -> impl Strategy<Value = Vec<Vec<RawRecord>>> {
    prop::collection::vec(prop::collection::vec(change_record_strategy(), 1..8), 1..5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn pages_are_non_empty() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let pages = pages_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(!pages.is_empty());
            assert!(pages.iter().all(|p| !p.is_empty()));
        }
    }

    proptest! {
        #[test]
        fn titles_are_never_blank(title in title_strategy()) {
            prop_assert!(!title.trim().is_empty());
        }
    }
}
