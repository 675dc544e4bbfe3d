//! Property tests for link validation and creation.

use linksync_core::{LinkBuffer, LinkDraft};
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    (
        prop::string::string_regex("[ ]{0,3}").expect("Invalid regex"),
        prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9 _-]{0,30}[A-Za-z0-9]|[A-Za-z0-9]")
            .expect("Invalid regex"),
        prop::string::string_regex("[ ]{0,3}").expect("Invalid regex"),
    )
        .prop_map(|(lead, core, trail)| format!("{lead}{core}{trail}"))
}

fn url_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https")],
        prop::string::string_regex("[a-z][a-z0-9]{0,15}").expect("Invalid regex"),
        prop_oneof![Just("com"), Just("org"), Just("dev")],
        prop::string::string_regex("(/[a-z0-9]{1,8}){0,3}").expect("Invalid regex"),
    )
        .prop_map(|(scheme, host, tld, path)| format!("{scheme}://{host}.{tld}{path}"))
}

proptest! {
    #[test]
    fn valid_drafts_round_trip_through_buffer(
        name in name_strategy(),
        icon in url_strategy(),
        destination in url_strategy(),
        position in prop::option::of(0i64..10_000),
    ) {
        let buffer = LinkBuffer::in_memory();
        let mut draft = LinkDraft::new(name.clone(), format!(" {icon}"), destination.clone());
        draft.position = position;

        let created = buffer.create(draft).unwrap();
        let fetched = buffer.get(&created.id).unwrap();

        prop_assert!(fetched.pending);
        prop_assert!(fetched.active);
        prop_assert_eq!(fetched.name, name.trim());
        prop_assert_eq!(fetched.icon_url, icon);
        prop_assert_eq!(fetched.destination_url, destination);
        prop_assert_eq!(fetched.position, position.unwrap_or(0));
    }

    #[test]
    fn negative_positions_are_rejected(position in i64::MIN..0) {
        let buffer = LinkBuffer::in_memory();
        let draft = LinkDraft::new("n", "https://n.com/i.ico", "https://n.com").with_position(position);

        let err = buffer.create(draft).unwrap_err();
        prop_assert!(err.is_validation());
        prop_assert!(buffer.is_empty());
    }

    #[test]
    fn load_all_is_sorted(positions in prop::collection::vec(0i64..50, 1..20)) {
        let buffer = LinkBuffer::in_memory();
        for (i, p) in positions.iter().enumerate() {
            let draft = LinkDraft::new(format!("l{i}"), "https://l.com/i.ico", "https://l.com")
                .with_position(*p);
            buffer.create(draft).unwrap();
        }

        let listed: Vec<i64> = buffer.load_all().iter().map(|r| r.position).collect();
        let mut expected = positions.clone();
        expected.sort();
        prop_assert_eq!(listed, expected);
    }
}
