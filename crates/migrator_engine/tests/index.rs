mod support;

use std::collections::HashSet;

use migrator_engine::{
    index_conversations, Dialog, DialogKind, IndexError, IndexSettings, PlatformError,
    PlatformErrorKind,
};
use pretty_assertions::assert_eq;
use support::FakeConnection;

fn dialog(id: i64, kind: DialogKind, name: &str) -> Dialog {
    Dialog {
        id,
        kind,
        name: name.to_string(),
        peer: format!("peer-{id}"),
    }
}

#[tokio::test]
async fn every_supported_conversation_gets_a_unique_label() {
    let connection = FakeConnection::new().with_dialogs(vec![
        dialog(10, DialogKind::User, "Alice"),
        dialog(-200, DialogKind::Group, "Family"),
        dialog(-300, DialogKind::Channel, "News"),
        dialog(11, DialogKind::User, "Alice"),
    ]);

    let handles = index_conversations(&connection, &IndexSettings::default())
        .await
        .unwrap();

    let labels: Vec<&str> = handles.iter().map(|handle| handle.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "👤 Alice (ID: 10)",
            "👥 Family (ID: -200)",
            "📢 News (ID: -300)",
            "👤 Alice (ID: 11)",
        ]
    );
    let unique: HashSet<&str> = labels.iter().copied().collect();
    assert_eq!(unique.len(), labels.len());
    for handle in &handles {
        assert!(handle.label.contains(&handle.id.to_string()));
    }
}

#[tokio::test]
async fn blank_names_fall_back_to_placeholder() {
    let connection =
        FakeConnection::new().with_dialogs(vec![dialog(42, DialogKind::User, "   ")]);

    let handles = index_conversations(&connection, &IndexSettings::default())
        .await
        .unwrap();

    assert_eq!(handles[0].label, "👤 Unnamed (ID: 42)");
}

#[tokio::test]
async fn unsupported_kinds_and_repeated_ids_are_dropped() {
    let connection = FakeConnection::new().with_dialogs(vec![
        dialog(1, DialogKind::Other, "Bot feed"),
        dialog(2, DialogKind::Group, "Team"),
        dialog(2, DialogKind::Group, "Team (copy)"),
    ]);

    let handles = index_conversations(&connection, &IndexSettings::default())
        .await
        .unwrap();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].name, "Team");
    assert_eq!(handles[0].peer, "peer-2");
}

#[tokio::test]
async fn empty_account_yields_empty_index() {
    let connection = FakeConnection::new();

    let handles = index_conversations(&connection, &IndexSettings::default())
        .await
        .unwrap();

    assert!(handles.is_empty());
}

#[tokio::test]
async fn listing_failure_is_reported() {
    let connection = FakeConnection::new();
    let failure = PlatformError::new(PlatformErrorKind::ConnectionLost, "bridge went away");
    *connection.state.dialogs.lock().unwrap() = Err(failure.clone());

    let err = index_conversations(&connection, &IndexSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err, IndexError::Failed(failure));
}
