use super::{SERVER_A, SERVER_B};
use crate::client::selector::{AnnounceOutcome, ServerSelector};

#[test]
fn test_first_announce_always_wins() {
    let mut selector = ServerSelector::new();
    // Even the worst possible priority is selected when nothing is.
    assert_eq!(selector.on_announce(SERVER_A, 255), AnnounceOutcome::Switched);
    assert_eq!(selector.selected().unwrap().id, SERVER_A);
}

#[test]
fn test_lower_priority_value_switches() {
    let mut selector = ServerSelector::new();
    selector.on_announce(SERVER_A, 5);
    assert_eq!(selector.on_announce(SERVER_B, 3), AnnounceOutcome::Switched);
    assert_eq!(selector.selected().unwrap().id, SERVER_B);
    assert_eq!(selector.selected().unwrap().priority1, 3);
}

#[test]
fn test_equal_priority_keeps_first_observed() {
    let mut selector = ServerSelector::new();
    selector.on_announce(SERVER_A, 5);
    assert_eq!(selector.on_announce(SERVER_B, 5), AnnounceOutcome::Ignored);
    assert_eq!(selector.selected().unwrap().id, SERVER_A);
}

#[test]
fn test_higher_priority_value_ignored() {
    let mut selector = ServerSelector::new();
    selector.on_announce(SERVER_A, 5);
    assert_eq!(selector.on_announce(SERVER_B, 6), AnnounceOutcome::Ignored);
    assert_eq!(selector.selected().unwrap().id, SERVER_A);
}

#[test]
fn test_refresh_restores_aged_priority() {
    let mut selector = ServerSelector::new();
    selector.on_announce(SERVER_A, 5);
    selector.age();
    selector.age();
    assert_eq!(selector.selected().unwrap().priority1, 7);

    assert_eq!(selector.on_announce(SERVER_A, 5), AnnounceOutcome::Refreshed);
    assert_eq!(selector.selected().unwrap().priority1, 5);
}

#[test]
fn test_aging_saturates() {
    let mut selector = ServerSelector::new();
    selector.on_announce(SERVER_A, 254);
    selector.age();
    selector.age();
    selector.age();
    assert_eq!(selector.selected().unwrap().priority1, 255);
}

#[test]
fn test_aging_without_selection_is_noop() {
    let mut selector = ServerSelector::new();
    selector.age();
    assert!(selector.selected().is_none());
}

#[test]
fn test_is_selected() {
    let mut selector = ServerSelector::new();
    assert!(!selector.is_selected(SERVER_A));
    selector.on_announce(SERVER_A, 5);
    assert!(selector.is_selected(SERVER_A));
    assert!(!selector.is_selected(SERVER_B));
}
