//! `PaneArena` and `compute_layout` combined the way the grid widget uses
//! them: resolve a rect per arena position, then resolve each position's
//! session through the arena rather than indexing session order directly.

use multiterm::layout::{compute_layout, PaneArena, Rect};

const AREA: Rect = Rect {
    x: 0,
    y: 0,
    width: 120,
    height: 40,
};

#[test]
fn swapping_two_panes_changes_which_session_gets_which_rect() {
    let sessions = vec!["alpha", "beta", "gamma"];
    let mut arena = PaneArena::from_session_count(sessions.len());
    let rects = compute_layout(arena.len(), AREA);

    let before: Vec<&str> = (0..rects.len())
        .map(|i| sessions[arena.slot(i).unwrap().session_index])
        .collect();
    assert_eq!(before, vec!["alpha", "beta", "gamma"]);

    arena.swap(0, 2);
    let after: Vec<&str> = (0..rects.len())
        .map(|i| sessions[arena.slot(i).unwrap().session_index])
        .collect();
    assert_eq!(after, vec!["gamma", "beta", "alpha"]);

    // The rects themselves are unaffected by the swap: only the session
    // shown at each position changes.
    assert_eq!(compute_layout(arena.len(), AREA), rects);
}

#[test]
fn growing_the_session_count_rebuilds_a_fresh_identity_arena() {
    let arena = PaneArena::from_session_count(2);
    assert_eq!(arena.slot(0).unwrap().session_index, 0);
    assert_eq!(arena.slot(1).unwrap().session_index, 1);

    let grown = PaneArena::from_session_count(4);
    let rects = compute_layout(grown.len(), AREA);
    assert_eq!(rects.len(), 4);
    for (i, rect) in rects.iter().enumerate() {
        assert_eq!(grown.slot(i).unwrap().session_index, i);
    }
}
