//! End-to-end session lifecycle through `SessionManager`: spawn a real
//! shell, submit a command, and observe the full idle -> processing ->
//! responding -> completed cycle with the output log populated.

use std::time::{Duration, Instant};

use multiterm::session::{SessionManager, SessionStatus, TickEvent};

#[test]
fn submitting_a_command_runs_through_the_full_status_cycle() {
    let mut manager = SessionManager::new(4, "/bin/sh".to_string(), Duration::from_millis(100), 10_000);
    let dir = tempfile::tempdir().unwrap();
    let id = manager
        .create_session("shell".to_string(), dir.path().to_path_buf(), Instant::now(), 0)
        .unwrap();

    manager.submit_command(id, "echo hello-from-integration-test", Instant::now()).unwrap();
    assert_eq!(manager.get(id).unwrap().meta().status, SessionStatus::Processing);

    let mut saw_output = false;
    let mut saw_completed = false;
    for _ in 0..200 {
        for event in manager.tick(Instant::now()) {
            match event {
                TickEvent::OutputAppended { id: eid } if eid == id => saw_output = true,
                TickEvent::Completed { id: eid } if eid == id => saw_completed = true,
                _ => {}
            }
        }
        if saw_completed {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(saw_output, "expected at least one OutputAppended event");
    assert!(saw_completed, "expected the command to settle into Completed");

    let handle = manager.get(id).unwrap();
    assert_eq!(handle.meta().status, SessionStatus::Completed);
    assert_eq!(handle.meta().command_count, 1);

    let joined: String = (0..handle.output().line_count())
        .filter_map(|i| handle.output().line_text(i))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(joined.contains("hello-from-integration-test"));
}

#[test]
fn closing_a_session_removes_it_and_a_second_session_stays_independent() {
    let mut manager = SessionManager::new(4, "/bin/sh".to_string(), Duration::from_millis(100), 10_000);
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let a = manager
        .create_session("a".to_string(), dir_a.path().to_path_buf(), Instant::now(), 0)
        .unwrap();
    let b = manager
        .create_session("b".to_string(), dir_b.path().to_path_buf(), Instant::now(), 0)
        .unwrap();

    manager.close_session(a);
    assert!(manager.get(a).is_none());
    assert!(manager.get(b).is_some());
    assert_eq!(manager.list_sessions().len(), 1);
}

