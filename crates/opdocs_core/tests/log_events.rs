mod common;

use common::{config, FakeClient};
use log::{Level, LevelFilter, Log, Metadata, Record};
use opdocs_core::{LogNotifier, Notifier, SaveFailure, SaveProtocol, SaveResult, Severity};
use std::sync::{Mutex, Once};

struct CapturingLogger;

static LINES: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());
static INIT: Once = Once::new();

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        LINES
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

fn capture() {
    INIT.call_once(|| {
        log::set_logger(&CapturingLogger).unwrap();
        log::set_max_level(LevelFilter::Info);
    });
}

fn task_save_lines(wp_id: &str) -> Vec<String> {
    let marker = format!(" wp_id={wp_id} ");
    LINES
        .lock()
        .unwrap()
        .iter()
        .map(|(_, line)| line)
        .filter(|line| line.starts_with("event=task_save ") && line.contains(&marker))
        .cloned()
        .collect()
}

#[test]
fn blank_subject_update_emits_task_save_event() {
    capture();
    let client = FakeClient::new();
    client.insert("71", "Old", 1);
    let protocol = SaveProtocol::new(&client, config());

    let result = protocol.update_subject("71", "  ", Some(1));

    assert!(matches!(result, SaveResult::Failed(SaveFailure::Validation(_))));
    assert_eq!(client.request_count(), 0);
    let lines = task_save_lines("71");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("op=update status=failed"));
    assert!(lines[0].ends_with("error_code=validation"));
}

#[test]
fn blank_status_update_emits_task_save_event() {
    capture();
    let client = FakeClient::new();
    client.insert("72", "Task", 1);
    let protocol = SaveProtocol::new(&client, config());

    let result = protocol.update_status("72", " ", Some(1));

    assert!(matches!(result, SaveResult::Failed(SaveFailure::Validation(_))));
    assert_eq!(client.request_count(), 0);
    let lines = task_save_lines("72");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("op=update_status status=failed"));
    assert!(lines[0].ends_with("error_code=validation"));
}

#[test]
fn successful_update_emits_version_in_event() {
    capture();
    let client = FakeClient::new();
    client.insert("73", "Task", 4);
    let protocol = SaveProtocol::new(&client, config());

    assert_eq!(
        protocol.update_subject("73", "Renamed", Some(4)),
        SaveResult::Updated { lock_version: 5 }
    );
    let lines = task_save_lines("73");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("status=updated wp_id=73 lock_version=5"));
}

#[test]
fn log_notifier_maps_severity_to_level() {
    capture();
    LogNotifier.notify("Task #901 created.", Severity::Success);
    LogNotifier.notify("Task #902 conflict", Severity::Warning);
    LogNotifier.notify("Task #903 failed", Severity::Error);

    let lines = LINES.lock().unwrap();
    let find = |needle: &str| {
        lines
            .iter()
            .find(|(_, line)| line.starts_with("event=notify ") && line.contains(needle))
            .cloned()
    };
    assert_eq!(
        find("#901"),
        Some((
            Level::Info,
            "event=notify module=notify severity=success message=Task #901 created.".to_string()
        ))
    );
    assert_eq!(find("#902").map(|(level, _)| level), Some(Level::Warn));
    assert_eq!(find("#903").map(|(level, _)| level), Some(Level::Error));
}
