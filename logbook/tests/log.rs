use logbook::{EventKind, ExchangeLog};

fn fresh() -> ExchangeLog {
    ExchangeLog::new("P01", "20260825_120000", "Verbal")
}

#[test]
fn second_open_is_a_violation_not_data_loss() {
    let mut log = fresh();
    assert!(log.open_exchange("first question"));
    assert!(!log.open_exchange("interrupting question"));

    // The first exchange closes untouched.
    assert!(log.close_exchange("an answer", 1.2));
    assert_eq!(log.exchanges().len(), 1);
    assert_eq!(log.exchanges()[0].user_message, "first question");

    assert!(log
        .events()
        .iter()
        .any(|e| e.kind == EventKind::ProtocolViolation));
}

#[test]
fn close_without_open_is_a_violation() {
    let mut log = fresh();
    assert!(!log.close_exchange("orphan reply", 0.5));
    assert!(log.exchanges().is_empty());
    assert!(log
        .events()
        .iter()
        .any(|e| e.kind == EventKind::ProtocolViolation));
}

#[test]
fn feedback_records_are_noops_without_open_exchange() {
    let mut log = fresh();
    let before = log.events().len();
    log.record_feedback_start(0.5);
    log.record_feedback_stop(0.5, 1.0, vec!["gesture".into()]);
    log.record_feedback_cancelled();
    assert_eq!(log.events().len(), before);
}

#[test]
fn cancelled_feedback_leaves_duration_absent() {
    let mut log = fresh();
    log.open_exchange("hi");
    log.record_feedback_start(0.5);
    log.record_feedback_cancelled();
    log.close_exchange("hello!", 0.3);

    let ex = &log.exchanges()[0];
    assert!(ex.feedback_cancelled);
    assert!(ex.feedback_duration.is_none());
    assert!(ex.feedback_actual_start.is_none());
    assert_eq!(ex.feedback_delay_configured, Some(0.5));
}

#[test]
fn exports_escape_embedded_delimiters_and_quotes() {
    let mut log = fresh();
    log.open_exchange("I said \"hello, world\"");
    log.close_exchange("Nice, very nice", 0.8);

    let table = log.export_exchange_table();
    assert!(table.contains("\"I said \"\"hello, world\"\"\""));
    assert!(table.contains("\"Nice, very nice\""));

    let stream = log.export_event_stream();
    assert!(stream.lines().next().unwrap().starts_with("Timestamp,"));
    // header + SESSION_START + USER_MESSAGE + AI_RESPONSE_FULL
    assert_eq!(stream.lines().count(), 4);
}

#[test]
fn exchange_table_has_one_row_per_closed_exchange() {
    let mut log = fresh();
    for i in 0..3 {
        log.open_exchange(&format!("question {i}"));
        log.record_feedback_start(0.5);
        log.record_feedback_stop(0.52, 0.9, vec!["audio-filler".into()]);
        log.close_exchange(&format!("answer {i}"), 1.0 + i as f64);
    }
    let table = log.export_exchange_table();
    assert_eq!(table.lines().count(), 4);
    assert_eq!(log.exchanges()[2].index, 2);
}

#[test]
fn write_to_produces_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = fresh();
    log.open_exchange("hi");
    log.close_exchange("hey", 0.4);

    let (events, exchanges) = log.write_to(dir.path().join("logs")).unwrap();
    assert!(events.exists());
    assert!(exchanges.exists());
    let content = std::fs::read_to_string(events).unwrap();
    assert!(content.contains("SESSION_START"));
}
