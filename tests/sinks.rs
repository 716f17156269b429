//! Report sinks and the end-of-request session guard

mod common;

use std::fs;

use common::*;
use reqprof::sink::{REPORT_TARGET, VAR_KEYS};
use reqprof::{
    CollectOutcome, FileSink, LogSink, MemoryStore, ProfilerError, ProfilerStatus, SinkError,
    StoreError, VarSink, VariableStore,
};
use tracing::Level;

#[test]
fn log_sink_emits_report_json() {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_max_level(Level::TRACE)
        .finish();

    let mut store = MemoryStore::new();
    tracing::subscriber::with_default(subscriber, || {
        let mut p = profiler(&mut store);
        p.init(Some("req-log")).unwrap();
        p.push_event("render").unwrap();
        p.collect(&mut LogSink::default()).unwrap();
    });

    let output = writer.contents();
    let line = output
        .lines()
        .find(|line| line.contains(REPORT_TARGET))
        .expect("report line emitted");
    assert!(line.contains("ERROR"));
    assert!(line.contains("req-log"));

    let json_start = line.find('{').expect("line carries JSON");
    let json_end = line.rfind('}').expect("line carries JSON");
    let payload: serde_json::Value = serde_json::from_str(&line[json_start..=json_end]).unwrap();
    assert_eq!(payload["id"], "req-log");
    assert_eq!(payload["events"].as_array().unwrap().len(), 3);
    assert_eq!(payload["events"][1]["name"], "render");
}

#[test]
fn log_sink_respects_level() {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_max_level(Level::WARN)
        .finish();

    let mut store = MemoryStore::new();
    tracing::subscriber::with_default(subscriber, || {
        let mut p = profiler(&mut store);
        p.init(Some("req-quiet")).unwrap();
        p.collect(&mut LogSink::new(Level::DEBUG)).unwrap();
    });

    assert!(!writer.contents().contains("req-quiet"));
}

#[test]
fn file_sink_writes_report_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let mut p = profiler(&mut store);
    p.init(Some("req-file")).unwrap();
    p.push_event("render").unwrap();
    p.collect(&mut FileSink::new(dir.path())).unwrap();

    let written = fs::read_to_string(dir.path().join("req-file.json")).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(payload["id"], "req-file");
    assert_eq!(payload["summary"]["sizeGrowth"], 200);
}

#[test]
fn file_sink_failure_is_reported_after_done() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let mut store = MemoryStore::new();
    let mut p = profiler(&mut store);
    p.init(Some("req-file")).unwrap();

    let err = p.collect(&mut FileSink::new(&missing)).unwrap_err();
    assert!(matches!(err, ProfilerError::Sink(SinkError::Io { .. })));
    assert_eq!(p.store().get("profiler_status").as_deref(), Some("2"));
}

#[test]
fn file_sink_rejects_path_like_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let mut p = profiler(&mut store);
    p.init(Some("../escape")).unwrap();

    let err = p.collect(&mut FileSink::new(dir.path())).unwrap_err();
    assert!(matches!(err, ProfilerError::Sink(SinkError::InvalidReportId(id)) if id == "../escape"));
    assert!(!dir.path().join("../escape.json").exists());
}

#[test]
fn var_sink_projects_summary() {
    let mut store = MemoryStore::new();
    {
        let mut p = profiler(&mut store);
        p.init(Some("req-var")).unwrap();
        p.push_event("render").unwrap();
        p.collect(&mut VarSink).unwrap();
    }

    for key in VAR_KEYS {
        assert!(store.get_ref(key).is_some(), "{key} not projected");
    }
    assert_eq!(store.get_ref("profiler_start_size"), Some("47600"));
    assert_eq!(store.get_ref("profiler_start_blocks"), Some("3"));
    assert_eq!(store.get_ref("profiler_end_size"), Some("47800"));
    assert_eq!(store.get_ref("profiler_end_blocks"), Some("5"));
    assert_eq!(store.get_ref("profiler_size_growth"), Some("200"));
    assert_eq!(store.get_ref("profiler_blocks_growth"), Some("2"));
    assert_eq!(store.get_ref("profiler_elapsed_time"), Some("0"));
    assert_eq!(
        store.get_ref("profiler_start_time"),
        Some(START_MS.to_string().as_str())
    );

    let full: serde_json::Value =
        serde_json::from_str(store.get_ref("profiler_full_report").unwrap()).unwrap();
    assert_eq!(full["id"], "req-var");
}

#[test]
fn var_sink_store_failure_is_delivered_once() {
    let store = RefusingStore::refusing("profiler_full_report");
    let mut p = profiler_over(store);
    p.init(Some("req-var")).unwrap();

    let err = p.collect(&mut VarSink).unwrap_err();
    assert!(matches!(
        err,
        ProfilerError::Sink(SinkError::Store(StoreError::Rejected { .. }))
    ));
    assert_eq!(p.status().unwrap(), ProfilerStatus::Done);
    assert_eq!(p.collect(&mut VarSink).unwrap(), CollectOutcome::AlreadyCollected);
    assert_eq!(p.store().get("profiler_size_growth").as_deref(), Some("100"));
}

#[test]
fn session_collects_on_drop_with_chosen_sink() {
    let mut store = MemoryStore::new();
    let mut capture = CaptureSink::default();
    {
        let mut session = profiler(&mut store)
            .start(Some("req-session"), &mut capture)
            .unwrap();
        session.push_event("render").unwrap();
    }

    assert_eq!(capture.reports.len(), 1);
    assert_eq!(capture.reports[0].id(), "req-session");
    assert_eq!(store.get("profiler_status").as_deref(), Some("2"));
}

#[test]
fn session_finish_surfaces_sink_errors() {
    let mut store = MemoryStore::new();
    let mut failing = FailingSink::default();
    let session = profiler(&mut store).start(Some("req-1"), &mut failing).unwrap();

    let err = session.finish().unwrap_err();
    assert!(matches!(err, ProfilerError::Sink(_)));
    assert_eq!(failing.calls, 1);
}

#[test]
fn boxed_sinks_are_selectable_at_start() {
    let mut store = MemoryStore::new();
    let sinks: Vec<Box<dyn reqprof::ReporterSink>> = vec![Box::new(VarSink)];
    for sink in sinks {
        let session = profiler(&mut store).start(Some("req-boxed"), sink).unwrap();
        assert!(matches!(session.finish().unwrap(), CollectOutcome::Delivered(_)));
    }
    assert!(store.get_ref("profiler_full_report").is_some());
}
