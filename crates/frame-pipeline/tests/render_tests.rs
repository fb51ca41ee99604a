//! End-to-end renders against temporary partition and frame directories.

use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};

use ais_common::{HeatmapError, IntervalLabel};
use chrono::NaiveDateTime;
use frame_pipeline::{RenderEvent, RenderPhase, RenderRequest, RenderWorker, Renderer, StatusEvent, StatusLog};
use storage::{FilesystemSource, HourLoad, PointBatch, PointSource, StorageError, MANIFEST_FILE};
use test_utils::{
    lane_points, snapshot_tree, ts, write_corrupt_partition, write_frame_file, write_partition, TestWorkspace,
};

fn fs_renderer(ws: &TestWorkspace) -> Renderer<FilesystemSource> {
    Renderer::from_config(ws.config.clone()).unwrap()
}

fn frame_names(ws: &TestWorkspace, label: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(ws.interval_dir(label))
        .map(|rd| {
            rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".png"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Three days, partitions only on the first and last.
fn three_day_workspace() -> TestWorkspace {
    let ws = TestWorkspace::new();
    write_partition(ws.source_dir(), ts("2024-01-01T06:00"), &lane_points(12), ws.format());
    write_partition(ws.source_dir(), ts("2024-01-03T20:00"), &lane_points(5), ws.format());
    ws
}

#[test]
fn test_three_day_render() {
    let ws = three_day_workspace();
    let renderer = fs_renderer(&ws);
    let mut log = StatusLog::default();

    let produced = renderer
        .render(ts("2024-01-01"), ts("2024-01-03"), "1 Day", &mut log)
        .unwrap();

    assert_eq!(produced, 2);
    assert_eq!(log.progress(), vec![33, 67, 100]);
    assert_eq!(
        frame_names(&ws, "1 Day"),
        vec!["ais_2024-01-01_00-00.png", "ais_2024-01-03_00-00.png"]
    );

    let messages = log.messages();
    assert!(messages.contains(&"Processing: 2024-01-01 00:00:00 → 2024-01-02 00:00:00".to_string()));
    assert!(messages.contains(&"Saved: ais_2024-01-01_00-00.png (rows: 12)".to_string()));
    assert!(messages.contains(&"No data found for interval: ais_2024-01-02_00-00.png".to_string()));
    assert!(messages.contains(&"Saved: ais_2024-01-03_00-00.png (rows: 5)".to_string()));
    // 23 + 24 + 23 hours without a partition
    assert_eq!(messages.iter().filter(|m| m.starts_with("Missing: ")).count(), 70);

    assert_eq!(
        log.phases(),
        vec![RenderPhase::Running, RenderPhase::Completed { produced: 2 }]
    );
    assert!(ws.interval_dir("1 Day").join(MANIFEST_FILE).is_file());
}

#[test]
fn test_second_render_changes_nothing() {
    let ws = three_day_workspace();
    let renderer = fs_renderer(&ws);
    renderer
        .render(ts("2024-01-01"), ts("2024-01-03"), "1 Day", &mut StatusLog::default())
        .unwrap();
    let before = snapshot_tree(ws.frames_dir());

    let mut log = StatusLog::default();
    let produced = renderer
        .render(ts("2024-01-01"), ts("2024-01-03"), "1 Day", &mut log)
        .unwrap();

    assert_eq!(produced, 0);
    assert_eq!(snapshot_tree(ws.frames_dir()), before);
    let skipped = log
        .statuses()
        .filter(|s| matches!(s, StatusEvent::Skipped { .. }))
        .count();
    assert_eq!(skipped, 2);
    // the empty day is retried, and again produces nothing
    assert!(log
        .messages()
        .contains(&"No data found for interval: ais_2024-01-02_00-00.png".to_string()));
    assert_eq!(log.progress(), vec![33, 67, 100]);
}

#[test]
fn test_existing_frame_is_not_recomputed() {
    let ws = three_day_workspace();
    let existing = write_frame_file(&ws.interval_dir("1 Day"), ts("2024-01-01"));
    let bytes = std::fs::read(&existing).unwrap();

    let mut log = StatusLog::default();
    let produced = fs_renderer(&ws)
        .render(ts("2024-01-01"), ts("2024-01-01"), "1 Day", &mut log)
        .unwrap();

    assert_eq!(produced, 0);
    assert_eq!(log.messages(), vec!["Skipped existing: ais_2024-01-01_00-00.png"]);
    assert_eq!(log.progress(), vec![100]);
    assert_eq!(std::fs::read(&existing).unwrap(), bytes);
}

#[test]
fn test_corrupt_partition_is_reported_and_skipped() {
    let ws = TestWorkspace::new();
    let bad = write_corrupt_partition(ws.source_dir(), ts("2024-02-01T01:00"), ws.format());
    write_partition(ws.source_dir(), ts("2024-02-01T02:00"), &lane_points(3), ws.format());

    let mut log = StatusLog::default();
    let produced = fs_renderer(&ws)
        .render(ts("2024-02-01"), ts("2024-02-01"), "1 Day", &mut log)
        .unwrap();

    assert_eq!(produced, 1);
    let prefix = format!("Failed on {}: ", bad.display());
    assert_eq!(log.messages().iter().filter(|m| m.starts_with(&prefix)).count(), 1);
    assert!(log
        .messages()
        .contains(&"Saved: ais_2024-02-01_00-00.png (rows: 3)".to_string()));
}

#[test]
fn test_window_past_end_is_rendered() {
    let ws = TestWorkspace::new();
    // inside the 3-day window starting 2024-01-01, after the requested end
    write_partition(ws.source_dir(), ts("2024-01-03T10:00"), &lane_points(2), ws.format());

    let mut log = StatusLog::default();
    let produced = fs_renderer(&ws)
        .render(ts("2024-01-01"), ts("2024-01-02"), "3 Days", &mut log)
        .unwrap();

    assert_eq!(produced, 1);
    assert_eq!(log.progress(), vec![100]);
    assert_eq!(frame_names(&ws, "3 Days"), vec!["ais_2024-01-01_00-00.png"]);
}

#[test]
fn test_start_after_end_renders_nothing() {
    let ws = three_day_workspace();
    let mut log = StatusLog::default();
    let produced = fs_renderer(&ws)
        .render(ts("2024-01-05"), ts("2024-01-01"), "1 Day", &mut log)
        .unwrap();

    assert_eq!(produced, 0);
    assert!(log.progress().is_empty());
    assert_eq!(log.statuses().count(), 0);
    assert!(!ws.interval_dir("1 Day").exists());
}

/// No hour has a partition.
struct EmptySource;

impl PointSource for EmptySource {
    fn load_hour(&self, hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        Ok(HourLoad::Missing {
            path: PathBuf::from(format!("/data/ais/{}", hour)),
        })
    }
}

#[test]
fn test_long_render_reaches_100_only_at_the_end() {
    let ws = TestWorkspace::new();
    let renderer = Renderer::new(ws.config.clone(), EmptySource).unwrap();
    let mut log = StatusLog::default();

    let produced = renderer
        .render(ts("2024-01-01"), ts("2024-07-19"), "1 Day", &mut log)
        .unwrap();

    let progress = log.progress();
    assert_eq!(produced, 0);
    assert_eq!(progress.len(), 201);
    let (last, rest) = progress.split_last().unwrap();
    assert_eq!(*last, 100);
    assert!(rest.iter().all(|&p| p < 100), "100 reported early: {:?}", &rest[rest.len() - 3..]);
    assert!(rest.windows(2).all(|w| w[0] <= w[1]));
}

/// Fails the test if any hour is read.
struct UntouchedSource;

impl PointSource for UntouchedSource {
    fn load_hour(&self, hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        panic!("no partition should be read, asked for {}", hour);
    }
}

#[test]
fn test_unsupported_interval_rejected_before_io() {
    let ws = TestWorkspace::new();
    let renderer = Renderer::new(ws.config.clone(), UntouchedSource).unwrap();
    let mut log = StatusLog::default();

    let err = renderer
        .render(ts("2024-01-01"), ts("2024-01-03"), "2 Days", &mut log)
        .unwrap_err();

    assert!(matches!(err, HeatmapError::UnsupportedInterval(ref s) if s == "2 Days"));
    assert!(err.is_caller_error());
    assert!(log.events.is_empty());
    assert!(!ws.frames_dir().exists());
}

/// Every probe fails at the filesystem level.
struct BrokenSource;

impl PointSource for BrokenSource {
    fn load_hour(&self, _hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        Err(StorageError::Probe {
            path: PathBuf::from("/mnt/ais/unreachable"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        })
    }
}

#[test]
fn test_source_failure_aborts_without_writing() {
    let ws = TestWorkspace::new();
    let renderer = Renderer::new(ws.config.clone(), BrokenSource).unwrap();
    let mut log = StatusLog::default();

    let err = renderer
        .render(ts("2024-01-01"), ts("2024-01-03"), "1 Day", &mut log)
        .unwrap_err();

    assert!(matches!(err, HeatmapError::Storage(_)));
    assert!(log.progress().is_empty());
    assert!(matches!(log.phases().last(), Some(RenderPhase::Failed { .. })));
    assert!(frame_names(&ws, "1 Day").is_empty());
}

#[test]
fn test_stale_manifest_is_reported() {
    let ws = three_day_workspace();
    fs_renderer(&ws)
        .render(ts("2024-01-01"), ts("2024-01-01"), "1 Day", &mut StatusLog::default())
        .unwrap();
    let manifest = std::fs::read(ws.interval_dir("1 Day").join(MANIFEST_FILE)).unwrap();

    let mut changed = (*ws.config).clone();
    changed.canvas.width += 10;
    let renderer = Renderer::from_config(Arc::new(changed)).unwrap();
    let mut log = StatusLog::default();
    renderer
        .render(ts("2024-01-03"), ts("2024-01-03"), "1 Day", &mut log)
        .unwrap();

    assert!(matches!(
        log.statuses().next(),
        Some(StatusEvent::StaleFrames { .. })
    ));
    // the existing manifest is not replaced
    assert_eq!(
        std::fs::read(ws.interval_dir("1 Day").join(MANIFEST_FILE)).unwrap(),
        manifest
    );
}

/// Blocks every hour until the test opens the gate.
struct GateSource {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl PointSource for GateSource {
    fn load_hour(&self, hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        if let Ok(rx) = self.gate.lock() {
            let _ = rx.recv();
        }
        let mut batch = PointBatch::default();
        batch.push(-74.0, 40.7);
        Ok(HourLoad::Loaded {
            path: PathBuf::from(format!("gate/{}", hour)),
            batch,
        })
    }
}

#[test]
fn test_worker_refuses_overlapping_render() {
    let ws = TestWorkspace::new();
    let (open, gate) = mpsc::channel();
    let renderer = Renderer::new(ws.config.clone(), GateSource { gate: Mutex::new(gate) }).unwrap();
    let worker = RenderWorker::new(renderer);

    let request = RenderRequest {
        start: ts("2024-01-01"),
        end: ts("2024-01-01"),
        interval: IntervalLabel::OneDay.label().to_string(),
    };
    let handle = worker.spawn(request.clone()).unwrap();
    assert!(worker.is_busy());
    assert!(matches!(
        worker.clone().spawn(request.clone()),
        Err(HeatmapError::RenderInProgress)
    ));

    // one message per hour; a closed gate returns immediately
    drop(open);
    assert_eq!(handle.join().unwrap(), 1);
    assert!(!worker.is_busy());

    let again = worker.spawn(request).unwrap();
    assert_eq!(again.join().unwrap(), 0);
}

struct PanickingSource;

impl PointSource for PanickingSource {
    fn load_hour(&self, _hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        panic!("reader crashed");
    }
}

#[test]
fn test_worker_panic_is_reported() {
    let ws = TestWorkspace::new();
    let worker = RenderWorker::new(Renderer::new(ws.config.clone(), PanickingSource).unwrap());

    let handle = worker
        .spawn(RenderRequest {
            start: ts("2024-01-01"),
            end: ts("2024-01-01"),
            interval: "1 Day".to_string(),
        })
        .unwrap();

    match handle.join() {
        Err(HeatmapError::WorkerPanicked(message)) => assert_eq!(message, "reader crashed"),
        other => panic!("expected a panic report, got {:?}", other),
    }
    assert!(!worker.is_busy());
}

#[tokio::test]
async fn test_worker_events_arrive_in_order() {
    let ws = three_day_workspace();
    let worker = RenderWorker::new(fs_renderer(&ws));
    let handle = worker
        .spawn(RenderRequest {
            start: ts("2024-01-01"),
            end: ts("2024-01-03"),
            interval: "1 Day".to_string(),
        })
        .unwrap();

    let mut events = Vec::new();
    let produced = handle.finish(|e| events.push(e)).await.unwrap();

    assert_eq!(produced, 2);
    assert_eq!(events.first(), Some(&RenderEvent::Phase(RenderPhase::Running)));
    assert_eq!(
        events.last(),
        Some(&RenderEvent::Phase(RenderPhase::Completed { produced: 2 }))
    );
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            RenderEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![33, 67, 100]);
}
