use imgsync_core::{CommandOutput, CommandRunner, HostPlatform, Reconciler, RuntimeSettings};
use log::{LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;

static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

struct FixedTable;

impl CommandRunner for FixedTable {
    fn run(&self, _: &str) -> CommandOutput {
        CommandOutput::success(
            "REPOSITORY   TAG       IMAGE ID       CREATED       SIZE\n\
             alpine       latest    4bcff63911fc   4 weeks ago   12.8MB\n\
             debian       12        b6507e340c43   2 weeks ago   181MB",
        )
    }
}

#[test]
fn verbose_listing_logs_one_single_line_event_per_table_row() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let reconciler = Reconciler::new(FixedTable, HostPlatform::Linux, &RuntimeSettings::default());
    assert_eq!(reconciler.list_local_images(true).len(), 2);

    let captured = CAPTURED.lock().unwrap();
    let raw: Vec<&String> = captured
        .iter()
        .filter(|message| message.contains("status=raw"))
        .collect();
    assert_eq!(raw.len(), 3);
    assert!(raw.iter().all(|message| !message.contains('\n')));
    assert!(raw[1].contains("alpine"));
}
