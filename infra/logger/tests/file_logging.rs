use basis_logger::{LoggingConfig, RotationPolicy};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn file_logging_creates_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let config = LoggingConfig {
        name: "integration-file-logging".into(),
        console: false,
        directory: Some(log_dir.clone()),
        rotation: RotationPolicy::Never,
        ..LoggingConfig::default()
    };
    let logger = basis_logger::init(&config)?;
    assert!(logger.writes_files());

    tracing::info!("hello from integration test");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    assert!(contents.contains("hello from integration test"));

    Ok(())
}
