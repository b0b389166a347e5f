use shopcrawl::{CrawlConfig, CrawlError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_json_config_fills_missing_fields_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crawl.json");
    std::fs::write(
        &path,
        r#"{
            "data_dir": "/var/lib/shopcrawl",
            "first_page": 3,
            "last_page": 5,
            "max_concurrency": 6,
            "monitor_interval_secs": null
        }"#,
    )
    .unwrap();

    let config = CrawlConfig::from_json_file(&path).unwrap();
    let defaults = CrawlConfig::default();

    assert_eq!(config.data_dir(), Path::new("/var/lib/shopcrawl"));
    assert_eq!((config.first_page(), config.last_page()), (3, 5));
    assert_eq!(config.max_concurrency(), 6);
    assert_eq!(config.monitor_interval(), None);
    assert_eq!(config.listing_url(), defaults.listing_url());
    assert_eq!(config.content_wait(), defaults.content_wait());
    assert_eq!(config.pool_config().max_concurrency, 6);
}

#[test]
fn test_json_config_is_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crawl.json");
    std::fs::write(&path, r#"{"first_page": 10, "last_page": 2}"#).unwrap();

    let err = CrawlConfig::from_json_file(&path).unwrap_err();
    assert!(matches!(err, CrawlError::Config(_)), "{err}");
}

#[test]
fn test_unreadable_or_malformed_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        CrawlConfig::from_json_file(dir.path().join("missing.json")),
        Err(CrawlError::Config(_))
    ));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        CrawlConfig::from_json_file(&path),
        Err(CrawlError::Config(_))
    ));
}

#[test]
fn test_builder_overrides_loaded_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crawl.json");
    std::fs::write(&path, r#"{"max_concurrency": 2}"#).unwrap();

    let config = CrawlConfig::from_json_file(&path)
        .unwrap()
        .into_builder()
        .max_concurrency(8)
        .task_timeout(Duration::from_secs(120))
        .headless(false)
        .build()
        .unwrap();

    assert_eq!(config.max_concurrency(), 8);
    assert_eq!(config.task_timeout(), Duration::from_secs(120));
    assert!(!config.headless());
    assert!(!config.browser_options().headless);
}
