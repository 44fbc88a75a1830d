use scrape_rss::config::{RendererKind, RunMode, Settings};
use scrape_rss::utils::validation::Validate;
use scrape_rss::CliConfig;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn example_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scrape-rss.example.toml")
}

#[test]
fn test_example_config_is_valid() {
    let settings = assert_ok!(Settings::from_file(example_config()));

    assert_ok!(settings.validate());
    assert_eq!(settings.server.mode, RunMode::Managed);
    assert_eq!(settings.server.bind, "0.0.0.0:5000");
    assert_eq!(settings.scrape.renderer, RendererKind::Chrome);
    assert_eq!(settings.workers.max_requests, 200);
    assert_eq!(settings.workers.max_requests_jitter, 20);
}

#[test]
fn test_cli_resolves_file_and_flags() {
    let path = example_config();
    let cli = CliConfig {
        config: Some(path),
        mode: Some(RunMode::Bare),
        renderer: Some(RendererKind::Http),
        max_items: Some(5),
        ..CliConfig::default()
    };

    let settings = cli.resolve().unwrap();
    assert_eq!(settings.server.mode, RunMode::Bare);
    assert_eq!(settings.scrape.renderer, RendererKind::Http);
    assert_eq!(settings.scrape.max_items, 5);
    // Untouched values still come from the file.
    assert_eq!(settings.cache.ttl_secs, 600);
    assert_ok!(settings.validate());
}

#[test]
fn test_environment_substitution_in_file() {
    std::env::set_var("SCRAPE_RSS_TEST_BIND_PORT", "8088");
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[server]\nbind = \"127.0.0.1:${SCRAPE_RSS_TEST_BIND_PORT}\"\n")
        .unwrap();

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.server.bind, "127.0.0.1:8088");
    assert_eq!(settings.server.socket_addr().unwrap().port(), 8088);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[scrape]\nmax_items = 500\n").unwrap();
    let settings = Settings::from_file(file.path()).unwrap();

    let err = assert_err!(settings.validate());
    assert!(err.to_string().contains("scrape.max_items"), "{}", err);
}

#[test]
fn test_unknown_keys_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[workers]\nworker_class = \"gthread\"\n").unwrap();

    assert_err!(Settings::from_file(file.path()));
}

#[test]
fn test_zero_max_requests_flag_disables_recycling() {
    use clap::Parser;

    let cli = CliConfig::parse_from(["scrape-rss", "--max-requests", "0"]);
    let settings = assert_ok!(cli.resolve());

    assert_ok!(settings.validate());
    assert_eq!(settings.workers.max_requests, 0);
    assert!(!settings.workers.recycling_enabled());
}
