use clap::Parser;
use heylisten_monitor::MonitorError;
use heylisten_server::Config;
use std::time::Duration;

fn parse(args: &[&str]) -> Config {
    let mut argv = vec!["heylisten"];
    argv.extend_from_slice(args);
    Config::try_parse_from(argv).unwrap()
}

#[test]
fn defaults() {
    let config = parse(&["--client-id", "id", "--client-secret", "secret"]);

    assert_eq!(config.port, 8000);
    assert_eq!(config.interval(), Duration::from_secs(300));
    assert!(!config.discord);
    assert!(config.validate().is_ok());

    let monitor = config.monitor_config();
    assert_eq!(monitor.fetch_timeout, Duration::from_secs(60));
}

#[test]
fn missing_credentials_name_every_variable() {
    let config = Config {
        client_id: None,
        client_secret: Some("  ".to_string()),
        ..parse(&["--client-id", "x", "--client-secret", "y"])
    };

    match config.validate() {
        Err(MonitorError::Config(msg)) => {
            assert!(msg.contains("SPOT_CLIENT_ID"));
            assert!(msg.contains("SPOT_CLIENT_SECRET"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
    assert!(config.spotify_config().is_err());
}

#[test]
fn zero_interval_is_rejected() {
    let config = parse(&[
        "--client-id",
        "id",
        "--client-secret",
        "secret",
        "--interval-secs",
        "0",
    ]);
    assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
}

#[test]
fn empty_market_means_no_market() {
    let config = parse(&["--client-id", "id", "--client-secret", "s", "--market", ""]);
    assert_eq!(config.monitor_config().market, None);
}

#[test]
fn flags_and_bind_address() {
    let config = parse(&[
        "--client-id",
        "id",
        "--client-secret",
        "s",
        "--host",
        "127.0.0.1",
        "--port",
        "9000",
        "--discord",
        "--enable-notifications",
    ]);
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert!(config.discord);
    assert!(config.enable_notifications);
}
