/**
 * Sends one notification and prints the outcome.
 *
 *   cargo run -p notifier_demo -- 127.0.0.1 1026 /notify
 *   cargo run -p notifier_demo -- 127.0.0.1 1026 /notify --relay 127.0.0.1:9000
 *   cargo run -p notifier_demo -- 127.0.0.1 1026 /notify --verb NOTIFY --no-wait
 *
 * Log verbosity follows `RUST_LOG` (e.g. `RUST_LOG=notifier_core=debug`
 * shows every composed header).
 */
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use notifier_core::{
    result_code, AlarmManager, EngineConfig, NotificationRequest, Notifier, Timeout,
};
use tracing_subscriber::EnvFilter;

const PAYLOAD: &str = r#"{"subscriptionId":"demo","data":[{"id":"Room1","type":"Room","temperature":{"type":"Number","value":23}}]}"#;

#[derive(Parser)]
#[command(name = "notifier-demo")]
#[command(about = "Send one notification and print the raw response", long_about = None)]
struct Cli {
    /// Subscriber host or IP literal
    #[arg(default_value = "127.0.0.1")]
    host: String,

    #[arg(default_value_t = 1026)]
    port: u16,

    #[arg(default_value = "/notify")]
    resource: String,

    #[arg(long, default_value = "POST")]
    verb: String,

    /// Route through a relay at HOST:PORT
    #[arg(long, value_name = "HOST:PORT", value_parser = parse_relay)]
    relay: Option<(String, u16)>,

    /// Return as soon as the response head arrives
    #[arg(long)]
    no_wait: bool,

    /// Call timeout; 0 disables it
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u32,
}

fn parse_relay(value: &str) -> Result<(String, u16), String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got {value:?}"))?;
    let port = port
        .parse()
        .map_err(|e| format!("invalid relay port {port:?}: {e}"))?;
    Ok((host.to_string(), port))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::default();
    if let Some((host, port)) = &cli.relay {
        config = config.with_relay(host.as_str(), *port);
    }

    let alarms = Arc::new(AlarmManager::new());
    let notifier = Notifier::new(Arc::new(config), alarms.clone());

    let mut request = NotificationRequest::new(cli.host, cli.port, cli.verb, cli.resource)
        .with_body("application/json", PAYLOAD)
        .with_header("X-Demo", "1")
        .with_timeout(Timeout::from_millis(i64::from(cli.timeout_ms)));
    request.tenant = "demo".into();
    request.service_path = "/".into();
    request.correlator = "demo-correlator".into();
    request.use_relay = cli.relay.is_some();
    request.wait_for_response = !cli.no_wait;

    let result = notifier.send(&request);
    println!("[demo] result code: {}", result_code(&result));

    match result {
        Ok(raw) => {
            println!("[demo] raw response ({} bytes):", raw.len());
            println!("{}", String::from_utf8_lossy(&raw));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("[demo] failed: {e}");
            println!("[demo] alarms active: {:?}", alarms.active_destinations());
            ExitCode::FAILURE
        }
    }
}
