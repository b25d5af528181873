use std::process::ExitCode;

use ekko_inference::{diagnostics::Diagnostics, InferenceClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = match InferenceClient::from_env() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let config = client.config();
    println!("inference backend diagnostics");
    println!("  host: {}", config.endpoint.base_url());
    println!("  model: {}", config.model);
    println!("  connection timeout: {}ms", config.timeouts.connection_ms);
    println!("  streaming timeout: {}ms", config.timeouts.stream_ms);
    println!("  non-streaming timeout: {}ms", config.timeouts.non_stream_ms);
    println!("  max attempts: {}", config.attempts.max_attempts);

    let report = Diagnostics::new(&client).run().await;
    println!("{report}");

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
