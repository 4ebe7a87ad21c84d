//! Stdio tool server: one JSON-RPC message per line on stdin, responses on stdout, logs on
//! stderr (filtered by `RUST_LOG`).

// crates.io
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
// self
use payments_broker::{api::PaymentsClient, error::{Result, TransportError}, tools::PaymentTools};

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let client = PaymentsClient::from_env()?;

	tracing::info!(
		merchant_account_id = %client.settings().merchant_account_id,
		"payments broker ready"
	);

	let tools = PaymentTools::new(client);
	let mut lines = BufReader::new(io::stdin()).lines();
	let mut stdout = io::stdout();

	while let Some(line) = lines.next_line().await.map_err(TransportError::from)? {
		let Some(response) = tools.handle_line(&line).await else {
			continue;
		};
		let mut response = response.to_string();

		response.push('\n');
		stdout.write_all(response.as_bytes()).await.map_err(TransportError::from)?;
		stdout.flush().await.map_err(TransportError::from)?;
	}

	tracing::info!("stdin closed, shutting down");

	Ok(())
}
