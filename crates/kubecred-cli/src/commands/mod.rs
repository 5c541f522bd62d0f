pub mod check;
pub mod hash;
pub mod health;
pub mod history;
pub mod issue;
pub mod verify;

use serde::Deserialize;

pub const DEFAULT_ISSUANCE_URL: &str = "http://127.0.0.1:3001";
pub const DEFAULT_VERIFICATION_URL: &str = "http://127.0.0.1:3002";

/// Error body returned by both services.
#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Turn a non-success response into an error carrying the server's message.
async fn failure(action: &str, resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => anyhow::anyhow!("{} failed (HTTP {}): {}", action, status, err.message),
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", action, status),
    }
}

fn unreachable_endpoint(endpoint: &str, err: reqwest::Error) {
    println!("Could not reach service at {}", endpoint);
    println!("  Error: {}", err);
}
