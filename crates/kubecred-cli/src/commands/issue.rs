//! `kubecred issue`: Issue a credential.

use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Credential plaintext.
    pub credential: String,

    /// Issuance service endpoint.
    #[arg(short, long, env = "ISSUANCE_SERVICE_URL", default_value = super::DEFAULT_ISSUANCE_URL)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct IssueRequest<'a> {
    credential: &'a str,
}

#[derive(Deserialize)]
struct IssueResponse {
    message: String,
    credential_hash: String,
    worker_id: String,
    issued_at: String,
}

pub async fn run(args: &IssueArgs) -> anyhow::Result<()> {
    let url = format!("{}/issue", args.endpoint);
    let body = IssueRequest {
        credential: &args.credential,
    };

    let resp = reqwest::Client::new().post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let data: IssueResponse = r.json().await?;
            println!("{}", data.message);
            println!("  Hash:    {}", data.credential_hash);
            println!("  Worker:  {}", data.worker_id);
            println!("  Issued:  {}", data.issued_at);
        }
        Ok(r) => return Err(super::failure("issuance", r).await),
        Err(e) => super::unreachable_endpoint(&args.endpoint, e),
    }

    Ok(())
}
