//! `kubecred health`: Probe both services.

use clap::Args;

#[derive(Args, Debug)]
pub struct HealthArgs {
    #[arg(long, env = "ISSUANCE_SERVICE_URL", default_value = super::DEFAULT_ISSUANCE_URL)]
    pub issuance: String,

    #[arg(long, env = "VERIFICATION_SERVICE_URL", default_value = super::DEFAULT_VERIFICATION_URL)]
    pub verification: String,
}

pub async fn run(args: &HealthArgs) -> anyhow::Result<()> {
    let probes = [
        ("issuance", format!("{}/health_issue", args.issuance)),
        ("verification", format!("{}/health_verify", args.verification)),
    ];

    let mut healthy = true;
    for (name, url) in &probes {
        match reqwest::get(url).await {
            Ok(r) if r.status().is_success() => {
                let body: serde_json::Value = r.json().await?;
                println!("  [UP]   {:<13} {}", name, body);
            }
            Ok(r) => {
                healthy = false;
                println!("  [DOWN] {:<13} HTTP {}", name, r.status());
            }
            Err(e) => {
                healthy = false;
                println!("  [DOWN] {:<13} {}", name, e);
            }
        }
    }

    if !healthy {
        anyhow::bail!("one or more services are unhealthy");
    }
    Ok(())
}
