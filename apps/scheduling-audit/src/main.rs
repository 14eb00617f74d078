use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use appointment_cell::services::{SchedulingConsistencyService, SupabaseSchedulingStore};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("Audit aborted: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Audit every doctor named on the command line. `Ok(false)` means at least
/// one calendar disagreed with its appointments.
async fn run() -> Result<bool> {
    let doctor_ids = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<Uuid>().with_context(|| format!("Invalid doctor id: {}", arg)))
        .collect::<Result<Vec<_>>>()?;

    if doctor_ids.is_empty() {
        anyhow::bail!("Usage: scheduling-audit <doctor-uuid>...");
    }

    let config = AppConfig::from_env();
    if !config.is_configured() {
        anyhow::bail!("SUPABASE_URL and SUPABASE_ANON_PUBLIC_KEY must be set");
    }

    let store = Arc::new(SupabaseSchedulingStore::new(&config));
    let consistency = SchedulingConsistencyService::new(store, &config);

    info!("Auditing {} doctor calendar(s)", doctor_ids.len());

    let mut all_consistent = true;
    for doctor_id in doctor_ids {
        let report = consistency
            .audit_doctor(doctor_id)
            .await
            .with_context(|| format!("Failed to audit doctor {}", doctor_id))?;

        if !report.is_consistent() {
            warn!("Doctor {} needs repair", doctor_id);
            all_consistent = false;
        }

        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(all_consistent)
}
