// src/bin/reconcile.rs

//! One-shot cleanup of duplicate person records.
//!
//! Needs `STORE_URL` and `STORE_ACCESS_KEY`. Exits non-zero when either is
//! missing or the pass cannot start; per-record failures are logged and
//! summarized but do not change the exit status.

use std::process::ExitCode;

use assessment::config::{StoreConfig, rust_log};
use assessment::reconcile::{GroupOutcome, ReconcileOptions, reconcile};
use assessment::store::PgStore;
use assessment::utils::logging::init_tracing;
use dotenvy::dotenv;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Make sure your .env file contains STORE_URL and STORE_ACCESS_KEY");
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&rust_log(), "reconcile.log");
    tracing::info!("Starting cleanup of duplicate users...");

    let store = match PgStore::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Error connecting to store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match reconcile(&store, &ReconcileOptions::default()).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Error during cleanup: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for group in &report.groups {
        match &group.outcome {
            GroupOutcome::LoadFailed(failure) => {
                tracing::warn!(email = %group.email, "{} failed: {}", failure.step, failure.message);
            }
            GroupOutcome::Merged { candidates, .. } => {
                for failure in candidates.iter().filter_map(|c| c.as_ref().err()) {
                    for step in &failure.failures {
                        tracing::warn!(
                            email = %group.email,
                            candidate = %failure.candidate_id,
                            deleted = failure.deleted,
                            "{} failed: {}",
                            step.step,
                            step.message
                        );
                    }
                }
            }
            GroupOutcome::Vanished => {}
        }
    }

    if report.is_clean() {
        tracing::info!(
            groups = report.groups.len(),
            merged = report.merged_count(),
            "Cleanup completed successfully!"
        );
    } else {
        tracing::warn!(
            groups = report.groups.len(),
            merged = report.merged_count(),
            failed = report.failed_count(),
            failed_groups = report.failed_groups(),
            "Cleanup completed with failures, see log above"
        );
    }

    ExitCode::SUCCESS
}
