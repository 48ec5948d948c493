//! Stats command - One stats poll cycle from the command line.

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;
use crate::services::Services;

/// Execute the stats command
pub async fn execute(config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let services = Services::from_connection(db.get_connection(), &config)?;

    let report = services.stats_poller().run_cycle().await?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| AppError::internal(format!("Failed to encode report: {}", e)))?;
    println!("{}", json);

    Ok(())
}
