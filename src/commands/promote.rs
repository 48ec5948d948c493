//! Promote command - Grants the admin role to a registered user.

use crate::cli::args::PromoteArgs;
use crate::config::Config;
use crate::domain::UserRole;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, UserRepository, UserStore};

/// Execute the promote command
pub async fn execute(args: PromoteArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let users = UserStore::new(db.get_connection());

    let user = users
        .set_role(args.email.trim(), UserRole::Admin)
        .await
        .map_err(|e| match e {
            AppError::NotFound => AppError::validation(format!("No user with email {}", args.email)),
            other => other,
        })?;

    tracing::info!(user_id = %user.id, "User promoted to admin");
    println!("{} is now an admin (log in again to pick up the new role)", user.email);
    Ok(())
}
