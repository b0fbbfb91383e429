//! Cart maintenance commands.

use chrono::TimeDelta;
use techshop_storefront::services::CartService;

use super::connect;

/// Delete anonymous carts untouched for `older_than_days` days.
///
/// Carts that became orders and carts owned by customers are kept.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn prune(older_than_days: i64) -> Result<(), Box<dyn std::error::Error>> {
    let idle_for = TimeDelta::try_days(older_than_days)
        .ok_or_else(|| format!("{older_than_days} days is out of range"))?;

    let pool = connect().await?;
    let pruned = CartService::new(&pool).prune_anonymous(idle_for).await?;

    tracing::info!("Deleted {pruned} idle anonymous cart(s)");
    Ok(())
}
