//! Order management commands.

use techshop_core::{OrderId, OrderStatus};
use techshop_storefront::db::{OrderRepository, RepositoryError};

use super::connect;

/// Print orders, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
#[allow(clippy::print_stdout)]
pub async fn list(status: Option<OrderStatus>) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let orders = OrderRepository::new(&pool).list(status).await?;

    if orders.is_empty() {
        tracing::info!("No orders found");
        return Ok(());
    }

    println!(
        "{:>6}  {:<12}  {:<10}  {:<11}  {:<24}  {:>5}  {:>12}",
        "ID", "STATUS", "DATE", "BUYING", "CUSTOMER", "ITEMS", "TOTAL"
    );
    for summary in &orders {
        let order = &summary.order;
        println!(
            "{:>6}  {:<12}  {:<10}  {:<11}  {:<24}  {:>5}  {:>12}",
            order.id,
            order.status.as_str(),
            order.order_date,
            order.buying_type.as_str(),
            format!("{} {}", order.first_name, order.last_name),
            summary.total_products,
            summary.final_price,
        );
    }

    tracing::info!(count = orders.len(), "Listed orders");
    Ok(())
}

/// Change the status of an order.
///
/// # Errors
///
/// Returns an error if the order does not exist or the update fails.
pub async fn set_status(id: OrderId, status: OrderStatus) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    match OrderRepository::new(&pool).set_status(id, status).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(format!("Order {id} not found").into()),
        Err(e) => Err(e.into()),
    }
}
