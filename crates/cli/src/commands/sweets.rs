//! Inventory commands: browse, purchase, and admin mutations.

use rust_decimal::Decimal;

use sweet_shop_client::{ApiError, Inventory};
use sweet_shop_core::{SearchQuery, Sweet, SweetId, SweetInput};

/// List the whole inventory.
pub async fn list(inventory: &Inventory) -> Result<(), ApiError> {
    print_table(&inventory.list().await?);
    Ok(())
}

/// Search with optional filters.
pub async fn search(
    inventory: &Inventory,
    name: Option<String>,
    category: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
) -> Result<(), ApiError> {
    let query = SearchQuery {
        name,
        category,
        min_price,
        max_price,
    };
    print_table(&inventory.search(&query).await?);
    Ok(())
}

/// Create a sweet and report the server-assigned id.
pub async fn add(
    inventory: &Inventory,
    name: String,
    category: String,
    price: Decimal,
    quantity: u32,
    description: Option<String>,
) -> Result<(), ApiError> {
    let sweet = inventory
        .create(&SweetInput {
            name,
            category,
            price,
            quantity,
            description,
        })
        .await?;
    println!("Created {} (id {})", sweet.name, sweet.id);
    Ok(())
}

/// Replace a sweet's fields.
pub async fn update(
    inventory: &Inventory,
    id: &SweetId,
    name: String,
    category: String,
    price: Decimal,
    quantity: u32,
    description: Option<String>,
) -> Result<(), ApiError> {
    let sweet = inventory
        .update(
            id,
            &SweetInput {
                name,
                category,
                price,
                quantity,
                description,
            },
        )
        .await?;
    println!("Updated {} (id {})", sweet.name, sweet.id);
    Ok(())
}

/// Delete a sweet.
pub async fn delete(inventory: &Inventory, id: &SweetId) -> Result<(), ApiError> {
    inventory.delete(id).await?;
    println!("Deleted sweet {id}");
    Ok(())
}

/// Purchase units and report the reconciled stock level.
pub async fn purchase(inventory: &Inventory, id: &SweetId, quantity: u32) -> Result<(), ApiError> {
    // Seed the mirror so the post-purchase stock level can be reported.
    inventory.get(id).await?;
    inventory.purchase(id, quantity).await?;
    match inventory.find(id).await {
        Some(sweet) => println!(
            "Purchased {quantity} x {} ({} left)",
            sweet.name, sweet.quantity
        ),
        None => println!("Purchased {quantity} x sweet {id}"),
    }
    Ok(())
}

/// Restock units and report the reconciled stock level.
pub async fn restock(inventory: &Inventory, id: &SweetId, quantity: u32) -> Result<(), ApiError> {
    inventory.get(id).await?;
    inventory.restock(id, quantity).await?;
    match inventory.find(id).await {
        Some(sweet) => println!(
            "Restocked {quantity} x {} ({} in stock)",
            sweet.name, sweet.quantity
        ),
        None => println!("Restocked {quantity} x sweet {id}"),
    }
    Ok(())
}

fn print_table(sweets: &[Sweet]) {
    if sweets.is_empty() {
        println!("No sweets found");
        return;
    }
    println!("{:<8} {:<24} {:<14} {:>8} {:>6}", "ID", "NAME", "CATEGORY", "PRICE", "QTY");
    for sweet in sweets {
        println!(
            "{:<8} {:<24} {:<14} {:>8} {:>6}",
            sweet.id, sweet.name, sweet.category, sweet.price, sweet.quantity
        );
    }
}
