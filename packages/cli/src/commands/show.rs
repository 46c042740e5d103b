use crate::context::CartContext;
use anyhow::Result;
use colored::Colorize;
use storefront_cart::{Cart, CartStats};

pub fn show(ctx: &CartContext) -> Result<()> {
    match ctx.sync().cart() {
        Some(cart) => print_cart(&cart),
        None => println!("{}", "No cart loaded".yellow()),
    }
    Ok(())
}

pub fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("{}", "🛒 Your cart is empty".bright_blue().bold());
        return;
    }

    println!("{}", "🛒 Cart".bright_blue().bold());
    for item in &cart.items {
        println!(
            "  {:<12} {:<28} {:>3} × {:>9} = {:>10}",
            item.product_id.as_str().bright_white(),
            item.product_name,
            item.quantity,
            money(item.unit_price),
            money(item.line_total()),
        );
    }

    let stats = CartStats::project(cart);
    println!();
    println!(
        "  {} items, {} products, avg {} per item",
        stats.total_items, stats.unique_products,
        money(stats.average_item_price)
    );
    println!("  {} {}", "Total:".bold(), money(cart.total_amount).green().bold());
}

pub fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}
