use super::show::print_cart;
use crate::context::CartContext;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use storefront_cart::{parse_quantity, CommitOutcome, EditBuffer, MutationOutcome, ProductId};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Product id
    pub product: String,

    /// Units to add
    #[arg(default_value_t = 1)]
    pub quantity: u32,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Product id
    pub product: String,

    /// New quantity, clamped to the available stock
    pub quantity: String,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Product id
    pub product: String,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Confirm emptying the cart
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn add(args: AddArgs, ctx: &CartContext) -> Result<()> {
    let product_id = ProductId::new(args.product);
    let outcome = ctx.sync().add(&product_id, args.quantity).await?;
    report(ctx, outcome);
    Ok(())
}

pub async fn set(args: SetArgs, ctx: &CartContext) -> Result<()> {
    let product_id = ProductId::new(args.product);
    let cart = ctx
        .sync()
        .cart()
        .ok_or_else(|| anyhow!("Cart is not loaded"))?;
    if cart.line(&product_id).is_none() {
        return Err(anyhow!("{} is not in the cart", product_id));
    }

    let mut buffer = EditBuffer::seeded(&cart);
    let staged = buffer.stage(&product_id, &args.quantity);
    if let Some(note) = clamp_note(&args.quantity, staged) {
        println!("  {} {}", "⚠️".yellow(), note);
    }

    match buffer.commit(&product_id, ctx.sync()).await? {
        CommitOutcome::Unchanged => {
            println!("  {} {} already at {}", "✓".green(), product_id, staged)
        }
        CommitOutcome::Committed { quantity } => {
            println!("  {} {} set to {}", "✓".green(), product_id, quantity)
        }
        CommitOutcome::Removed => println!("  {} {} removed", "✓".green(), product_id),
    }
    print_current(ctx);
    Ok(())
}

pub async fn remove(args: RemoveArgs, ctx: &CartContext) -> Result<()> {
    let outcome = ctx.sync().remove(&ProductId::new(args.product)).await?;
    report(ctx, outcome);
    Ok(())
}

pub async fn clear(args: ClearArgs, ctx: &CartContext) -> Result<()> {
    if !args.yes {
        println!("{} This empties the cart for {}", "⚠️".yellow(), ctx.user());
        println!("Use --yes to confirm");
        return Ok(());
    }

    let outcome = ctx.sync().clear().await?;
    report(ctx, outcome);
    Ok(())
}

fn report(ctx: &CartContext, outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Applied { message, .. } => println!("  {} {}", "✓".green(), message),
        MutationOutcome::Unchanged => println!("  {} Nothing to change", "✓".green()),
    }
    print_current(ctx);
}

fn print_current(ctx: &CartContext) {
    if let Some(cart) = ctx.sync().cart() {
        println!();
        print_cart(&cart);
    }
}

/// Message when the stock limit lowered what the user typed
fn clamp_note(input: &str, staged: u32) -> Option<String> {
    let requested = parse_quantity(input);
    (staged < requested).then(|| {
        format!(
            "only {} in stock, '{}' staged as {}",
            staged,
            input.trim(),
            staged
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_note_ignores_equivalent_input() {
        assert_eq!(clamp_note("4", 4), None);
        assert_eq!(clamp_note("+4", 4), None);
        assert_eq!(clamp_note("04", 4), None);
        assert_eq!(clamp_note(" 4 ", 4), None);
    }

    #[test]
    fn test_clamp_note_reports_stock_limit() {
        assert_eq!(
            clamp_note("9999", 3),
            Some("only 3 in stock, '9999' staged as 3".to_string())
        );
    }
}
