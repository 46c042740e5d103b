use crate::context::CartContext;
use anyhow::Result;
use colored::Colorize;
use storefront_cart::{AvailabilityReconciler, AvailabilityReport};

pub async fn check(ctx: &CartContext) -> Result<()> {
    let report = AvailabilityReconciler::new(ctx.sync()).check().await?;
    print_report(&report);
    Ok(())
}

pub async fn fix(ctx: &CartContext) -> Result<()> {
    let reconciler = AvailabilityReconciler::new(ctx.sync());
    let report = reconciler.check().await?;
    print_report(&report);

    if report.available {
        return Ok(());
    }

    println!();
    println!("{}", "🔧 Fixing cart...".bright_blue().bold());
    match reconciler.auto_fix(&report).await {
        Ok(summary) => {
            for action in &summary.applied {
                println!("  {} {}", "✓".green(), action);
            }
            println!();
            println!("✨ {} {} line(s) fixed", "Done".green().bold(), summary.applied.len());
            Ok(())
        }
        Err(err) => {
            for action in &err.applied {
                println!("  {} {}", "✓".green(), action);
            }
            println!("  {} {} - {}", "✗".red(), err.failed_at, err.source);
            Err(err.into())
        }
    }
}

fn print_report(report: &AvailabilityReport) {
    if report.available {
        println!(
            "{} All {} item(s) are in stock",
            "✓".green(),
            report.total_items
        );
        return;
    }

    println!(
        "{} {} line(s) cannot be fulfilled",
        "⚠️".yellow(),
        report.unavailable_items.len()
    );
    for item in &report.unavailable_items {
        println!(
            "  {} {} ({}): requested {}, available {} - {}",
            "✗".red(),
            item.product_name,
            item.product_id,
            item.requested_quantity,
            item.available_stock,
            item.reason
        );
    }
}
