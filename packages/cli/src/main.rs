mod commands;
mod context;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    add, check, clear, fix, remove, set, show, AddArgs, ClearArgs, RemoveArgs, SetArgs,
};
use context::{CartContext, ContextOptions};
use std::path::PathBuf;

/// Storefront CLI - inspect and edit your shopping cart
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing storefront.config.json
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Run against a built-in sample store instead of the API
    #[arg(long, global = true)]
    demo: bool,

    /// User the cart belongs to
    #[arg(long, global = true, default_value = "me")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the cart and its summary
    Show,

    /// Add a product to the cart
    Add(AddArgs),

    /// Set the quantity of a line (0 removes it)
    Set(SetArgs),

    /// Remove a line from the cart
    Remove(RemoveArgs),

    /// Empty the cart
    Clear(ClearArgs),

    /// Check every line against live stock
    Check,

    /// Check stock and reduce or remove lines that cannot be fulfilled
    Fix,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let ctx = CartContext::open(ContextOptions {
        dir,
        demo: cli.demo,
        user: cli.user,
    })
    .await?;

    match cli.command {
        Command::Show => show(&ctx),
        Command::Add(args) => add(args, &ctx).await,
        Command::Set(args) => set(args, &ctx).await,
        Command::Remove(args) => remove(args, &ctx).await,
        Command::Clear(args) => clear(args, &ctx).await,
        Command::Check => check(&ctx).await,
        Command::Fix => fix(&ctx).await,
    }
}
