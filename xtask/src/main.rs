use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use xshell::{Shell, cmd};

mod publish;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "hubwire development automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all crates in the workspace
    Build,
    /// Run the test suite for all crates
    Test,
    /// Build, lint, test and run the chat demo
    Verify,
    /// Run the criterion benchmarks of the facade crate
    Bench,
    /// Run the chat demo against the loopback hub
    Demo,
    /// Publish all crates to crates.io in dependency order
    Publish {
        /// Package without uploading
        #[arg(long)]
        dry_run: bool,
        /// Publish independent crates of one dependency layer concurrently
        #[arg(long)]
        parallel: bool,
    },
}

/// Dependency order of the published crates.
const PUBLISH_ORDER: &[&str] = &[
    "crates/hubwire-core",
    "crates/hubwire-macros",
    "crates/hubwire-contract",
    "crates/hubwire-loopback",
    "crates/hubwire",
];

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    match cli.command {
        Commands::Build => {
            println!("{}", "🚀 Building workspace...".green().bold());
            cmd!(sh, "cargo build --workspace --all-targets").run()?;
            println!("{}", "✅ Build successful".green().bold());
        }
        Commands::Test => {
            println!("{}", "🧪 Running tests...".green().bold());
            cmd!(sh, "cargo test --workspace").run()?;
            println!("{}", "✅ All tests passed".green().bold());
        }
        Commands::Verify => {
            println!("{}", "🛡️ Verifying workspace...".green().bold());
            cmd!(sh, "cargo build --workspace --all-targets").run()?;
            cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
            cmd!(sh, "cargo test --workspace").run()?;
            cmd!(sh, "cargo run -p hubwire --example chat").run()?;
            println!("{}", "✅ Verification complete".green().bold());
        }
        Commands::Bench => {
            println!("{}", "📈 Running benchmarks...".green().bold());
            cmd!(sh, "cargo bench -p hubwire").run()?;
        }
        Commands::Demo => {
            cmd!(sh, "cargo run -p hubwire --example chat")
                .env("RUST_LOG", "hubwire=debug")
                .run()?;
        }
        Commands::Publish { dry_run, parallel } => {
            if parallel {
                publish::run_publish_parallel(dry_run)?
            } else {
                run_publish(&sh, dry_run)?
            }
        }
    }

    Ok(())
}

fn run_publish(sh: &Shell, dry_run: bool) -> Result<()> {
    println!("{}", "📦 Starting publish workflow...".magenta().bold());
    if dry_run {
        println!("{}", "ℹ️  DRY RUN MODE".yellow());
    }

    let workspace_version = workspace_version(sh)?;
    let mut published = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for crate_path in PUBLISH_ORDER {
        let _guard = sh.push_dir(crate_path);
        let manifest = sh.read_file("Cargo.toml")?;
        let crate_name = publish::package_name(&manifest)?;
        let version = publish::package_version(&manifest).unwrap_or_else(|| workspace_version.clone());

        println!("{}", format!("\n🔍 Checking {crate_name}@{version}...").cyan());

        if !dry_run && is_published(sh, &crate_name, &version) {
            println!("{}", format!("⏭️  {crate_name} v{version} already exists, skipping").yellow());
            skipped += 1;
            continue;
        }

        let result = if dry_run {
            cmd!(sh, "cargo publish --dry-run --allow-dirty").run()
        } else {
            cmd!(sh, "cargo publish --allow-dirty").run()
        };

        match result {
            Ok(()) => {
                println!("{}", format!("✅ Published {crate_name} v{version}").green());
                published += 1;
                if !dry_run {
                    wait_for_index_propagation(sh, &crate_name, &version)?;
                }
            }
            Err(err) if err.to_string().contains("already exists") => {
                println!("{}", format!("⏭️  {crate_name} already published, skipping").yellow());
                skipped += 1;
            }
            Err(err) => {
                println!("{}", format!("❌ Failed to publish {crate_name}: {err}").red());
                failed += 1;
            }
        }
    }

    println!("\n{}", "═".repeat(50).dimmed());
    println!("{}", "📊 Publish Summary".magenta().bold());
    println!("   ✅ Published: {}", published.to_string().green());
    println!("   ⏭️  Skipped:   {}", skipped.to_string().yellow());
    println!("   ❌ Failed:    {}", failed.to_string().red());
    println!("{}", "═".repeat(50).dimmed());

    if failed > 0 {
        anyhow::bail!("{failed} crate(s) failed to publish");
    }
    Ok(())
}

fn workspace_version(sh: &Shell) -> Result<String> {
    let root = sh.read_file("Cargo.toml")?;
    let doc = root.parse::<toml_edit::DocumentMut>()?;
    doc["workspace"]["package"]["version"]
        .as_str()
        .map(str::to_string)
        .context("workspace.package.version missing from the root manifest")
}

fn is_published(sh: &Shell, crate_name: &str, version: &str) -> bool {
    let search = cmd!(sh, "cargo search {crate_name} --limit 1")
        .read()
        .unwrap_or_default();
    search.contains(&format!("{crate_name} = \"{version}\""))
}

/// Polls the index until the new version shows up, for at most 30 seconds.
fn wait_for_index_propagation(sh: &Shell, crate_name: &str, version: &str) -> Result<()> {
    let pb = ProgressBar::new(30);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Waiting for {crate_name} v{version} to propagate..."));

    for _ in 0..15 {
        pb.inc(2);
        std::thread::sleep(std::time::Duration::from_secs(2));
        if is_published(sh, crate_name, version) {
            pb.finish_with_message(format!("✓ {crate_name} v{version} available on crates.io"));
            return Ok(());
        }
    }

    pb.finish_with_message(format!("Timeout - {crate_name} may take longer to appear"));
    Ok(())
}
