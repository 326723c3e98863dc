use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use xshell::{Shell, cmd};

#[derive(Debug, Clone)]
struct Crate {
    name: String,
    path: PathBuf,
    local_deps: Vec<String>,
}

/// Publishes the workspace layer by layer, each layer concurrently.
pub fn run_publish_parallel(dry_run: bool) -> Result<()> {
    println!("🚀 Starting parallel publish (dry run: {dry_run})...");

    let crates = load_workspace(Path::new("crates"))?;
    println!("📦 Found {} crates in workspace.", crates.len());

    let layers = dependency_layers(&crates)?;
    for (i, layer) in layers.iter().enumerate() {
        let names: Vec<_> = layer.iter().map(|c| c.name.as_str()).collect();
        println!("   Layer {i}: {names:?}");
    }

    for (i, layer) in layers.iter().enumerate() {
        println!("\n▶️  Executing layer {i} ({})", layer.len());
        layer
            .par_iter()
            .try_for_each(|krate| publish_crate(dry_run, krate))?;

        if !dry_run && i + 1 < layers.len() {
            println!("⏳ Waiting 15s for crates.io index propagation...");
            std::thread::sleep(std::time::Duration::from_secs(15));
        }
    }

    println!("\n✅ Parallel publish complete!");
    Ok(())
}

fn publish_crate(dry_run: bool, krate: &Crate) -> Result<()> {
    // Shell is not Sync, every worker gets its own.
    let sh = Shell::new()?;
    let _guard = sh.push_dir(&krate.path);

    if dry_run {
        println!("   [DRY] {}...", krate.name);
        cmd!(sh, "cargo publish --dry-run --allow-dirty").run()?;
        return Ok(());
    }

    println!("   [PUBLISH] {}...", krate.name);
    const MAX_ATTEMPTS: u32 = 3;
    for attempt in 1..=MAX_ATTEMPTS {
        let output = std::process::Command::new("cargo")
            .args(["publish", "--allow-dirty"])
            .current_dir(&krate.path)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("is already uploaded") || stderr.contains("already exists") {
            println!("   [SKIP] {} (already published)", krate.name);
            return Ok(());
        }
        if attempt == MAX_ATTEMPTS {
            anyhow::bail!(
                "`cargo publish` failed for {} after {attempt} attempts: {}\n{stderr}",
                krate.name,
                output.status
            );
        }

        println!(
            "   [RETRY] {} (attempt {attempt}/{MAX_ATTEMPTS}) - waiting 5s...",
            krate.name
        );
        std::thread::sleep(std::time::Duration::from_secs(5));
    }
    Ok(())
}

fn load_workspace(crates_dir: &Path) -> Result<Vec<Crate>> {
    let mut crates = Vec::new();
    for entry in fs::read_dir(crates_dir)
        .with_context(|| format!("Failed to list {}", crates_dir.display()))?
    {
        let path = entry?.path();
        let manifest_path = path.join("Cargo.toml");
        if !manifest_path.exists() {
            continue;
        }
        let manifest = fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
        crates.push(Crate {
            name: package_name(&manifest)?,
            path,
            local_deps: dependency_names(&manifest)?,
        });
    }

    // Only workspace members count as edges.
    let members: HashSet<String> = crates.iter().map(|c| c.name.clone()).collect();
    for krate in &mut crates {
        krate.local_deps.retain(|dep| members.contains(dep));
    }
    Ok(crates)
}

/// `package.name` of a manifest.
pub fn package_name(manifest: &str) -> Result<String> {
    let doc = manifest.parse::<toml_edit::DocumentMut>()?;
    doc["package"]["name"]
        .as_str()
        .map(str::to_string)
        .context("Missing package name")
}

/// `package.version` of a manifest, `None` when inherited from the workspace.
pub fn package_version(manifest: &str) -> Option<String> {
    let doc = manifest.parse::<toml_edit::DocumentMut>().ok()?;
    doc.get("package")?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

/// Names under `[dependencies]`. Dev dependencies do not constrain publish order.
fn dependency_names(manifest: &str) -> Result<Vec<String>> {
    let doc = manifest.parse::<toml_edit::DocumentMut>()?;
    Ok(doc
        .get("dependencies")
        .and_then(|deps| deps.as_table())
        .map(|deps| deps.iter().map(|(name, _)| name.to_string()).collect())
        .unwrap_or_default())
}

fn dependency_layers(crates: &[Crate]) -> Result<Vec<Vec<Crate>>> {
    let mut layers = Vec::new();
    let mut remaining: BTreeMap<String, Crate> =
        crates.iter().map(|c| (c.name.clone(), c.clone())).collect();

    while !remaining.is_empty() {
        let layer: Vec<Crate> = remaining
            .values()
            .filter(|c| c.local_deps.iter().all(|dep| !remaining.contains_key(dep)))
            .cloned()
            .collect();

        if layer.is_empty() {
            anyhow::bail!(
                "Dependency cycle between: {:?}",
                remaining.keys().collect::<Vec<_>>()
            );
        }

        for c in &layer {
            remaining.remove(&c.name);
        }
        layers.push(layer);
    }

    Ok(layers)
}
