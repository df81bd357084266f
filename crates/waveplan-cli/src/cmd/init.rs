use anyhow::Context;
use std::path::Path;
use waveplan_core::{config::Config, intent, io, paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing waveplan in: {}", root.display());

    // 1. Directory tree
    for dir in [paths::PLANNING_DIR, paths::PHASES_DIR, paths::INTENT_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 2. config.yaml
    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    // 3. INTENT.md
    let template = intent::intent_template(&project_name);
    let written = io::write_if_missing(&paths::intent_path(root), template.as_bytes())
        .context("failed to write INTENT.md")?;
    if written {
        println!("  created: {}", paths::INTENT_FILE);
    } else {
        println!("  exists:  {}", paths::INTENT_FILE);
    }

    tracing::info!(root = %root.display(), "planning directory ready");
    println!("Done. Add phases under {}/<NN>-<name>/.", paths::PHASES_DIR);
    Ok(())
}
