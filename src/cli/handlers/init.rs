use std::fs;
use std::path::Path;

use super::Context;
use crate::cli::commands::InitArgs;
use crate::io::store::{FileStore, seed_samples};

const CONFIG_TOML_TEMPLATE: &str = r##"# hydrokit configuration

[store]
# Directory holding one <name>.json file per project.
# Default: $XDG_DATA_HOME/hydrokit/projects
# dir = "/path/to/projects"
seed_samples = true

[tracker]
# Project used when --project is omitted
# default_project = "4735"

[lookup]
# Parts catalog: a JSON array of {part_number, description}
# catalog = "/path/to/items_export_slim.json"
fuzzy_limit = 200
"##;

/// Render config.toml, pinning the store directory when one was given.
fn render_config_toml(store_dir: Option<&Path>) -> String {
    match store_dir {
        Some(dir) => {
            let quoted = toml::Value::String(dir.display().to_string()).to_string();
            CONFIG_TOML_TEMPLATE.replace(
                "# dir = \"/path/to/projects\"",
                &format!("dir = {}", quoted),
            )
        }
        None => CONFIG_TOML_TEMPLATE.to_string(),
    }
}

pub(super) fn cmd_init(args: InitArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = FileStore::open(&ctx.store_dir)?;

    // Write a starter config the first time
    let wrote_config = if ctx.config_path.exists() {
        false
    } else {
        if let Some(parent) = ctx.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let pinned = ctx.store_overridden.then_some(ctx.store_dir.as_path());
        fs::write(&ctx.config_path, render_config_toml(pinned))?;
        true
    };

    let seeded = if ctx.config.store.seed_samples && !args.no_samples {
        seed_samples(&mut store)?
    } else {
        Vec::new()
    };

    println!("Initialized project store: {}", store.dir().display());
    if wrote_config {
        println!("  config: {}", ctx.config_path.display());
    }
    for name in &seeded {
        println!("  sample project: {}", name);
    }
    Ok(())
}
