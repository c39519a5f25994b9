//! Config command
//!
//! Loads the configuration the way `serve` would (file, then environment)
//! and prints what would be tailed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use lookout_config::Config;

/// Run the config command
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    config
        .apply_env()
        .context("invalid environment override")?;

    print!("{}", render(&config));
    Ok(())
}

fn render(config: &Config) -> String {
    let mut out = String::from("configuration OK\n\n");
    out.push_str(&format!("listen:     {}\n", config.server.bind_address()));
    if config.revision.enabled {
        out.push_str(&format!(
            "repository: {}\n",
            config.revision.repository_path().display()
        ));
    } else {
        out.push_str("repository: (revision header disabled)\n");
    }

    out.push_str("\nlogs:\n");
    for (name, log) in config.logs.iter() {
        let path = log.resolved_path();
        let state = if path.exists() { "" } else { "  (missing)" };
        out.push_str(&format!("  {name:<12} {}{state}\n", path.display()));
    }
    out
}
