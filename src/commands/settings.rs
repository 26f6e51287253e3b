// Layout and configuration commands

use anyhow::Result;
use colored::*;
use whisperdeck::{Config, LayoutPrefs, Panel, Session, Storage};

use crate::cli::ConfigCommands;

pub fn handle_layout(session: &Session, panel: Option<&str>, on: bool, off: bool) -> Result<()> {
    let layout = session.layout();
    if let Some(name) = panel {
        let panel: Panel = name.parse()?;
        let visible = if on {
            layout.set_visible(panel, true);
            true
        } else if off {
            layout.set_visible(panel, false);
            false
        } else {
            layout.toggle(panel)
        };
        println!("{} {}", panel, visibility(visible));
        return Ok(());
    }

    print_layout(layout);
    Ok(())
}

pub fn print_layout(layout: &LayoutPrefs) {
    for (panel, visible) in layout.all() {
        println!("  {:<14} {}", panel.as_str(), visibility(visible));
    }
}

fn visibility(visible: bool) -> ColoredString {
    if visible {
        "shown".green()
    } else {
        "hidden".dimmed()
    }
}

/// Config commands edit the file only, never the environment overrides
pub fn handle_config(storage: &Storage, action: ConfigCommands) -> Result<()> {
    let path = storage.config_path();

    match action {
        ConfigCommands::Show => {
            let config = Config::load(&path)?.with_env_overrides();
            println!("{}", config.display());
            println!("{}", format!("file: {}", path.display()).dimmed());
        }
        ConfigCommands::SetIdentity { id, email } => {
            let mut config = Config::load(&path)?;
            config.set_identity(id, email.clone());
            config.save(&path)?;
            println!("{} Signed in as {}", "✓".green(), email.bold());
        }
        ConfigCommands::ClearIdentity => {
            let mut config = Config::load(&path)?;
            config.clear_identity();
            config.save(&path)?;
            println!("Signed out");
        }
    }

    Ok(())
}
