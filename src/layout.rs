//! Persisted panel visibility toggles

use crate::storage::{self, keys, SharedStore};
use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    SelectionBar,
    ChainBuilder,
    Sidebar,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::SelectionBar, Panel::ChainBuilder, Panel::Sidebar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::SelectionBar => "selection-bar",
            Panel::ChainBuilder => "chain-builder",
            Panel::Sidebar => "sidebar",
        }
    }

    fn key(&self) -> String {
        format!("{}{}", keys::LAYOUT_PREFIX, self.as_str())
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Panel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "selection-bar" | "selection" => Ok(Panel::SelectionBar),
            "chain-builder" | "chain" => Ok(Panel::ChainBuilder),
            "sidebar" => Ok(Panel::Sidebar),
            other => bail!(
                "Unknown panel '{}'. Expected one of: selection-bar, chain-builder, sidebar",
                other
            ),
        }
    }
}

pub struct LayoutPrefs {
    store: SharedStore,
}

impl LayoutPrefs {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Panels are visible until turned off
    pub fn is_visible(&self, panel: Panel) -> bool {
        !matches!(self.store.get(&panel.key()).as_deref(), Some("false"))
    }

    pub fn set_visible(&self, panel: Panel, visible: bool) {
        storage::save_raw(
            self.store.as_ref(),
            &panel.key(),
            if visible { "true" } else { "false" },
        );
    }

    /// Flip a panel and return its new visibility
    pub fn toggle(&self, panel: Panel) -> bool {
        let visible = !self.is_visible(panel);
        self.set_visible(panel, visible);
        visible
    }

    pub fn all(&self) -> Vec<(Panel, bool)> {
        Panel::ALL.iter().map(|&p| (p, self.is_visible(p))).collect()
    }
}
