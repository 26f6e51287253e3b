//! Command-line interface definitions and parsing
//!
//! `Cli` is the one-shot `wd` command. `ShellLine` is the grammar of a
//! single line typed into `wd shell`.

use clap::{Parser, Subcommand};
use whisperdeck::pipeline::SortOrder;

#[derive(Parser)]
#[command(name = "wd")]
#[command(version)]
#[command(about = "WhisperDeck - browse, chain and copy prompt-engineering techniques")]
#[command(after_help = "COMMANDS BY CATEGORY:

BROWSE:
  list, ls        List prompts (filter, search, sort)
  show, s         Show one prompt in full
  categories      List categories
  fav, favs       Toggle or list favorites

USE:
  copy, c         Compose prompts and copy them
  shell           Interactive session with selection and chain builder

PROGRESS:
  status          Level, daily copies and reset countdown
  challenge       Record a completed challenge

ARCHITECT:
  unlock, lock    Enter or leave architect mode

SETTINGS:
  layout          Show or toggle panels
  templates       Saved chain templates
  config          Identity and template store settings

EXAMPLES:
  wd ls -q \"step by step\"            # Fuzzy search
  wd copy 1 8                         # Two prompts, one copy
  wd ls --favorites | head             # Favorites only

Run 'wd COMMAND --help' for more information on a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List prompts
    #[command(alias = "ls")]
    List {
        /// Fuzzy search across title, description, example and category
        #[arg(short = 'q', long = "query")]
        query: Option<String>,
        /// Only this category
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        /// Only favorites (overrides --category)
        #[arg(short = 'f', long = "favorites")]
        favorites: bool,
        /// Sort by score when not searching
        #[arg(long = "sort", value_enum, default_value_t = SortOrder::Desc)]
        sort: SortOrder,
        /// Show at most this many prompts
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },
    /// Show a prompt by id, title or fuzzy title
    #[command(alias = "s")]
    Show {
        prompt: String,
    },
    /// List categories
    Categories,
    /// Toggle a favorite
    Fav {
        prompt: String,
    },
    /// List favorites
    Favs,
    /// Compose one or more prompts and copy the result
    #[command(alias = "c")]
    Copy {
        /// Prompts by id, title or fuzzy title
        #[arg(required = true)]
        prompts: Vec<String>,
    },
    /// Level, daily copies and reset countdown
    Status,
    /// Record a completed challenge
    Challenge {
        id: String,
    },
    /// Enter architect mode (prompts for the passphrase if omitted)
    Unlock {
        passphrase: Option<String>,
    },
    /// Leave passphrase architect mode
    Lock,
    /// Show or toggle panel visibility
    Layout {
        /// selection-bar, chain-builder or sidebar
        panel: Option<String>,
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },
    /// Saved chain templates
    Templates {
        #[command(subcommand)]
        action: TemplateCommands,
    },
    /// Identity and template store settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Interactive session
    Shell,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List templates, most used first
    #[command(alias = "ls")]
    List,
    /// Show a template and its prompts
    Show { id: String },
    /// Delete a template
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Sign in as this identity
    SetIdentity { id: String, email: String },
    /// Sign out
    ClearIdentity,
}

/// One line of input in the interactive shell
#[derive(Parser, Debug)]
#[command(name = "shell", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Show the visible prompts for the current filter
    #[command(alias = "ls")]
    List {
        #[arg(short = 'n')]
        limit: Option<usize>,
    },
    /// Show a prompt in full
    Show { prompt: String },
    /// Toggle prompts in the selection
    #[command(alias = "sel")]
    Select {
        #[arg(required = true)]
        prompts: Vec<String>,
    },
    /// Show the selection
    Selection,
    /// Empty the selection
    Clear,
    /// Copy the selection, or the given prompts
    Copy { prompts: Vec<String> },
    /// Chain builder
    Chain {
        #[command(subcommand)]
        action: ChainCommand,
    },
    /// Change the list filter
    Filter {
        #[command(subcommand)]
        action: FilterCommand,
    },
    /// Toggle a favorite
    Fav { prompt: String },
    Status,
    Unlock { passphrase: String },
    Lock,
    /// Show the passphrase gate
    Gate,
    /// Toggle a panel
    Layout { panel: Option<String> },
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ChainCommand {
    /// Append prompts to the chain
    Add {
        #[arg(required = true)]
        prompts: Vec<String>,
    },
    /// Remove the node at a 1-based position
    Rm { position: usize },
    /// Move a prompt to a 1-based position
    Mv { prompt: String, position: usize },
    Show,
    /// Compose the chain and copy it
    Run,
    Clear,
    /// Save the chain as a template
    Save {
        #[arg(long)]
        public: bool,
        #[arg(short = 'd', long = "description")]
        description: Option<String>,
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Replace the chain with a saved template
    Load { id: String },
    /// List saved templates
    Templates,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum FilterCommand {
    /// Search; no words clears the search
    Query { words: Vec<String> },
    /// Restrict to a category; "all" clears it
    Category { name: String },
    /// Toggle favorites-only
    Favorites,
    Sort {
        #[arg(value_enum)]
        order: SortOrder,
    },
    /// Back to the full list
    Reset,
    Show,
}

impl ShellLine {
    /// Parse a typed line; blank lines yield `None`
    pub fn parse_line(line: &str) -> Option<Result<Self, clap::Error>> {
        let words = split_words(line);
        if words.is_empty() {
            return None;
        }
        Some(Self::try_parse_from(words))
    }
}

/// Split on whitespace, keeping double-quoted runs together
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in line.trim().chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}
