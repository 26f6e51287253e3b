// Interactive session: selection, chain builder and filters that live
// until the shell exits

use super::browse::{handle_fav, handle_show, print_prompts};
use super::settings::{handle_layout, print_layout};
use super::templates::print_template_list;
use super::usage::{copy_prompts, copy_selection, deliver, handle_lock, handle_status, handle_unlock};
use super::{report_error, resolve_prompt, resolve_prompts};
use crate::cli::{ChainCommand, FilterCommand, ShellCommand, ShellLine};
use anyhow::{Context, Result};
use colored::*;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use whisperdeck::{
    ChainAdd, FilterState, Panel, PromptId, SelectionChange, Session, POLL_INTERVAL,
};

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn run_shell(session: &mut Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    // The first tick fires immediately; start() already polled
    poll.tick().await;

    println!(
        "{} {} prompts. Type {} for commands, {} to leave.",
        "WhisperDeck".bold(),
        session.catalog().len(),
        "help".bold(),
        "quit".bold()
    );
    show_prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };

                if let Some(parsed) = ShellLine::parse_line(&line) {
                    match parsed {
                        Ok(parsed) => match execute(session, parsed.command).await {
                            Ok(Flow::Quit) => break,
                            Ok(Flow::Continue) => {}
                            Err(e) => report_error(&e),
                        },
                        Err(e) => {
                            let _ = e.print();
                        }
                    }
                }
                show_prompt()?;
            }
            _ = poll.tick() => {
                if session.tick() {
                    println!("\n{} Daily copies restored", "✓".green());
                    show_prompt()?;
                }
            }
        }
    }

    debug!("Shell closed");
    Ok(())
}

fn show_prompt() -> Result<()> {
    print!("{} ", "wd>".cyan());
    std::io::stdout().flush()?;
    Ok(())
}

pub async fn execute(session: &mut Session, command: ShellCommand) -> Result<Flow> {
    match command {
        ShellCommand::List { limit } => {
            if session.layout().is_visible(Panel::Sidebar) {
                print_filter(session.filter());
            }
            let prompts = session.visible_prompts();
            let shown = limit.unwrap_or(prompts.len()).min(prompts.len());
            print_prompts(session, &prompts[..shown], prompts.len());
        }
        ShellCommand::Show { prompt } => handle_show(session, &prompt)?,
        ShellCommand::Select { prompts } => {
            for id in resolve_prompts(session, &prompts)? {
                let title = prompt_title(session, id);
                match session.toggle_selection(id)? {
                    SelectionChange::Added => println!("{} {}", "+".green(), title),
                    SelectionChange::Removed => println!("{} {}", "-".red(), title),
                    SelectionChange::Full => {
                        println!("Selection is full; deselect something first");
                        break;
                    }
                }
            }
            print_selection_bar(session);
        }
        ShellCommand::Selection => print_selection(session),
        ShellCommand::Clear => {
            session.clear_selection();
            println!("Selection cleared");
        }
        ShellCommand::Copy { prompts } => {
            if prompts.is_empty() {
                copy_selection(session)?;
            } else {
                let ids = resolve_prompts(session, &prompts)?;
                copy_prompts(session, &ids)?;
            }
        }
        ShellCommand::Chain { action } => execute_chain(session, action).await?,
        ShellCommand::Filter { action } => execute_filter(session, action),
        ShellCommand::Fav { prompt } => handle_fav(session, &prompt)?,
        ShellCommand::Status => handle_status(session)?,
        ShellCommand::Unlock { passphrase } => handle_unlock(session, Some(passphrase.as_str()))?,
        ShellCommand::Lock => handle_lock(session)?,
        ShellCommand::Gate => {
            if session.gate().is_gate_visible() {
                session.hide_gate();
                println!("Gate closed");
            } else {
                session.show_gate();
                println!("Gate open. Enter {} <passphrase>", "unlock".bold());
            }
        }
        ShellCommand::Layout { panel } => match panel {
            Some(name) => handle_layout(session, Some(name.as_str()), false, false)?,
            None => print_layout(session.layout()),
        },
        ShellCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

async fn execute_chain(session: &mut Session, action: ChainCommand) -> Result<()> {
    match action {
        ChainCommand::Add { prompts } => {
            for id in resolve_prompts(session, &prompts)? {
                if !session.chain().can_stage_more() {
                    println!("The chain is long enough; run or save it first");
                    break;
                }
                let title = prompt_title(session, id);
                match session.chain_add(id)? {
                    ChainAdd::Added { position } => {
                        println!("{} {}. {}", "+".green(), position + 1, title)
                    }
                    ChainAdd::AlreadyPresent => println!("{} is already in the chain", title),
                }
            }
            print_chain_builder(session);
        }
        ChainCommand::Rm { position } => {
            match position
                .checked_sub(1)
                .and_then(|index| session.chain_remove(index))
            {
                Some(node) => println!("{} {}", "-".red(), node.prompt.title),
                None => println!("No prompt at position {}", position),
            }
            print_chain_builder(session);
        }
        ChainCommand::Mv { prompt, position } => {
            let id = resolve_prompt(session, &prompt)?.id;
            if !session.chain().contains(id) {
                println!("That prompt is not in the chain");
            } else if session.chain_reorder(id, position.saturating_sub(1)) {
                print_chain_builder(session);
            }
        }
        ChainCommand::Show => print_chain(session),
        ChainCommand::Run => {
            let text = session.run_chain()?;
            deliver(session, &text, session.chain().len())?;
        }
        ChainCommand::Clear => {
            session.chain_clear();
            println!("Chain cleared");
        }
        ChainCommand::Save {
            public,
            description,
            name,
        } => {
            let template = session
                .save_chain(&name.join(" "), description, public)
                .await?;
            println!(
                "{} Saved {} {}",
                "✓".green(),
                template.name.bold(),
                template.id.dimmed()
            );
        }
        ChainCommand::Load { id } => {
            let loaded = session.load_template(&id).await?;
            println!("Loaded {} prompt(s) into the chain", loaded);
            print_chain_builder(session);
        }
        ChainCommand::Templates => {
            let templates = session.list_templates().await?;
            print_template_list(&templates);
        }
    }
    Ok(())
}

fn execute_filter(session: &mut Session, action: FilterCommand) {
    let filter = session.filter_mut();
    match action {
        FilterCommand::Query { words } => filter.query = words.join(" "),
        FilterCommand::Category { name } => filter.set_category(Some(&name)),
        FilterCommand::Favorites => filter.favorites_only = !filter.favorites_only,
        FilterCommand::Sort { order } => filter.sort = order,
        FilterCommand::Reset => *filter = FilterState::default(),
        FilterCommand::Show => {}
    }
    print_filter(session.filter());
}

fn print_filter(filter: &FilterState) {
    let scope = if filter.favorites_only {
        "favorites".to_string()
    } else {
        filter.category.clone().unwrap_or_else(|| "all".to_string())
    };
    let order = if filter.has_query() {
        format!("search \"{}\"", filter.query.trim())
    } else {
        format!("score {:?}", filter.sort).to_lowercase()
    };
    println!("{} {}  {}", "Showing".dimmed(), scope.cyan(), order.dimmed());
}

fn prompt_title(session: &Session, id: PromptId) -> String {
    session
        .catalog()
        .get(id)
        .map(|p| p.title.clone())
        .unwrap_or_default()
}

fn print_selection(session: &Session) {
    let selection = session.selection();
    if selection.is_empty() {
        println!("Nothing selected");
        return;
    }
    for (index, prompt) in selection.prompts().iter().enumerate() {
        println!("  {}. {}", index + 1, prompt.title);
    }
    if !selection.can_select_more() {
        println!("  {}", "(full)".dimmed());
    }
}

fn print_selection_bar(session: &Session) {
    if !session.layout().is_visible(Panel::SelectionBar) {
        return;
    }
    let selection = session.selection();
    let titles: Vec<&str> = selection.prompts().iter().map(|p| p.title.as_str()).collect();
    println!(
        "{} [{}/5] {}",
        "Selection".dimmed(),
        selection.len(),
        titles.join(" + ")
    );
}

fn print_chain(session: &Session) {
    let chain = session.chain();
    if chain.is_empty() {
        println!("The chain is empty. Add prompts with {}", "chain add".bold());
        return;
    }
    for node in chain.nodes() {
        println!(
            "  {}. {:<28} {}",
            node.position + 1,
            node.prompt.title.bold(),
            node.prompt.category.cyan()
        );
    }
    println!(
        "  {}",
        format!("~{:.0} tokens", chain.estimate_tokens()).dimmed()
    );
}

fn print_chain_builder(session: &Session) {
    if session.layout().is_visible(Panel::ChainBuilder) {
        print_chain(session);
    }
}
