// Copy, progress and architect commands

use super::resolve_prompts;
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use whisperdeck::{Clipboard, CopyTarget, PromptId, Session, SessionStatus};

pub fn handle_copy(session: &mut Session, queries: &[String]) -> Result<()> {
    let ids = resolve_prompts(session, queries)?;
    copy_prompts(session, &ids)
}

/// Deliver the composed prompts, charging the quota only once they arrive
pub fn copy_prompts(session: &mut Session, ids: &[PromptId]) -> Result<()> {
    let mut clipboard = Clipboard::new();
    let target = session.copy_prompts_with(ids, |text| clipboard.deliver(text))?;
    report_copy(session, target, ids.len());
    Ok(())
}

pub fn copy_selection(session: &mut Session) -> Result<()> {
    let count = session.selection().len();
    let mut clipboard = Clipboard::new();
    let target = session.copy_selection_with(|text| clipboard.deliver(text))?;
    report_copy(session, target, count);
    Ok(())
}

/// Deliver text that needs no quota, such as a chain run
pub fn deliver(session: &Session, text: &str, prompt_count: usize) -> Result<()> {
    let target = Clipboard::new().deliver(text)?;
    report_copy(session, target, prompt_count);
    Ok(())
}

fn report_copy(session: &Session, target: CopyTarget, prompt_count: usize) {
    if target != CopyTarget::Clipboard {
        return;
    }
    let quota = if session.is_architect() {
        "unlimited".to_string()
    } else {
        format!("{} copies left today", session.ledger().copies_remaining())
    };
    eprintln!(
        "{} Copied {} prompt(s) to clipboard ({})",
        "✓".green(),
        prompt_count,
        quota.dimmed()
    );
}

pub fn handle_status(session: &Session) -> Result<()> {
    print_status(&session.status());
    Ok(())
}

pub fn print_status(status: &SessionStatus) {
    println!("{} {}", "Level".bold(), status.level);
    if status.architect {
        println!("{} {}", "Copies".bold(), "unlimited (architect)".magenta());
    } else {
        println!(
            "{} {}/{} left, resets in {}",
            "Copies".bold(),
            status.copies_remaining,
            status.daily_limit,
            status.resets_in
        );
    }
    println!(
        "{} {} prompts used, {} chains built, {} challenges",
        "Progress".bold(),
        status.prompts_used,
        status.chains_built,
        status.challenges_completed
    );
    println!("{} {}", "Favorites".bold(), status.favorites);
    match &status.signed_in_as {
        Some(email) => println!("{} {}", "Signed in".bold(), email),
        None => println!("{} {}", "Signed in".bold(), "guest".dimmed()),
    }
}

pub fn handle_challenge(session: &mut Session, id: &str) -> Result<()> {
    let before = session.ledger().level();
    session.complete_challenge(id);
    println!("{} Challenge {} recorded", "✓".green(), id.bold());
    if session.ledger().level() != before {
        println!("Level {}", session.ledger().level());
    }
    Ok(())
}

pub fn handle_unlock(session: &mut Session, passphrase: Option<&str>) -> Result<()> {
    if session.is_architect() && passphrase.is_none() {
        println!("Architect mode is already active");
        return Ok(());
    }

    let input = match passphrase {
        Some(p) => p.to_string(),
        None => read_passphrase()?,
    };

    if session.unlock(&input) {
        println!("{} Architect mode unlocked until midnight", "✓".green());
    } else {
        eprintln!("{}: Incorrect passphrase", "Error".red());
    }
    Ok(())
}

fn read_passphrase() -> Result<String> {
    print!("Passphrase: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read passphrase")?;
    Ok(line)
}

pub fn handle_lock(session: &mut Session) -> Result<()> {
    session.lock();
    if session.is_architect() {
        println!("Passphrase session ended; architect access remains via your account");
    } else {
        println!("Architect mode locked");
    }
    Ok(())
}
