// Browsing commands: list, show, categories, favorites

use super::{print_prompt_detail, print_prompt_row, resolve_prompt};
use anyhow::Result;
use colored::*;
use is_terminal::IsTerminal;
use whisperdeck::{FilterState, Prompt, Session, SortOrder};

pub fn handle_list(
    session: &Session,
    query: Option<&str>,
    category: Option<&str>,
    favorites: bool,
    sort: SortOrder,
    limit: Option<usize>,
) -> Result<()> {
    let mut filter = FilterState {
        favorites_only: favorites,
        query: query.unwrap_or_default().to_string(),
        sort,
        ..FilterState::default()
    };
    filter.set_category(category);

    let prompts = session.visible_prompts_for(&filter);
    let shown = limit.unwrap_or(prompts.len()).min(prompts.len());
    print_prompts(session, &prompts[..shown], prompts.len());
    Ok(())
}

/// Print a list, as a table on a terminal and as plain lines when piped
pub fn print_prompts(session: &Session, prompts: &[&Prompt], total: usize) {
    if !std::io::stdout().is_terminal() {
        for prompt in prompts {
            println!("{}\t{}\t{}", prompt.id, prompt.title, prompt.category);
        }
        return;
    }

    if prompts.is_empty() {
        println!("  No prompts match. Try {}", "wd ls".bold());
        return;
    }

    for prompt in prompts {
        print_prompt_row(session, prompt);
    }
    if total > prompts.len() {
        println!("  {}", format!("... {} more", total - prompts.len()).dimmed());
    }
}

pub fn handle_show(session: &Session, query: &str) -> Result<()> {
    let prompt = resolve_prompt(session, query)?;
    print_prompt_detail(session, prompt);
    Ok(())
}

pub fn handle_categories(session: &Session) -> Result<()> {
    for category in session.catalog().categories() {
        let count = session
            .catalog()
            .iter()
            .filter(|p| p.category == category)
            .count();
        println!("  {:<12} {}", category.cyan(), count.to_string().dimmed());
    }
    Ok(())
}

pub fn handle_fav(session: &mut Session, query: &str) -> Result<()> {
    let prompt = resolve_prompt(session, query)?;
    let (id, title) = (prompt.id, prompt.title.clone());

    if session.toggle_favorite(id)? {
        println!("{} Added {} to favorites", "★".yellow(), title.bold());
    } else {
        println!("Removed {} from favorites", title.bold());
    }
    Ok(())
}

pub fn handle_favs(session: &Session) -> Result<()> {
    let filter = FilterState {
        favorites_only: true,
        ..FilterState::default()
    };
    let prompts = session.visible_prompts_for(&filter);
    if prompts.is_empty() && std::io::stdout().is_terminal() {
        println!("  No favorites yet. Add one with: {} <prompt>", "wd fav".bold());
        return Ok(());
    }
    print_prompts(session, &prompts, prompts.len());
    Ok(())
}
