pub mod browse;
pub mod settings;
pub mod shell;
pub mod templates;
pub mod usage;

use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;
use tracing::debug;
use whisperdeck::{
    parse_id_list, system_clock, Catalog, Config, DeckError, LocalTemplateStore, MatchResult,
    Prompt, PromptId, Session, SharedClock, SharedStore, Storage, TemplatesGateway,
};

/// File name of an optional user catalog in the base directory
const CUSTOM_CATALOG_FILE: &str = "catalog.json";

/// Build and start the session for this invocation
pub fn open_session(storage: &Storage, config: &Config) -> Result<Session> {
    let store: SharedStore = Arc::new(storage.clone());
    let clock = system_clock();

    let custom = storage.base_dir().join(CUSTOM_CATALOG_FILE);
    let catalog = if custom.exists() {
        debug!(path = %custom.display(), "Loading custom catalog");
        Catalog::load(&custom).context("Failed to load custom catalog")?
    } else {
        Catalog::builtin()?
    };

    let gateway = template_gateway(config, store.clone(), clock.clone())?;
    let mut session = Session::new(catalog, store, clock, gateway, config.identity());
    session.start();
    Ok(session)
}

fn template_gateway(
    config: &Config,
    store: SharedStore,
    clock: SharedClock,
) -> Result<TemplatesGateway> {
    #[cfg(feature = "remote")]
    if let Some(endpoint) = &config.templates.endpoint {
        let mut remote = whisperdeck::RemoteTemplateStore::new(endpoint.clone())
            .context("Failed to set up the template store")?;
        if let Some(key) = &config.templates.api_key {
            remote = remote.with_api_key(key.clone());
        }
        if let Some(token) = &config.templates.access_token {
            remote = remote.with_access_token(token.clone());
        }
        return Ok(TemplatesGateway::new(Box::new(remote)));
    }

    #[cfg(not(feature = "remote"))]
    if config.templates.endpoint.is_some() {
        tracing::warn!("Template endpoint configured but remote support is not compiled in; using local templates");
    }

    Ok(TemplatesGateway::new(Box::new(LocalTemplateStore::new(
        store, clock,
    ))))
}

/// Resolve a prompt reference, printing suggestions when it is ambiguous
pub fn resolve_prompt<'a>(session: &'a Session, query: &str) -> Result<&'a Prompt> {
    match session.catalog().resolve(query) {
        MatchResult::Exact(prompt) => Ok(prompt),
        other => {
            other.display();
            Err(DeckError::UnknownPrompt(query.to_string()).into())
        }
    }
}

/// Resolve several references; an argument like `1,4,7` expands to those ids
pub fn resolve_prompts(session: &Session, queries: &[String]) -> Result<Vec<PromptId>> {
    let mut ids = Vec::with_capacity(queries.len());
    for query in queries {
        match parse_id_list(query) {
            Ok(listed) if query.contains(',') => {
                for id in listed {
                    ids.push(resolve_prompt(session, &id.to_string())?.id);
                }
            }
            _ => ids.push(resolve_prompt(session, query)?.id),
        }
    }
    Ok(ids)
}

/// One line per prompt: id, title, category, score and markers
pub fn print_prompt_row(session: &Session, prompt: &Prompt) {
    let favorite = if session.favorites().is_favorite(prompt.id) {
        "★".yellow()
    } else {
        " ".normal()
    };
    let selected = if session.selection().is_selected(prompt.id) {
        "●".green()
    } else {
        " ".normal()
    };
    let score = prompt
        .score
        .map(|s| format!("{:.1}", s))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {:>3} {}{} {:<28} {:<10} {}",
        prompt.id.to_string().dimmed(),
        favorite,
        selected,
        prompt.title.bold(),
        prompt.category.cyan(),
        score.dimmed()
    );
}

pub fn print_prompt_detail(session: &Session, prompt: &Prompt) {
    println!(
        "{} {}  {}",
        format!("#{}", prompt.id).dimmed(),
        prompt.title.bold(),
        prompt.category.cyan()
    );
    if session.favorites().is_favorite(prompt.id) {
        println!("{}", "★ favorite".yellow());
    }
    println!("\n{}\n", prompt.description);
    println!("{}", "Example:".green());
    println!("{}", prompt.example.trim());

    let uses = session.ledger().usage_count(prompt.id);
    if uses > 0 {
        println!("\n{}", format!("Used {} time(s)", uses).dimmed());
    }
}

/// Explain a domain error the way the front end would
pub fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<DeckError>() {
        Some(DeckError::QuotaExhausted { resets_in }) => {
            eprintln!(
                "{}: Daily copy limit reached. Resets in {}",
                "Limit".yellow(),
                resets_in.bold()
            );
            eprintln!("  Architect mode lifts the limit: {}", "wd unlock".bold());
        }
        // Ambiguous and unknown prompts were already reported by resolve_prompt
        Some(DeckError::UnknownPrompt(_)) => {}
        _ => eprintln!("{}: {:#}", "Error".red(), err),
    }
}
