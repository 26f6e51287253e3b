// Saved chain templates

use anyhow::Result;
use colored::*;
use whisperdeck::{ChainTemplate, Session};

use crate::cli::TemplateCommands;

pub async fn handle_templates(session: &Session, action: TemplateCommands) -> Result<()> {
    match action {
        TemplateCommands::List => {
            let templates = session.list_templates().await?;
            print_template_list(&templates);
        }
        TemplateCommands::Show { id } => {
            let template = session.get_template(&id).await?;
            print_template(session, &template);
        }
        TemplateCommands::Delete { id } => {
            session.delete_template(&id).await?;
            println!("{} Deleted template {}", "✓".green(), id.dimmed());
        }
    }
    Ok(())
}

pub fn print_template_list(templates: &[ChainTemplate]) {
    if templates.is_empty() {
        println!("  No templates yet. Save a chain from {}", "wd shell".bold());
        return;
    }

    for template in templates {
        let visibility = if template.is_public { "public" } else { "private" };
        println!(
            "  {}  {:<24} {:<10} {} prompts, used {}x {}",
            short_id(&template.id).dimmed(),
            template.name.bold(),
            template.category.cyan(),
            template.prompt_ids.len(),
            template.use_count,
            visibility.dimmed()
        );
    }
}

fn print_template(session: &Session, template: &ChainTemplate) {
    println!("{}  {}", template.name.bold(), template.category.cyan());
    if let Some(description) = &template.description {
        println!("{}", description);
    }
    println!(
        "{}",
        format!(
            "id {}, by {}, updated {}",
            template.id,
            template.created_by,
            template.updated_at.format("%Y-%m-%d")
        )
        .dimmed()
    );

    let prompts = template.resolve(session.catalog());
    for (index, prompt) in prompts.iter().enumerate() {
        println!("  {}. {}", index + 1, prompt.title);
    }
    let missing = template.prompt_ids.len() - prompts.len();
    if missing > 0 {
        println!("  {}", format!("{} prompt(s) no longer in the catalog", missing).dimmed());
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
