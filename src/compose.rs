//! Meta-prompt rendering
//!
//! Turns an ordered list of prompts (a selection or a chain) into the text
//! that is copied to the clipboard.

use crate::catalog::{Prompt, PromptId};
use anyhow::{Context, Result};

/// Render prompts as one numbered meta-prompt
///
/// A single prompt renders as its example alone. Several prompts are
/// framed as steps to be applied in order.
pub fn compose_meta_prompt(prompts: &[&Prompt]) -> String {
    match prompts {
        [] => String::new(),
        [single] => single.example.trim().to_string(),
        _ => {
            let mut out = String::from(
                "Apply the following prompt-engineering techniques in order:\n",
            );
            for (index, prompt) in prompts.iter().enumerate() {
                out.push_str(&format!(
                    "\n## {}. {} ({})\n{}\n",
                    index + 1,
                    prompt.title,
                    prompt.category,
                    prompt.example.trim()
                ));
            }
            out
        }
    }
}

/// Parse "1, 4,7" into prompt ids, ignoring blank entries
pub fn parse_id_list(input: &str) -> Result<Vec<PromptId>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PromptId>()
                .with_context(|| format!("'{}' is not a prompt id", s))
        })
        .collect()
}
