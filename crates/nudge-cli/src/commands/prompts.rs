//! Prompt library commands
//!
//! Overrides live in the data directory as `<id>.md`, with the same YAML
//! frontmatter as the built-in prompts.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Result};
use nudge_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// `{{name}}` placeholders used by a template, in sorted order
///
/// Block markers such as `{{#if x}}` and `{{/if}}` are skipped.
pub fn placeholders(content: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    let mut rest = content;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() && !name.starts_with('#') && !name.starts_with('/') {
            names.insert(name.to_string());
        }
        rest = &after[end + 2..];
    }
    names.into_iter().collect()
}

/// Example values used by `prompts show --sample`
fn sample_vars() -> HashMap<&'static str, String> {
    [
        ("item", "Wireless earbuds"),
        ("amount", "129.00"),
        ("category", "Shopping"),
        (
            "reflections",
            "1. Q: Do you need them?\n   A: My old pair broke last week",
        ),
        ("month", "October 2026"),
        ("total_spent", "412.50"),
        ("avoidable_spend", "129.00"),
        ("record_count", "6"),
        ("positive_count", "3"),
        ("neutral_count", "2"),
        ("negative_count", "1"),
        ("categories", "Groceries, Shopping"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}

pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("{:<22} {:>3}  {:<8}  PLACEHOLDERS", "ID", "VER", "SOURCE");
    println!("{}", "-".repeat(78));
    for info in library.list() {
        let vars = match info.id.parse::<PromptId>() {
            Ok(id) => library.get(id).map(|p| placeholders(&p.content)).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        println!(
            "{:<22} {:>3}  {:<8}  {}",
            info.id,
            info.version,
            if info.has_override { "custom" } else { "built-in" },
            vars.join(", ")
        );
        if !info.description.is_empty() {
            println!("{:<22} {}", "", info.description);
        }
    }

    println!();
    match default_prompts_dir() {
        Some(dir) => println!("Overrides: {}/<id>.md", dir.display()),
        None => println!("Overrides: (no data directory on this system)"),
    }
    Ok(())
}

/// Print a prompt, optionally rendered with example values
pub fn cmd_prompts_show(prompt_id: &str, sample: bool) -> Result<()> {
    let id: PromptId = prompt_id.parse().map_err(|e: String| {
        let known = PromptId::all()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("{} (known prompts: {})", e, known)
    })?;

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!(
        "# {} v{} ({})",
        prompt.metadata.id,
        prompt.metadata.version,
        match &prompt.override_path {
            Some(path) => format!("override at {}", path.display()),
            None => "built-in".to_string(),
        }
    );
    if !prompt.metadata.description.is_empty() {
        println!("# {}", prompt.metadata.description);
    }
    println!();

    if sample {
        println!("{}", prompt.render(&sample_vars()));
    } else {
        println!("{}", prompt.content);
    }
    Ok(())
}

pub fn cmd_prompts_path() -> Result<()> {
    let dir = default_prompts_dir().ok_or_else(|| anyhow!("No data directory on this system"))?;
    println!("{}", dir.display());
    if !dir.exists() {
        eprintln!("(does not exist yet; create it to add overrides)");
    }
    Ok(())
}
