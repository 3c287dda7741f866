//! Stage listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use mixtree_stages::StageRegistry;

#[derive(Args)]
pub struct StagesArgs {
    /// Show details for a specific stage
    #[arg(value_name = "STAGE")]
    stage: Option<String>,
}

pub fn run(args: StagesArgs) -> anyhow::Result<()> {
    let registry = StageRegistry::new();

    if let Some(id) = &args.stage {
        let stage = registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown stage: {}", id))?;

        println!("{}", stage.name);
        println!("{}", "=".repeat(stage.name.len()));
        println!();
        println!("{}", stage.description);
        println!();
        println!("Config keys: {}", stage.config_keys.join(", "));
        println!();
        println!("Example processor entry:");
        let fields: Vec<String> = stage
            .config_keys
            .iter()
            .map(|k| format!("\"{}\": ...", k))
            .collect();
        println!(
            "  {{\"processor\": \"{}\", \"config\": {{{}}}}}",
            stage.id,
            fields.join(", ")
        );
        return Ok(());
    }

    println!("Available Stages");
    println!("================");
    println!();
    println!("  {:10}  {:12}  {}", "Id", "Name", "Description");
    println!("  {:10}  {:12}  {}", "--", "----", "-----------");
    for stage in registry.all_stages() {
        println!("  {:10}  {:12}  {}", stage.id, stage.name, stage.description);
    }
    println!();
    println!("Use 'mixtree stages <STAGE>' for its config keys.");

    Ok(())
}
