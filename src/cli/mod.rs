// ============================================================
// CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and prints reports. All real work
// is delegated to the application layer.
//
//   `inspect` : label table summary
//   `check`   : one batch through the model

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{CheckArgs, Commands, InspectArgs};

#[derive(Parser, Debug)]
#[command(
    name = "product-classifier",
    version,
    about = "Prepare product photo datasets and run the category/condition classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Inspect(args) => run_inspect(args),
            Commands::Check(args)   => run_check(args),
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::{ClassSummary, InspectUseCase};

    let report = InspectUseCase::new(args.data.into_config()?).execute()?;

    let print_table = |title: &str, classes: &[ClassSummary]| {
        println!("\n{title} ({} classes)", classes.len());
        println!("  {:>4}  {:<24} {:>8} {:>10}", "id", "label", "count", "weight");
        for c in classes {
            println!("  {:>4}  {:<24} {:>8} {:>10.4}", c.id, c.label, c.count, c.weight);
        }
    };

    println!("Records: {}", report.records);
    print_table("Categories", &report.categories);
    print_table("Conditions", &report.conditions);
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    use crate::application::check_use_case::CheckUseCase;

    let report = CheckUseCase::new(args.try_into()?).execute()?;

    println!("Category logits:  {:?}", report.category_logits);
    println!("Condition logits: {:?}", report.condition_logits);
    for p in &report.predictions {
        println!("  {:<12} → {} / {}", p.id, p.category, p.condition);
    }
    Ok(())
}
