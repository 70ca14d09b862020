//! `converge validate` - load a playbook without executing anything.
//!
//! Runs the same resolution and schema checks a real run would: include
//! cycles, unknown lists, and invalid descriptors all fail here.

use anyhow::{Context, Result};
use colored::Colorize;

use reconcile::TaskGraph;

use crate::cli::ValidateArgs;
use crate::commands::run::validation_registry;
use crate::playbook;

pub fn run(args: &ValidateArgs) -> Result<()> {
    let source = playbook::load(&args.playbook)?;
    let registry = validation_registry();
    let graph = TaskGraph::resolve(&source, &args.entry, &registry)
        .with_context(|| format!("could not load playbook: {}", args.playbook.display()))?;

    println!(
        "{} {} is valid: {} actions from entry '{}'",
        "✓".green(),
        args.playbook.display(),
        graph.action_count(),
        args.entry
    );
    Ok(())
}
