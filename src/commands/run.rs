//! `converge run` - reconcile the system against a playbook.

use anyhow::{Context, Result};
use log::info;

use reconcile::{
    CancelToken, DriverRegistry, Engine, EngineOptions, GroupDriver, PackageDriver, RepoDriver,
    ServiceDriver, ShellDriver, TaskGraph,
};

use crate::cli::{OutputFormat, RunArgs};
use crate::render::{ConsoleObserver, print_summary};
use crate::system::{PkgCli, ShellRunner, SystemctlCli};
use crate::{facts, playbook, signal};

/// Load, resolve, and run the playbook. Returns the process exit code.
pub fn run(args: &RunArgs, quiet: bool) -> Result<i32> {
    let fact_store = facts::assemble(args.facts.as_deref())?;
    let registry = build_registry(&args.pkg_cmd, args.allow_group_cascade);

    let source = playbook::load(&args.playbook)?;
    let graph = TaskGraph::resolve(&source, &args.entry, &registry)
        .with_context(|| format!("could not load playbook: {}", args.playbook.display()))?;
    info!(
        "resolved '{}': {} actions",
        args.entry,
        graph.action_count()
    );

    let token = CancelToken::new();
    signal::install(&token);

    let options = EngineOptions {
        dry_run: args.dry_run,
    };
    let engine = Engine::new(&registry, &fact_store, options);

    let report = match args.format {
        OutputFormat::Text => {
            let mut observer = ConsoleObserver::new(quiet);
            let report = engine.run(&graph, &token, &mut observer)?;
            print_summary(&report);
            report
        }
        OutputFormat::Json => {
            let report = engine.run(&graph, &token, &mut reconcile::NoObserver)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            report
        }
    };

    Ok(report.exit_code())
}

/// Registry for validation only; the clients are never invoked.
pub fn validation_registry() -> DriverRegistry {
    build_registry("dnf", false)
}

/// Wire the built-in drivers to the real system clients.
fn build_registry(pkg_cmd: &str, allow_group_cascade: bool) -> DriverRegistry {
    DriverRegistry::new()
        .with(Box::new(PackageDriver::new(Box::new(PkgCli::new(pkg_cmd)))))
        .with(Box::new(GroupDriver::new(
            Box::new(PkgCli::new(pkg_cmd)),
            allow_group_cascade,
        )))
        .with(Box::new(RepoDriver::new(Box::new(PkgCli::new(pkg_cmd)))))
        .with(Box::new(ShellDriver::new(Box::new(ShellRunner))))
        .with(Box::new(ServiceDriver::new(Box::new(SystemctlCli))))
}
