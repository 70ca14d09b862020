//! Playbook document loading.
//!
//! A playbook is a TOML document of named task lists. Each entry declares
//! exactly one of: a resource (`package`, `group`, `repository`, `command`,
//! `service`), an `include` of another list, or a `block` with an optional
//! `always` cleanup sequence. Guards live under `when`.
//!
//! ```toml
//! [[tasks.main]]
//! name = "remove legacy tools"
//! package = { names = ["bc", "sos"], state = "absent" }
//! when = { fact = "distribution", in = ["RedHat", "CentOS", "Fedora"] }
//!
//! [[tasks.main]]
//! include = "cleanup"
//! ```
//!
//! This module only shapes the document into a [`GraphSource`]; include
//! resolution, cycle detection, and driver schema checks happen in the
//! reconcile crate when the graph is resolved.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use reconcile::{
    Action, CmpOp, Condition, Descriptor, FactValue, GraphSource, TargetState, TaskNode,
};

/// Top-level playbook document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybookDoc {
    #[serde(default)]
    pub tasks: BTreeMap<String, Vec<TaskEntry>>,
}

/// One task entry as written in the document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TaskEntry {
    /// Optional stable name; synthesized from position when absent
    name: Option<String>,
    package: Option<PackageSpec>,
    group: Option<NamedSpec>,
    repository: Option<RepoSpec>,
    command: Option<String>,
    service: Option<NamedSpec>,
    include: Option<String>,
    block: Option<Vec<TaskEntry>>,
    always: Option<Vec<TaskEntry>>,
    when: Option<WhenClause>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageSpec {
    #[serde(alias = "name")]
    names: OneOrMany,
    #[serde(default = "default_state")]
    state: TargetState,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamedSpec {
    name: String,
    #[serde(default = "default_state")]
    state: TargetState,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RepoSpec {
    id: String,
    #[serde(default = "default_state")]
    state: TargetState,
}

fn default_state() -> TargetState {
    TargetState::Present
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// Guard clause as written in the document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WhenClause {
    fact: Option<String>,
    #[serde(rename = "in")]
    member_of: Option<Vec<String>>,
    eq: Option<FactValue>,
    lt: Option<i64>,
    le: Option<i64>,
    gt: Option<i64>,
    ge: Option<i64>,
    not: Option<Box<WhenClause>>,
    all: Option<Vec<WhenClause>>,
    any: Option<Vec<WhenClause>>,
}

impl WhenClause {
    fn into_condition(self) -> Result<Condition> {
        // Combinator forms stand alone
        if let Some(inner) = self.not {
            return Ok(Condition::Not(Box::new(inner.into_condition()?)));
        }
        if let Some(clauses) = self.all {
            let conds = clauses
                .into_iter()
                .map(WhenClause::into_condition)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Condition::All(conds));
        }
        if let Some(clauses) = self.any {
            let conds = clauses
                .into_iter()
                .map(WhenClause::into_condition)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Condition::Any(conds));
        }

        let Some(fact) = self.fact else {
            bail!("when clause needs a 'fact' or one of 'not'/'all'/'any'");
        };

        let cmp = [
            (self.lt, CmpOp::Lt),
            (self.le, CmpOp::Le),
            (self.gt, CmpOp::Gt),
            (self.ge, CmpOp::Ge),
        ]
        .into_iter()
        .find_map(|(value, op)| value.map(|v| (op, v)));

        match (self.member_of, self.eq, cmp) {
            (Some(values), None, None) => Ok(Condition::In { fact, values }),
            (None, Some(value), None) => Ok(Condition::Eq { fact, value }),
            (None, None, Some((op, value))) => Ok(Condition::Cmp { fact, op, value }),
            (None, None, None) => Ok(Condition::Truthy { fact }),
            _ => bail!("when clause for fact '{fact}' mixes multiple operators"),
        }
    }
}

/// Load a playbook document from disk.
pub fn load(path: &Path) -> Result<GraphSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read playbook: {}", path.display()))?;
    let doc: PlaybookDoc = toml::from_str(&content)
        .with_context(|| format!("invalid playbook: {}", path.display()))?;
    to_source(doc)
}

/// Convert a parsed document into a graph source.
pub fn to_source(doc: PlaybookDoc) -> Result<GraphSource> {
    let mut source = GraphSource::new();
    for (list, entries) in doc.tasks {
        let mut nodes = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let default_id = format!("{list}[{index}]");
            nodes.push(convert_entry(entry, &default_id)?);
        }
        source.add_list(list, nodes);
    }
    Ok(source)
}

fn convert_entry(entry: TaskEntry, default_id: &str) -> Result<TaskNode> {
    let id = entry.name.unwrap_or_else(|| default_id.to_string());
    let when = entry
        .when
        .map(WhenClause::into_condition)
        .transpose()
        .with_context(|| format!("task '{id}'"))?;

    let mut descriptors: Vec<Descriptor> = Vec::new();
    if let Some(spec) = entry.package {
        descriptors.push(Descriptor::Package {
            names: spec.names.into_vec(),
            state: spec.state,
        });
    }
    if let Some(spec) = entry.group {
        descriptors.push(Descriptor::Group {
            name: spec.name,
            state: spec.state,
        });
    }
    if let Some(spec) = entry.repository {
        descriptors.push(Descriptor::Repository {
            id: spec.id,
            state: spec.state,
        });
    }
    if let Some(command) = entry.command {
        descriptors.push(Descriptor::Command { command });
    }
    if let Some(spec) = entry.service {
        descriptors.push(Descriptor::Service {
            name: spec.name,
            state: spec.state,
        });
    }

    let shapes =
        descriptors.len() + usize::from(entry.include.is_some()) + usize::from(entry.block.is_some());
    if shapes != 1 {
        bail!(
            "task '{id}' must declare exactly one of: a resource, 'include', or 'block' (found {shapes})"
        );
    }
    if entry.always.is_some() && entry.block.is_none() {
        bail!("task '{id}' has 'always' without 'block'");
    }

    if let Some(descriptor) = descriptors.pop() {
        return Ok(TaskNode::Action(Action {
            id,
            descriptor,
            when,
        }));
    }

    if let Some(list) = entry.include {
        return Ok(TaskNode::Include { list, when });
    }

    // Remaining shape is a block
    let body = entry
        .block
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, child)| convert_entry(child, &format!("{id}.body[{i}]")))
        .collect::<Result<Vec<_>>>()?;
    let always = entry
        .always
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, child)| convert_entry(child, &format!("{id}.always[{i}]")))
        .collect::<Result<Vec<_>>>()?;

    Ok(TaskNode::Block {
        id,
        when,
        body,
        always,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<GraphSource> {
        to_source(toml::from_str(toml_text).expect("document parses"))
    }

    const FIXTURE: &str = r#"
        [[tasks.main]]
        name = "remove legacy tools"
        package = { names = ["bc", "sos"], state = "absent" }
        when = { fact = "distribution", in = ["RedHat", "CentOS", "Fedora"] }

        [[tasks.main]]
        group = { name = "Development Tools", state = "absent" }

        [[tasks.main]]
        include = "cleanup"
        when = { fact = "os", eq = "linux" }

        [[tasks.main]]
        name = "repo refresh"
        block = [
            { command = "refresh-metadata" },
        ]
        always = [
            { repository = { id = "copr:stale", state = "absent" } },
        ]

        [[tasks.cleanup]]
        command = "rm -rf /var/cache/stale"
    "#;

    #[test]
    fn test_fixture_parses_into_source() {
        let source = parse(FIXTURE).unwrap();
        let names: Vec<_> = source.list_names().collect();
        assert_eq!(names, ["cleanup", "main"]);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playbook.toml");
        std::fs::write(&path, FIXTURE).unwrap();

        let source = load(&path).unwrap();
        assert!(source.list_names().any(|n| n == "main"));

        let err = load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("could not read playbook"));
    }

    #[test]
    fn test_guard_and_ids() {
        let source = parse(FIXTURE).unwrap();
        // Resolve with permissive drivers to inspect the final shape
        let registry = test_registry();
        let graph = reconcile::TaskGraph::resolve(&source, "main", &registry).unwrap();

        let TaskNode::Action(first) = &graph.nodes()[0] else {
            panic!("expected action");
        };
        assert_eq!(first.id, "remove legacy tools");
        assert_eq!(
            first.when,
            Some(Condition::In {
                fact: "distribution".into(),
                values: vec!["RedHat".into(), "CentOS".into(), "Fedora".into()],
            })
        );

        let TaskNode::Action(second) = &graph.nodes()[1] else {
            panic!("expected action");
        };
        assert_eq!(second.id, "main[1]");

        // Include was flattened and its guard pushed down
        let TaskNode::Action(third) = &graph.nodes()[2] else {
            panic!("expected action");
        };
        assert_eq!(third.id, "cleanup[0]");
        assert!(third.when.is_some());

        let TaskNode::Block { id, body, always, .. } = &graph.nodes()[3] else {
            panic!("expected block");
        };
        assert_eq!(id, "repo refresh");
        assert_eq!(body.len(), 1);
        assert_eq!(always.len(), 1);
    }

    #[test]
    fn test_single_package_name_shorthand() {
        let source = parse(
            r#"
            [[tasks.main]]
            package = { name = "bc", state = "absent" }
            "#,
        )
        .unwrap();
        let registry = test_registry();
        let graph = reconcile::TaskGraph::resolve(&source, "main", &registry).unwrap();
        let TaskNode::Action(action) = &graph.nodes()[0] else {
            panic!("expected action");
        };
        assert_eq!(
            action.descriptor,
            Descriptor::Package {
                names: vec!["bc".into()],
                state: TargetState::Absent,
            }
        );
    }

    #[test]
    fn test_entry_with_two_resources_is_rejected() {
        let err = parse(
            r#"
            [[tasks.main]]
            package = { names = ["bc"] }
            command = "echo hi"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_always_without_block_is_rejected() {
        let err = parse(
            r#"
            [[tasks.main]]
            command = "echo hi"
            always = [ { command = "echo bye" } ]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'always' without 'block'"));
    }

    #[test]
    fn test_mixed_when_operators_rejected() {
        let err = parse(
            r#"
            [[tasks.main]]
            command = "echo hi"
            when = { fact = "x", eq = "y", in = ["z"] }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mixes multiple operators"));
    }

    #[test]
    fn test_when_combinators() {
        let source = parse(
            r#"
            [[tasks.main]]
            command = "echo hi"
            when = { any = [
                { fact = "distribution", eq = "Fedora" },
                { not = { fact = "distribution_major_version", ge = 9 } },
            ] }
            "#,
        )
        .unwrap();
        let registry = test_registry();
        let graph = reconcile::TaskGraph::resolve(&source, "main", &registry).unwrap();
        let TaskNode::Action(action) = &graph.nodes()[0] else {
            panic!("expected action");
        };
        let Some(Condition::Any(clauses)) = &action.when else {
            panic!("expected any");
        };
        assert_eq!(clauses.len(), 2);
        assert!(matches!(clauses[1], Condition::Not(_)));
    }

    /// Registry of real drivers over inert clients, for shape tests.
    fn test_registry() -> reconcile::DriverRegistry {
        use reconcile::drivers::{
            CommandOutput, CommandRunner, GroupClient, GroupDriver, PackageClient, PackageDriver,
            RepoClient, RepoDriver, ServiceClient, ServiceDriver, ShellDriver,
        };
        use reconcile::DriverError;

        struct Inert;
        impl PackageClient for Inert {
            fn installed(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn upgradable(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn install(&self, _: &[String]) -> Result<(), DriverError> {
                Ok(())
            }
            fn upgrade(&self, _: &[String]) -> Result<(), DriverError> {
                Ok(())
            }
            fn remove(&self, _: &[String]) -> Result<(), DriverError> {
                Ok(())
            }
        }
        impl GroupClient for Inert {
            fn installed(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn install(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn remove(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
        }
        impl RepoClient for Inert {
            fn present(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn add(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn remove(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
        }
        impl CommandRunner for Inert {
            fn run(&self, _: &str) -> Result<CommandOutput, DriverError> {
                Ok(CommandOutput {
                    status: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }
        impl ServiceClient for Inert {
            fn registered(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn running(&self, _: &str) -> Result<bool, DriverError> {
                Ok(false)
            }
            fn register(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn unregister(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn start(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn stop(&self, _: &str) -> Result<(), DriverError> {
                Ok(())
            }
        }

        reconcile::DriverRegistry::new()
            .with(Box::new(PackageDriver::new(Box::new(Inert))))
            .with(Box::new(GroupDriver::new(Box::new(Inert), true)))
            .with(Box::new(RepoDriver::new(Box::new(Inert))))
            .with(Box::new(ShellDriver::new(Box::new(Inert))))
            .with(Box::new(ServiceDriver::new(Box::new(Inert))))
    }
}
