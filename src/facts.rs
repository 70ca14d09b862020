//! Fact gathering and loading.
//!
//! A run's fact store starts from a minimal local probe (OS, architecture,
//! distribution identity from `/etc/os-release`) and can be overridden by
//! a flat TOML facts file. Facts are gathered once; the store is immutable
//! for the rest of the run.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use reconcile::{FactStore, FactValue};

/// Gather facts from the local system.
pub fn gather() -> FactStore {
    let mut facts = FactStore::new()
        .with("os", std::env::consts::OS)
        .with("arch", std::env::consts::ARCH);

    if let Ok(content) = std::fs::read_to_string("/etc/os-release") {
        apply_os_release(&mut facts, &content);
    }

    debug!("gathered {} facts", facts.len());
    facts
}

/// Fold `/etc/os-release` fields into distribution facts.
fn apply_os_release(facts: &mut FactStore, content: &str) {
    for line in content.lines() {
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let value = raw.trim().trim_matches('"');
        match key.trim() {
            "NAME" => facts.set("distribution", value),
            "ID" => facts.set("distribution_id", value),
            "VERSION_ID" => {
                // Major version as an integer fact when it parses
                let major = value.split('.').next().unwrap_or(value);
                if let Ok(n) = major.parse::<i64>() {
                    facts.set("distribution_major_version", n);
                }
                facts.set("distribution_version", value);
            }
            _ => {}
        }
    }
}

/// Load a flat TOML facts file.
pub fn load(path: &Path) -> Result<FactStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read facts file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid facts file: {}", path.display()))
}

/// Gathered facts overridden by an optional facts file.
pub fn assemble(override_path: Option<&Path>) -> Result<FactStore> {
    let mut facts = gather();
    if let Some(path) = override_path {
        for (name, value) in load(path)?.iter() {
            facts.set(name, value.clone());
        }
    }
    Ok(facts)
}

/// Render a fact store as a TOML table.
pub fn to_toml(facts: &FactStore) -> String {
    let mut out = String::new();
    for (name, value) in facts.iter() {
        let rendered = match value {
            FactValue::Str(s) => format!("{s:?}"),
            FactValue::Int(i) => i.to_string(),
            FactValue::Bool(b) => b.to_string(),
        };
        out.push_str(&format!("{name} = {rendered}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_release_parsing() {
        let content = r#"
            NAME="Fedora Linux"
            ID=fedora
            VERSION_ID=41
            PRETTY_NAME="Fedora Linux 41 (Workstation Edition)"
        "#;
        let mut facts = FactStore::new();
        apply_os_release(&mut facts, content);

        assert_eq!(
            facts.get("distribution"),
            Some(&FactValue::Str("Fedora Linux".into()))
        );
        assert_eq!(
            facts.get("distribution_id"),
            Some(&FactValue::Str("fedora".into()))
        );
        assert_eq!(
            facts.get("distribution_major_version"),
            Some(&FactValue::Int(41))
        );
    }

    #[test]
    fn test_dotted_version_takes_major() {
        let mut facts = FactStore::new();
        apply_os_release(&mut facts, "VERSION_ID=\"9.4\"\n");
        assert_eq!(
            facts.get("distribution_major_version"),
            Some(&FactValue::Int(9))
        );
        assert_eq!(
            facts.get("distribution_version"),
            Some(&FactValue::Str("9.4".into()))
        );
    }

    #[test]
    fn test_assemble_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.toml");
        std::fs::write(&path, "distribution = \"CentOS\"\ndistribution_major_version = 9\n")
            .unwrap();

        let facts = assemble(Some(&path)).unwrap();
        assert_eq!(
            facts.get("distribution"),
            Some(&FactValue::Str("CentOS".into()))
        );
        assert_eq!(
            facts.get("distribution_major_version"),
            Some(&FactValue::Int(9))
        );
        // Gathered facts the file does not mention survive
        assert!(facts.get("os").is_some());
    }

    #[test]
    fn test_facts_file_roundtrip() {
        let facts: FactStore =
            toml::from_str("distribution = \"Fedora\"\nleaf_only_unsupported = true\nspindles = 4\n")
                .unwrap();
        assert_eq!(
            facts.get("distribution"),
            Some(&FactValue::Str("Fedora".into()))
        );
        assert_eq!(
            facts.get("leaf_only_unsupported"),
            Some(&FactValue::Bool(true))
        );
        assert_eq!(facts.get("spindles"), Some(&FactValue::Int(4)));

        let rendered = to_toml(&facts);
        let reparsed: FactStore = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, facts);
    }
}
