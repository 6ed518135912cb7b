//! Declaration files
//!
//! A declaration describes one resource: its lifecycle commands, its inputs,
//! where commands run, and its update and read rules. Files are TOML or JSON,
//! picked by extension.

use anyhow::{Context, Result, bail};
use reconcile::{Declaration, NameSet, ReadRule, RuleSet, UpdateRule, VarMap};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shellkit::Connection;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Variable names usable as environment variable suffixes
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$")
        .unwrap_or_else(|e| unreachable!("invalid name pattern: {e}"))
});

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Unsupported file type: {} (expected .toml or .json)",
                path.display()
            ),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            Self::Toml => toml::from_str(content).context("Invalid TOML format"),
            Self::Json => serde_json::from_str(content).context("Invalid JSON format"),
        }
    }
}

/// One resource as written in a declaration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    /// Command run once when the instance is created
    #[serde(default)]
    pub create: Option<String>,

    /// Command run when the instance is destroyed
    #[serde(default)]
    pub destroy: Option<String>,

    /// Input values; `null` in JSON means not known yet
    #[serde(default)]
    pub inputs: VarMap,

    #[serde(default)]
    pub connection: Connection,

    #[serde(default, rename = "update")]
    pub updates: Vec<UpdateRule>,

    #[serde(default, rename = "read")]
    pub reads: Vec<ReadRule>,
}

/// A declaration ready to plan and apply
#[derive(Debug)]
pub struct LoadedDeclaration {
    pub declaration: Declaration,
    pub inputs: VarMap,
    pub connection: Connection,
}

impl DeclarationFile {
    /// Read and parse a declaration file
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let file: Self = format
            .parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::debug!(
            "Loaded {} ({} update rules, {} read rules)",
            path.display(),
            file.updates.len(),
            file.reads.len()
        );
        Ok(file)
    }

    /// Check field-level constraints, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for name in self.inputs.keys() {
            check_name(&mut problems, "input", name);
        }

        for (n, rule) in self.updates.iter().enumerate() {
            let label = format!("update rule #{}", n + 1);
            if rule.triggers == NameSet::Empty {
                problems.push(format!("{label}: triggers must list at least one input"));
            }
            for name in rule.triggers.declared().unwrap_or_default() {
                check_name(&mut problems, &format!("{label} trigger"), name);
            }
            for name in rule.invalidates.declared().unwrap_or_default() {
                check_name(&mut problems, &format!("{label} invalidation"), name);
            }
            if rule.cmd.trim().is_empty() {
                problems.push(format!("{label}: cmd is empty"));
            }
        }

        let mut seen = HashSet::new();
        for read in &self.reads {
            check_name(&mut problems, "read", &read.name);
            if !seen.insert(read.name.as_str()) {
                problems.push(format!("read `{}` is declared more than once", read.name));
            }
            if read.cmd.trim().is_empty() {
                problems.push(format!("read `{}`: cmd is empty", read.name));
            }
        }

        if !problems.is_empty() {
            bail!("Invalid declaration:\n  - {}", problems.join("\n  - "));
        }
        Ok(())
    }

    /// Validate and turn the file into an engine declaration
    pub fn into_declaration(self) -> Result<LoadedDeclaration> {
        self.validate()?;
        let rules = RuleSet::new(self.updates, self.reads)?;
        Ok(LoadedDeclaration {
            declaration: Declaration::new(self.create, self.destroy, rules),
            inputs: self.inputs,
            connection: self.connection,
        })
    }
}

fn check_name(problems: &mut Vec<String>, kind: &str, name: &str) {
    if !NAME_PATTERN.is_match(name) {
        problems.push(format!(
            "{kind} name `{name}` must start with a letter and contain only letters, digits and underscores"
        ));
    }
}

/// Load, validate and build a declaration in one step
pub fn load(path: &Path) -> Result<LoadedDeclaration> {
    DeclarationFile::load(path)?
        .into_declaration()
        .with_context(|| format!("Invalid declaration in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Value;
    use std::io::Write;

    const TOML_DECL: &str = r#"
create = "mkdir -p /srv/$INPUT_name"
destroy = "rm -rf /srv/$INPUT_name"

[inputs]
name = "data"
mode = "0755"

[connection]
type = "ssh"
hostname = "storage.internal"

[[update]]
triggers = ["mode"]
invalidates = []
cmd = "chmod $INPUT_mode /srv/$INPUT_name"

[[update]]
cmd = "echo fallback"

[[read]]
name = "owner"
cmd = "stat -c %U /srv/$INPUT_name"
"#;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.yaml")).is_err());
        assert_eq!(ConfigFormat::Json.extension(), "json");
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "disk.toml", TOML_DECL);

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.inputs["mode"], Value::known("0755"));
        assert!(matches!(
            loaded.connection,
            Connection::Ssh(ref p) if p.hostname == "storage.internal"
        ));

        let rules = &loaded.declaration.rules;
        assert_eq!(rules.updates()[0].invalidates, NameSet::Empty);
        assert!(rules.updates()[1].is_fallback());
        assert!(rules.updates()[1].invalidates.is_unset());
        assert_eq!(rules.output_names().collect::<Vec<_>>(), ["owner"]);
    }

    #[test]
    fn test_load_json_with_unknown_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "disk.json",
            r#"{"inputs": {"size": null}, "read": [{"name": "used", "cmd": "df"}]}"#,
        );

        let loaded = load(&path).unwrap();
        assert!(loaded.inputs["size"].is_unknown());
        assert_eq!(loaded.connection, Connection::Local);
        assert!(loaded.declaration.create.is_none());
    }

    #[test]
    fn test_field_validation_reports_everything() {
        let file = DeclarationFile {
            inputs: [("9lives".to_string(), Value::known("x"))].into_iter().collect(),
            updates: vec![UpdateRule::new(NameSet::Empty, NameSet::Unset, "true")],
            reads: vec![ReadRule::new("out", "cat"), ReadRule::new("out", "cat")],
            ..Default::default()
        };

        let err = file.validate().unwrap_err().to_string();
        assert!(err.contains("input name `9lives`"));
        assert!(err.contains("update rule #1: triggers must list at least one input"));
        assert!(err.contains("read `out` is declared more than once"));
    }

    #[test]
    fn test_ambiguous_rules_are_rejected() {
        let file = DeclarationFile {
            updates: vec![
                UpdateRule::new(NameSet::of(["a", "b"]), NameSet::Unset, "one"),
                UpdateRule::new(NameSet::of(["b", "c"]), NameSet::Unset, "two"),
            ],
            ..Default::default()
        };

        let err = file.into_declaration().unwrap_err();
        let authoring = err
            .downcast_ref::<reconcile::Error>()
            .map(reconcile::Error::authoring)
            .unwrap_or_default();
        assert_eq!(authoring.len(), 1);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "typo.toml", "crate = \"true\"\n");
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_nested_typos_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let typos = [
            TOML_DECL.replace("triggers = [\"mode\"]", "trigger = [\"mode\"]"),
            TOML_DECL.replace("invalidates = []", "invalidate = []"),
            TOML_DECL.replace("hostname = \"storage.internal\"", "host = \"storage.internal\""),
            TOML_DECL.replace("name = \"owner\"", "name = \"owner\"\ncommand = \"id\""),
        ];
        for (i, content) in typos.iter().enumerate() {
            assert_ne!(content, TOML_DECL);
            let path = write_file(&dir, &format!("typo{i}.toml"), content);
            assert!(load(&path).is_err(), "accepted {content}");
        }
    }

    #[test]
    fn test_ssh_password_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let content = TOML_DECL.replace(
            "hostname = \"storage.internal\"",
            "hostname = \"storage.internal\"\npassword = \"secret\"",
        );
        let path = write_file(&dir, "password.toml", &content);

        let loaded = load(&path).unwrap();
        let Connection::Ssh(params) = loaded.connection else {
            panic!("expected an ssh connection");
        };
        let err = params.normalize().unwrap_err();
        assert!(err.to_string().starts_with("password is not supported"));
    }

    #[test]
    fn test_name_pattern() {
        assert!(NAME_PATTERN.is_match("a"));
        assert!(NAME_PATTERN.is_match("disk_size2"));
        assert!(!NAME_PATTERN.is_match("_hidden"));
        assert!(!NAME_PATTERN.is_match("with-dash"));
        assert!(!NAME_PATTERN.is_match(""));
    }
}
