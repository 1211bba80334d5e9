//! Entry-point metadata parsing and entry-point backed discovery.
//!
//! # Responsibility
//! - Parse the INI-style entry-point format (`[group]` headers followed by
//!   `name = module.path:attr.path [extras]` lines).
//! - Resolve entry targets through a host-provided symbol table.
//!
//! # Invariants
//! - Entry names are kept verbatim; name grammar is enforced by the registrar,
//!   not by the parser.
//! - Entries keep file order within and across groups.

use crate::extension::discovery::{
    AdvertisedExtension, DiscoverySource, ExtensionKey, ResolutionError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object reference an entry point resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryTarget {
    /// Dotted module path, e.g. `interpret_ext.glassbox`.
    pub module: String,
    /// Dotted attribute path inside `module`; `None` targets the module itself.
    pub attr: Option<String>,
}

impl EntryTarget {
    /// Parses `module.path[:attr.path]`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (module, attr) = match value.split_once(':') {
            Some((module, attr)) => (module.trim(), Some(attr.trim())),
            None => (value, None),
        };
        if !is_dotted_path(module) {
            return None;
        }
        if let Some(attr) = attr {
            if !is_dotted_path(attr) {
                return None;
            }
        }
        Some(Self {
            module: module.to_string(),
            attr: attr.map(str::to_string),
        })
    }

    /// Canonical `module:attr` reference used as symbol table key.
    pub fn reference(&self) -> String {
        self.to_string()
    }
}

impl Display for EntryTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.attr {
            Some(attr) => write!(f, "{}:{}", self.module, attr),
            None => f.write_str(&self.module),
        }
    }
}

/// One advertised entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub group: String,
    pub name: String,
    pub target: EntryTarget,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
}

impl Display for EntryPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.target)?;
        if !self.extras.is_empty() {
            write!(f, " [{}]", self.extras.join(","))?;
        }
        Ok(())
    }
}

/// Parsed entry-point metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointTable {
    entries: Vec<EntryPoint>,
}

impl EntryPointTable {
    /// Parses entry-point metadata text.
    ///
    /// # Errors
    /// - Returns the first syntax error with its 1-based line number.
    pub fn parse(text: &str) -> Result<Self, EntryPointParseError> {
        let mut entries = Vec::new();
        let mut group: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(EntryPointParseError::UnterminatedHeader { line: line_no });
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(EntryPointParseError::EmptyGroup { line: line_no });
                }
                group = Some(name.to_string());
                continue;
            }

            let Some(current_group) = group.as_ref() else {
                return Err(EntryPointParseError::EntryOutsideGroup { line: line_no });
            };
            let Some((name, value)) = line.split_once('=') else {
                return Err(EntryPointParseError::MissingSeparator { line: line_no });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(EntryPointParseError::EmptyName { line: line_no });
            }

            let (target_text, extras) = split_extras(value.trim());
            let Some(target) = EntryTarget::parse(target_text) else {
                return Err(EntryPointParseError::InvalidTarget {
                    line: line_no,
                    target: value.trim().to_string(),
                });
            };

            entries.push(EntryPoint {
                group: current_group.clone(),
                name: name.to_string(),
                target,
                extras,
            });
        }

        Ok(Self { entries })
    }

    /// Reads and parses one entry-point metadata file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EntryPointParseError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| EntryPointParseError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries advertised under `key`, in file order.
    pub fn group<'a>(
        &'a self,
        key: &'a ExtensionKey,
    ) -> impl Iterator<Item = &'a EntryPoint> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.group == key.as_str())
    }

    /// Returns sorted, de-duplicated group names.
    pub fn groups(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.group.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Declaration-only discovery: every entry resolves to its own metadata.
impl DiscoverySource<EntryPoint> for EntryPointTable {
    fn discover(&self, key: &ExtensionKey) -> Vec<AdvertisedExtension<EntryPoint>> {
        self.group(key)
            .map(|entry| {
                let resolved = entry.clone();
                AdvertisedExtension::new(entry.name.clone(), move || Ok(resolved))
                    .with_descriptor(entry.to_string())
            })
            .collect()
    }
}

/// Host-provided mapping from `module:attr` references to entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable<T> {
    symbols: BTreeMap<String, T>,
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self {
            symbols: BTreeMap::new(),
        }
    }
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines the entity a reference resolves to.
    pub fn define(&mut self, reference: impl Into<String>, entity: T) -> &mut Self {
        self.symbols.insert(reference.into(), entity);
        self
    }

    pub fn resolve(&self, target: &EntryTarget) -> Option<&T> {
        self.symbols.get(target.reference().as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Entry-point metadata resolved through a symbol table.
#[derive(Debug, Clone)]
pub struct EntryPointDiscovery<T> {
    table: EntryPointTable,
    symbols: Arc<SymbolTable<T>>,
}

impl<T> EntryPointDiscovery<T> {
    pub fn new(table: EntryPointTable, symbols: SymbolTable<T>) -> Self {
        Self {
            table,
            symbols: Arc::new(symbols),
        }
    }

    pub fn table(&self) -> &EntryPointTable {
        &self.table
    }
}

impl<T: Clone + 'static> DiscoverySource<T> for EntryPointDiscovery<T> {
    fn discover(&self, key: &ExtensionKey) -> Vec<AdvertisedExtension<T>> {
        self.table
            .group(key)
            .map(|entry| {
                let symbols = Arc::clone(&self.symbols);
                let target = entry.target.clone();
                AdvertisedExtension::new(entry.name.clone(), move || {
                    symbols.resolve(&target).cloned().ok_or_else(|| {
                        ResolutionError::new(format!(
                            "entry point target `{target}` is not defined"
                        ))
                    })
                })
                .with_descriptor(entry.to_string())
            })
            .collect()
    }
}

fn split_extras(value: &str) -> (&str, Vec<String>) {
    let Some(without_close) = value.strip_suffix(']') else {
        return (value, vec![]);
    };
    let Some((target, extras)) = without_close.rsplit_once('[') else {
        return (value, vec![]);
    };
    let extras = extras
        .split(',')
        .map(str::trim)
        .filter(|extra| !extra.is_empty())
        .map(str::to_string)
        .collect();
    (target.trim(), extras)
}

fn is_dotted_path(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Entry-point metadata read/parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPointParseError {
    Io { path: PathBuf, message: String },
    UnterminatedHeader { line: usize },
    EmptyGroup { line: usize },
    EntryOutsideGroup { line: usize },
    MissingSeparator { line: usize },
    EmptyName { line: usize },
    InvalidTarget { line: usize, target: String },
}

impl Display for EntryPointParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read entry points `{}`: {message}", path.display())
            }
            Self::UnterminatedHeader { line } => {
                write!(f, "line {line}: group header is missing closing `]`")
            }
            Self::EmptyGroup { line } => write!(f, "line {line}: group name must not be empty"),
            Self::EntryOutsideGroup { line } => {
                write!(f, "line {line}: entry appears before any group header")
            }
            Self::MissingSeparator { line } => {
                write!(f, "line {line}: expected `name = module:attr`")
            }
            Self::EmptyName { line } => write!(f, "line {line}: entry name must not be empty"),
            Self::InvalidTarget { line, target } => {
                write!(f, "line {line}: entry target is invalid: {target}")
            }
        }
    }
}

impl Error for EntryPointParseError {}

#[cfg(test)]
mod tests {
    use super::{
        EntryPointDiscovery, EntryPointParseError, EntryPointTable, EntryTarget, SymbolTable,
    };
    use crate::extension::discovery::{DiscoverySource, ExtensionKey};

    const SAMPLE: &str = "\
# installed by interpret-ext
[interpret_ext_blackbox]
ShapKernel = interpret_ext.blackbox:ShapKernel

[interpret_ext_glassbox]
Linear = interpret_ext.glassbox.linear:LinearExplainer [viz, fast]
; module-level target
Rules = interpret_ext.rules
";

    #[test]
    fn parses_groups_targets_and_extras() {
        let table = EntryPointTable::parse(SAMPLE).expect("sample should parse");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.groups(),
            vec!["interpret_ext_blackbox", "interpret_ext_glassbox"]
        );

        let linear = &table.entries()[1];
        assert_eq!(linear.group, "interpret_ext_glassbox");
        assert_eq!(linear.name, "Linear");
        assert_eq!(linear.target.module, "interpret_ext.glassbox.linear");
        assert_eq!(linear.target.attr.as_deref(), Some("LinearExplainer"));
        assert_eq!(linear.extras, vec!["viz", "fast"]);
        assert_eq!(
            linear.to_string(),
            "Linear = interpret_ext.glassbox.linear:LinearExplainer [viz,fast]"
        );

        let rules = &table.entries()[2];
        assert_eq!(rules.target.attr, None);
        assert_eq!(rules.to_string(), "Rules = interpret_ext.rules");
    }

    #[test]
    fn keeps_invalid_names_for_the_registrar() {
        let table = EntryPointTable::parse("[k]\n1bad = pkg:Thing\n").expect("parse");
        assert_eq!(table.entries()[0].name, "1bad");
    }

    #[test]
    fn reports_syntax_errors_with_line_numbers() {
        assert_eq!(
            EntryPointTable::parse("Foo = pkg:Foo").expect_err("entry before header must fail"),
            EntryPointParseError::EntryOutsideGroup { line: 1 }
        );
        assert_eq!(
            EntryPointTable::parse("[k\nFoo = pkg:Foo")
                .expect_err("unterminated header must fail"),
            EntryPointParseError::UnterminatedHeader { line: 1 }
        );
        assert_eq!(
            EntryPointTable::parse("[ ]").expect_err("empty group must fail"),
            EntryPointParseError::EmptyGroup { line: 1 }
        );
        assert_eq!(
            EntryPointTable::parse("[k]\n\nFoo pkg:Foo")
                .expect_err("missing separator must fail"),
            EntryPointParseError::MissingSeparator { line: 3 }
        );
        assert_eq!(
            EntryPointTable::parse("[k]\n = pkg:Foo").expect_err("empty name must fail"),
            EntryPointParseError::EmptyName { line: 2 }
        );
        assert!(matches!(
            EntryPointTable::parse("[k]\nFoo = pkg:").expect_err("empty attr must fail"),
            EntryPointParseError::InvalidTarget { line: 2, .. }
        ));
        assert!(matches!(
            EntryPointTable::parse("[k]\nFoo = pkg..mod:Foo")
                .expect_err("empty module segment must fail"),
            EntryPointParseError::InvalidTarget { line: 2, .. }
        ));
    }

    #[test]
    fn target_reference_round_trips_through_display() {
        let target = EntryTarget::parse(" pkg.mod : Outer.Inner ").expect("target");
        assert_eq!(target.reference(), "pkg.mod:Outer.Inner");
        assert_eq!(
            EntryTarget::parse("pkg.mod"),
            Some(EntryTarget {
                module: "pkg.mod".to_string(),
                attr: None,
            })
        );
    }

    #[test]
    fn table_discovery_resolves_entries_to_their_metadata() {
        let table = EntryPointTable::parse(SAMPLE).expect("parse");
        let key = ExtensionKey::from("interpret_ext_glassbox");
        let entries = table.discover(&key);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].descriptor(),
            "Linear = interpret_ext.glassbox.linear:LinearExplainer [viz,fast]"
        );

        let resolved = entries
            .into_iter()
            .next()
            .expect("first entry")
            .load()
            .expect("declaration-only load");
        assert_eq!(resolved.name, "Linear");
    }

    #[test]
    fn symbol_discovery_fails_resolution_for_undefined_targets() {
        let table = EntryPointTable::parse(SAMPLE).expect("parse");
        let mut symbols = SymbolTable::new();
        symbols.define("interpret_ext.glassbox.linear:LinearExplainer", 11_u32);
        let source = EntryPointDiscovery::new(table, symbols);

        let mut entries = source
            .discover(&ExtensionKey::from("interpret_ext_glassbox"))
            .into_iter();
        let linear = entries.next().expect("linear entry");
        assert_eq!(linear.load().expect("defined target"), 11);

        let rules = entries.next().expect("rules entry");
        let err = rules.load().expect_err("undefined target must fail");
        assert!(err.message().contains("`interpret_ext.rules`"));
    }
}
