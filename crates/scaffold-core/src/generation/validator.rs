//! Post-generation checks over a [`GeneratedBundle`].
//!
//! Findings are warnings only. The bundle is never edited or withheld.

use indexmap::IndexMap;
use regex::Regex;

use crate::config::{default_framework_denylist, EngineConfig};
use crate::generation::engine::GENERATED_FILE;
use crate::models::{
    Diagnostic, GeneratedBundle, InterfaceContract, Severity, CONTROLLER_CONTRACT, MODEL_CONTRACT,
};

fn def_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+{}[ \t]*\(", regex::escape(name)))
        .unwrap()
}

fn line_at(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

struct AliasRule {
    entry: &'static str,
    alias: &'static str,
    canonical: &'static str,
    pattern: Regex,
}

pub struct GeneratedCodeValidator {
    alias_rules: Vec<AliasRule>,
    list_def: Regex,
    denylist: IndexMap<String, Vec<String>>,
}

impl Default for GeneratedCodeValidator {
    fn default() -> Self {
        Self::new(default_framework_denylist())
    }
}

impl GeneratedCodeValidator {
    pub fn new(denylist: IndexMap<String, Vec<String>>) -> Self {
        let mut alias_rules = Vec::new();
        let contracts: [(&'static str, &InterfaceContract); 2] =
            [("model", &MODEL_CONTRACT), ("controller", &CONTROLLER_CONTRACT)];
        for (entry, contract) in contracts {
            for &(alias, canonical) in contract.aliases {
                alias_rules.push(AliasRule {
                    entry,
                    alias,
                    canonical,
                    pattern: def_regex(alias),
                });
            }
        }
        Self {
            alias_rules,
            list_def: def_regex("list"),
            denylist,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.framework_denylist.clone())
    }

    /// Every finding for `bundle`, in entry order. An empty bundle has none.
    pub fn check(&self, bundle: &GeneratedBundle) -> Vec<Diagnostic> {
        if bundle.is_empty() {
            return Vec::new();
        }
        let mut diagnostics = Vec::new();

        for (entry, text) in bundle.entries() {
            for rule in self.alias_rules.iter().filter(|r| r.entry == entry) {
                if let Some(m) = rule.pattern.find(text) {
                    diagnostics.push(Diagnostic::new(
                        GENERATED_FILE,
                        line_at(text, m.start()),
                        format!(
                            "Generated {entry} uses disallowed alias '{}' for '{}'",
                            rule.alias, rule.canonical
                        ),
                        Severity::Warning,
                    ));
                }
            }
            if entry == "model" && !self.list_def.is_match(text) {
                diagnostics.push(Diagnostic::new(
                    GENERATED_FILE,
                    1,
                    "Generated model is missing a 'list' method",
                    Severity::Warning,
                ));
            }
            if let Some(d) = self.framework_reference(entry, text) {
                diagnostics.push(d);
            }
        }
        diagnostics
    }

    /// First denylisted marker found in `text`, if any.
    fn framework_reference(&self, entry: &str, text: &str) -> Option<Diagnostic> {
        for (framework, markers) in &self.denylist {
            for marker in markers {
                if let Some(offset) = text.find(marker.as_str()) {
                    return Some(Diagnostic::new(
                        GENERATED_FILE,
                        line_at(text, offset),
                        format!(
                            "Generated {entry} references external framework {framework} via '{marker}'"
                        ),
                        Severity::Warning,
                    ));
                }
            }
        }
        None
    }
}
