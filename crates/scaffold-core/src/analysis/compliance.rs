//! Interface compliance checks for extracted classes.
//!
//! Results are always diagnostics. A class that names the contract's
//! interface among its bases and still misses methods gets an error; every
//! other finding is a warning.

use crate::indexer::patterns::ExtractedClass;
use crate::models::{
    Category, ClassRecord, Diagnostic, InterfaceContract, Severity, CONTROLLER_CONTRACT,
    MODEL_CONTRACT,
};

/// Contract methods the record does not implement, in contract order.
pub fn missing_methods(record: &ClassRecord, contract: &InterfaceContract) -> Vec<&'static str> {
    contract
        .required_methods
        .iter()
        .copied()
        .filter(|m| !record.methods.iter().any(|have| have == m))
        .collect()
}

/// `(alias, canonical)` pairs where the class uses the alias without the
/// canonical name.
pub fn renaming_hints(
    record: &ClassRecord,
    contract: &InterfaceContract,
) -> Vec<(&'static str, &'static str)> {
    let has = |name: &str| record.methods.iter().any(|m| m == name);
    contract
        .aliases
        .iter()
        .copied()
        .filter(|(alias, canonical)| has(*alias) && !has(*canonical))
        .collect()
}

/// Check one class against `contract`. `claims` is true when the class
/// names the contract's interface as a base.
pub fn validate(
    class: &ExtractedClass,
    contract: &InterfaceContract,
    claims: bool,
    file: &str,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let missing = missing_methods(&class.record, contract);
    if !missing.is_empty() {
        let severity = if claims {
            Severity::Error
        } else {
            Severity::Warning
        };
        diagnostics.push(Diagnostic::new(
            file,
            class.line,
            format!(
                "{} {} is missing required methods: {}",
                contract.role,
                class.name,
                missing.join(", ")
            ),
            severity,
        ));
    }

    for (alias, canonical) in renaming_hints(&class.record, contract) {
        diagnostics.push(Diagnostic::new(
            file,
            class.line,
            format!(
                "{} {} uses '{alias}' instead of '{canonical}'; consider renaming '{alias}' to '{canonical}' to match {}",
                contract.role, class.name, contract.interface
            ),
            Severity::Warning,
        ));
    }

    diagnostics
}

/// The contract a class is held to: an explicit interface base wins,
/// otherwise the file's category decides.
pub fn select_contract(
    class: &ExtractedClass,
    category: Category,
) -> Option<(&'static InterfaceContract, bool)> {
    for contract in [&CONTROLLER_CONTRACT, &MODEL_CONTRACT] {
        if class.base_names.iter().any(|b| b == contract.interface) {
            return Some((contract, true));
        }
    }
    category.contract().map(|c| (c, false))
}

/// Select the contract for `class` and validate against it.
pub fn check_class(class: &ExtractedClass, category: Category, file: &str) -> Vec<Diagnostic> {
    match select_contract(class, category) {
        Some((contract, claims)) => validate(class, contract, claims, file),
        None => Vec::new(),
    }
}
