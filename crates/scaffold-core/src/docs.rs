//! Markdown documentation of the patterns recorded for one category.

use std::fmt::Write as _;

use crate::indexer::patterns::CategoryCatalog;
use crate::models::Category;

fn title(value: &str) -> String {
    value
        .split('_')
        .map(crate::generation::engine::capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn bullet_list(out: &mut String, items: impl IntoIterator<Item = impl AsRef<str>>) {
    let mut any = false;
    for item in items {
        any = true;
        let _ = writeln!(out, "- {}", item.as_ref());
    }
    if !any {
        out.push_str("- none recorded\n");
    }
}

/// Render the catalog for `category`. A category with nothing recorded still
/// gets every section.
pub fn generate_documentation(category: Category, catalog: Option<&CategoryCatalog>) -> String {
    let empty = CategoryCatalog::default();
    let catalog = catalog.unwrap_or(&empty);
    let mut doc = String::new();

    let _ = writeln!(doc, "# {} Patterns\n", title(category.as_str()));

    doc.push_str("## Common Method Patterns\n");
    if catalog.method_patterns.is_empty() {
        doc.push_str("- none recorded\n");
    }
    for pattern in &catalog.method_patterns {
        let _ = writeln!(doc, "- {}", pattern.name);
        let _ = writeln!(doc, "  - Arguments: {}", pattern.argument_names.join(", "));
        let _ = writeln!(doc, "  - Decorators: {}", pattern.decorator_names.join(", "));
        doc.push_str("  - Characteristics:\n");
        for (label, value) in pattern.characteristics() {
            let _ = writeln!(doc, "    - {label}: {value}");
        }
    }

    doc.push_str("\n## Error Handling Patterns\n");
    if catalog.error_handling.is_empty() {
        doc.push_str("- none recorded\n");
    }
    for pattern in &catalog.error_handling {
        let _ = writeln!(doc, "- Handles exceptions: {}", pattern.exceptions.join(", "));
        let _ = writeln!(doc, "  - Has finally block: {}", pattern.has_finally);
        let _ = writeln!(doc, "  - Has else block: {}", pattern.has_else);
    }

    doc.push_str("\n## Naming Conventions\n");
    if catalog.naming.is_empty() {
        doc.push_str("- none recorded\n");
    }
    for (key, names) in catalog.naming.iter() {
        let _ = writeln!(doc, "### {}", title(key));
        bullet_list(&mut doc, names);
    }

    doc.push_str("\n## Component Relationships\n");
    bullet_list(&mut doc, &catalog.relationships);

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::patterns::PatternExtractor;

    const SRC: &str = "\
from helper.Response import Response

class UserController:
    def get(self, data):
        try:
            return Response.success(data)
        except (KeyError, ValueError):
            return Response.bad_request('bad')
";

    #[test]
    fn test_sections_in_order() {
        let extraction = PatternExtractor::new()
            .unwrap()
            .extract(SRC, Category::Controller, "controller/UserController.py")
            .unwrap();
        let mut catalog = crate::indexer::patterns::PatternCatalog::default();
        catalog.absorb(Category::Controller, &extraction);

        let doc = generate_documentation(Category::Controller, catalog.get(Category::Controller));
        assert!(doc.starts_with("# Controller Patterns\n"));
        let order = [
            "## Common Method Patterns",
            "## Error Handling Patterns",
            "## Naming Conventions",
            "## Component Relationships",
        ];
        let positions: Vec<usize> = order.iter().map(|h| doc.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(doc.contains("- get\n  - Arguments: self, data\n"));
        assert!(doc.contains("    - Returns Response Wrapper: true"));
        assert!(doc.contains("- Handles exceptions: KeyError, ValueError"));
        assert!(doc.contains("### Controller Class\n- UserController"));
        assert!(doc.contains("- helper.Response"));
    }

    #[test]
    fn test_empty_category_still_renders() {
        let doc = generate_documentation(Category::Table, None);
        assert!(doc.starts_with("# Table Patterns"));
        assert_eq!(doc.matches("- none recorded").count(), 4);
    }
}
