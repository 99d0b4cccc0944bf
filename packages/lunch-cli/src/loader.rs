//! Restaurant-file loading.
//!
//! The restaurant file is a YAML mapping from entity name to its
//! fields, e.g.:
//!
//! ```yaml
//! nepal:
//!   url: https://nepal.example.com/menu
//!   selector: "#daily-menu"
//!   tags: [indian, cheap]
//!   filters: [day, newlines]
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use lunch_core::{Entity, Registry};
use tracing::info;

/// Load a registry from a YAML restaurant file.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read restaurant file {}", path.display()))?;
    parse_registry(&content)
        .with_context(|| format!("invalid restaurant file {}", path.display()))
}

/// Parse YAML restaurant definitions, preserving declaration order.
pub fn parse_registry(content: &str) -> Result<Registry> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    let Some(mapping) = doc.as_mapping() else {
        bail!("restaurant file must be a mapping of name to definition");
    };

    let mut registry = Registry::new();
    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            bail!("restaurant names must be strings, got {key:?}");
        };
        let mut value = value.clone();
        match value.as_mapping_mut() {
            Some(fields) => {
                fields.insert("name".into(), name.into());
            }
            None => bail!("definition of `{name}` must be a mapping"),
        }
        let entity: Entity = serde_yaml::from_value(value)
            .with_context(|| format!("invalid definition of `{name}`"))?;
        registry.register(entity, true);
    }

    info!(count = registry.len(), "restaurants loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
nepal:
  url: https://nepal.example.com/menu
  selector: "#daily-menu"
  tags: [indian, cheap]
  filters: [day, newlines]
kocka:
  url: https://kocka.example.com
  resolver: pdf
  disabled: true
scan-bistro:
  url: https://bistro.example.com
  language: ces
  resolver_chain:
    - resolver: request
      raw: true
    - resolver: ocr
      no_cache: true
"##;

    #[test]
    fn test_parse_registry() {
        let registry = parse_registry(SAMPLE).unwrap();
        assert_eq!(registry.len(), 3);

        let nepal = registry.get("nepal").unwrap();
        assert_eq!(nepal.selector.as_deref(), Some("#daily-menu"));
        assert!(nepal.has_tag("indian"));
        assert_eq!(nepal.filters, vec!["day", "newlines"]);

        let kocka = registry.get("kocka").unwrap();
        assert!(kocka.disabled);
        assert_eq!(kocka.resolver_kind(), "pdf");

        let bistro = registry.get("scan-bistro").unwrap();
        assert_eq!(bistro.resolver_kind(), "chain");
        assert_eq!(bistro.resolver_chain.len(), 2);
        assert!(bistro.resolver_chain[0].raw);
        assert!(bistro.resolver_chain[1].no_cache);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let registry = parse_registry(SAMPLE).unwrap();
        let names: Vec<&str> = registry.all().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["nepal", "kocka", "scan-bistro"]);
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(parse_registry("- a\n- b\n").is_err());
        assert!(parse_registry("nepal: just-a-string\n").is_err());
    }
}
