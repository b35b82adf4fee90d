//! Strategy catalog
//!
//! An ordered, immutable collection of evasion strategy descriptors. The
//! engine argument string stays opaque (it is the nfqws command-line
//! syntax), but each descriptor also exposes a typed [`StrategyKind`]
//! derived from its desync mode for display and diagnostics.
//!
//! Ordering is advisory priority: it drives presentation and the order
//! workers are spawned in, not winner arbitration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One named evasion strategy: a key and the engine arguments that realize it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyDescriptor {
    /// Unique key within a catalog
    pub key: String,
    /// Opaque nfqws parameter string, tokenized only for process invocation
    pub engine_args: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl StrategyDescriptor {
    /// Create a descriptor
    pub fn new(
        key: impl Into<String>,
        engine_args: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            engine_args: engine_args.into(),
            description: description.into(),
        }
    }

    /// Tokenize the engine argument string for process invocation
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.engine_args.split_whitespace()
    }

    /// Classify the descriptor by its desync mode tokens
    pub fn kind(&self) -> StrategyKind {
        let desync = self
            .tokens()
            .find_map(|t| t.strip_prefix("--dpi-desync="));
        let wssize = self.tokens().any(|t| t.starts_with("--wssize"));

        let Some(modes) = desync else {
            return if wssize {
                StrategyKind::WindowResize
            } else {
                StrategyKind::Unknown
            };
        };

        let mut fake = false;
        let mut split = false;
        let mut disorder = false;
        for mode in modes.split(',') {
            match mode {
                "fake" => fake = true,
                m if m.contains("split") => split = true,
                m if m.starts_with("disorder") => disorder = true,
                _ => {}
            }
        }

        match (fake, split, disorder, wssize) {
            (true, false, false, false) => StrategyKind::Fake,
            (false, true, false, false) => StrategyKind::Split,
            (false, false, true, false) => StrategyKind::Disorder,
            (false, false, false, true) => StrategyKind::WindowResize,
            (false, false, false, false) => StrategyKind::Unknown,
            _ => StrategyKind::Combined,
        }
    }
}

/// Closed set of strategy families, derived from the engine arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Splits the ClientHello so the SNI crosses a segment boundary
    Split,
    /// Injects fake packets the DPI sees but the server discards
    Fake,
    /// Sends segments out of order
    Disorder,
    /// Shrinks the TCP window to force server-side fragmentation
    WindowResize,
    /// Several techniques combined
    Combined,
    /// Arguments did not match any known family
    Unknown,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Split => "split",
            Self::Fake => "fake",
            Self::Disorder => "disorder",
            Self::WindowResize => "window-resize",
            Self::Combined => "combined",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// TOML file shape: a list of `[[strategy]]` tables
#[derive(Debug, Deserialize)]
struct CatalogFile {
    strategy: Vec<StrategyDescriptor>,
}

/// Ordered, immutable strategy catalog
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    entries: Vec<StrategyDescriptor>,
}

impl StrategyCatalog {
    /// Build a catalog from descriptors, rejecting duplicate keys
    pub fn new(entries: Vec<StrategyDescriptor>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(Error::DuplicateStrategy {
                    key: entry.key.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Load a catalog from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::CatalogNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.strategy)
    }

    /// The built-in priority list, tuned for Turkish ISPs and Cloudflare-backed
    /// sites, in decreasing expected effectiveness.
    pub fn builtin() -> Self {
        let entries = vec![
            StrategyDescriptor::new(
                "tr_split_sni",
                "--dpi-desync=split --dpi-desync-split-pos=sniext+1 --dpi-desync-fooling=md5sig",
                "Splits SNI header (Superonline optimized)",
            ),
            StrategyDescriptor::new(
                "tr_wssize_fake",
                "--wssize=1:6 --dpi-desync=fake --dpi-desync-ttl=4",
                "Window scaling 1:6 + fake packet",
            ),
            StrategyDescriptor::new(
                "tr_fake_ttl_low",
                "--dpi-desync=fake,split2 --dpi-desync-ttl=3 --dpi-desync-fooling=md5sig",
                "Fake packet with TTL=3 (TR optimized)",
            ),
            StrategyDescriptor::new(
                "tr_disorder",
                "--dpi-desync=disorder2 --dpi-desync-split-pos=1 --dpi-desync-fooling=md5sig",
                "Disorder strategy (reverse packet order)",
            ),
            StrategyDescriptor::new(
                "global_default",
                "--dpi-desync=fake,split2 --dpi-desync-ttl=1 --dpi-desync-fooling=md5sig",
                "Standard global strategy",
            ),
            StrategyDescriptor::new(
                "legacy_badsum",
                "--dpi-desync=fake --dpi-desync-fooling=badsum",
                "Bad checksum fooling",
            ),
            StrategyDescriptor::new(
                "quic_fake",
                "--dpi-desync=fake --dpi-desync-repeats=6",
                "QUIC/UDP fake flooding",
            ),
        ];
        // Built-in keys are unique by construction
        Self { entries }
    }

    /// Iterate descriptors in priority order
    pub fn iter(&self) -> impl Iterator<Item = &StrategyDescriptor> {
        self.entries.iter()
    }

    /// Look up a descriptor by key
    pub fn get(&self, key: &str) -> Option<&StrategyDescriptor> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Position of a key in priority order
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Number of strategies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.position("tr_split_sni"), Some(0));
        assert!(catalog.get("global_default").is_some());

        // Keys are unique
        let keys: std::collections::HashSet<_> = catalog.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys.len(), catalog.len());
    }

    #[test]
    fn test_kind_classification() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get("tr_split_sni").unwrap().kind(), StrategyKind::Split);
        assert_eq!(catalog.get("legacy_badsum").unwrap().kind(), StrategyKind::Fake);
        assert_eq!(catalog.get("tr_disorder").unwrap().kind(), StrategyKind::Disorder);
        assert_eq!(
            catalog.get("tr_fake_ttl_low").unwrap().kind(),
            StrategyKind::Combined
        );
        assert_eq!(
            catalog.get("tr_wssize_fake").unwrap().kind(),
            StrategyKind::Combined
        );
    }

    #[test]
    fn test_tokenize() {
        let d = StrategyDescriptor::new("x", "--dpi-desync=fake --dpi-desync-ttl=1", "");
        let tokens: Vec<_> = d.tokens().collect();
        assert_eq!(tokens, vec!["--dpi-desync=fake", "--dpi-desync-ttl=1"]);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let entries = vec![
            StrategyDescriptor::new("a", "--dpi-desync=fake", ""),
            StrategyDescriptor::new("a", "--dpi-desync=split", ""),
        ];
        assert!(matches!(
            StrategyCatalog::new(entries),
            Err(Error::DuplicateStrategy { .. })
        ));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            [[strategy]]
            key = "fake_ttl"
            engine_args = "--dpi-desync=fake --dpi-desync-ttl=1"
            description = "Classic TTL spoofing"

            [[strategy]]
            key = "split"
            engine_args = "--dpi-desync=split --dpi-desync-split-pos=1"
        "#;
        let catalog = StrategyCatalog::from_toml(toml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position("split"), Some(1));
        assert_eq!(catalog.get("split").unwrap().description, "");
    }

    #[test]
    fn test_load_missing_file() {
        let err = StrategyCatalog::load("/nonexistent/catalog.toml").unwrap_err();
        assert!(matches!(err, Error::CatalogNotFound { .. }));
    }
}
