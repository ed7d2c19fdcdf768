// src/output.rs
// =============================================================================
// Writes the finding sets to JSON files once the crawl is over.
//
//   <output>/logged-queries.json            if LogQueries is set
//   <output>/inline-scripts.json            if LogInlineJS is true
//   <output>/logged-non-200-queries.json    if LogNon200Queries is set
//
// Each file is {"<page url>": ["value", ...], ...} with keys sorted.
// A failed write is logged and the remaining files are still attempted.
// =============================================================================

use crate::config::Configuration;
use crate::crawl::{FindingSet, Findings};
use crate::error::PersistenceError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// Which finding sets this configuration asked for
pub fn configured_sets(config: &Configuration) -> Vec<FindingSet> {
    FindingSet::ALL
        .into_iter()
        .filter(|set| match set {
            FindingSet::Queries => config.log_queries.is_some(),
            FindingSet::InlineScripts => config.log_inline_js,
            FindingSet::Non200 => config.log_non_200_queries.is_some(),
        })
        .collect()
}

/// Writes one finding set to `dir/<file name>` and returns the path.
pub fn write_findings(
    dir: &Path,
    set: FindingSet,
    content: &BTreeMap<String, Vec<String>>,
) -> Result<PathBuf, PersistenceError> {
    let json = serde_json::to_string_pretty(content).map_err(|source| PersistenceError::Encode {
        file: set.file_name(),
        source,
    })?;

    let path = dir.join(set.file_name());
    fs::write(&path, json).map_err(|source| PersistenceError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

// Persists every configured set. Returns how many files were written.
pub fn persist(dir: &Path, config: &Configuration, findings: &Findings) -> usize {
    let sets = configured_sets(config);
    if sets.is_empty() {
        return 0;
    }

    if let Err(source) = fs::create_dir_all(dir) {
        let err = PersistenceError::CreateDir {
            dir: dir.to_path_buf(),
            source,
        };
        warn!(error = %err, "results not saved");
        return 0;
    }

    let mut written = 0;
    for set in sets {
        let content = findings.snapshot(set);
        match write_findings(dir, set, &content) {
            Ok(path) => {
                info!(path = %path.display(), pages = content.len(), "results saved");
                written += 1;
            }
            Err(e) => warn!(error = %e, "results not saved"),
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings() -> Findings {
        let findings = Findings::new();
        findings.record(
            FindingSet::Queries,
            "http://example.test/b",
            vec!["/b.js".to_string()],
        );
        findings.record(
            FindingSet::Queries,
            "http://example.test/a",
            vec!["/a.js".to_string(), "/a2.js".to_string()],
        );
        findings.record(
            FindingSet::Non200,
            "http://example.test/a",
            vec!["http://example.test/missing".to_string()],
        );
        findings
    }

    #[test]
    fn test_only_configured_sets_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let config: Configuration = serde_json::from_str(r#"{"LogQueries": {"script": "src"}}"#).unwrap();

        let written = persist(dir.path(), &config, &findings());

        assert_eq!(written, 1);
        assert!(dir.path().join("logged-queries.json").exists());
        assert!(!dir.path().join("logged-non-200-queries.json").exists());
        assert!(!dir.path().join("inline-scripts.json").exists());
    }

    #[test]
    fn test_written_json_content() {
        let dir = tempfile::tempdir().unwrap();
        let config: Configuration = serde_json::from_str(
            r#"{"LogQueries": {}, "LogNon200Queries": {"a": "href"}, "LogInlineJS": true}"#,
        )
        .unwrap();

        assert_eq!(persist(dir.path(), &config, &findings()), 3);

        let raw = fs::read_to_string(dir.path().join("logged-queries.json")).unwrap();
        let decoded: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["http://example.test/a"], vec!["/a.js", "/a2.js"]);

        // Configured but nothing found: an empty object
        let raw = fs::read_to_string(dir.path().join("inline-scripts.json")).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs").join("today");
        let config: Configuration = serde_json::from_str(r#"{"LogInlineJS": true}"#).unwrap();

        assert_eq!(persist(&nested, &config, &findings()), 1);
        assert!(nested.join("inline-scripts.json").exists());
    }

    #[test]
    fn test_unwritable_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = write_findings(&blocker, FindingSet::Queries, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));

        let config: Configuration = serde_json::from_str(r#"{"LogInlineJS": true}"#).unwrap();
        assert_eq!(persist(&blocker, &config, &findings()), 0);
    }
}
