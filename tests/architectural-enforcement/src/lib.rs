//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! of the replayer workspace:
//! - No blocking socket types in production code (all networking goes through tokio)
//! - No blocking file or sleep calls inside async functions
//!
//! The source scanner lives here so the rules can be unit tested; the rules
//! themselves run from `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Production source directories checked by every rule
pub const PRODUCTION_DIRS: &[&str] = &["replayer/core/src", "replayer/daemon/src"];

/// A forbidden pattern and where it applies
pub struct Rule {
    /// Substring that marks a violation
    pub pattern: &'static str,
    /// Only flag it inside `async fn` bodies
    pub async_only: bool,
    /// Human-readable category for the report
    pub category: &'static str,
}

/// Check every `.rs` file under `dir` (relative to the workspace root)
pub fn check_directory(dir: &str, rules: &[Rule], violations: &mut Vec<String>) {
    let path = workspace_root().join(dir);
    assert!(path.exists(), "missing source directory {}", path.display());

    for entry in walkdir::WalkDir::new(&path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            let content = match fs::read_to_string(entry.path()) {
                Ok(c) => c,
                Err(_) => continue,
            };
            for (line_number, line) in check_source(&content, rules) {
                violations.push(format!(
                    "{}:{} - {}",
                    entry.path().display(),
                    line_number,
                    line
                ));
            }
        }
    }
}

/// Return `(line number, description)` for every violation in `content`
#[must_use]
pub fn check_source(content: &str, rules: &[Rule]) -> Vec<(usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    let mut found = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        // Test modules sit at the end of each file
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        for rule in rules {
            if !code_part.contains(rule.pattern) {
                continue;
            }
            if rule.async_only && !is_in_async_function(&lines, idx) {
                continue;
            }
            found.push((idx + 1, format!("{}: {}", rule.category, line.trim())));
        }
    }

    found
}

/// Check if line is inside an async function
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..=current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return true;
        }

        if line.contains("fn ") {
            return false;
        }

        // Stop at module/impl boundaries
        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const STD_FS: Rule = Rule {
        pattern: "std::fs::",
        async_only: true,
        category: "Blocking file I/O",
    };

    #[test]
    fn test_async_function_detection() {
        let code = [
            "async fn run_cycle() {",
            "    let text = std::fs::read_to_string(\"a.rec\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
    }

    #[test]
    fn test_sync_function_is_allowed() {
        let code = "fn load() {\n    std::fs::read_to_string(\"a.toml\");\n}\n";
        assert!(check_source(code, &[STD_FS]).is_empty());
    }

    #[test]
    fn test_violation_reported_with_line_number() {
        let code = "async fn load() {\n    std::fs::read(\"a\");\n}\n";
        let found = check_source(code, &[STD_FS]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 2);
    }

    #[test]
    fn test_test_module_is_ignored() {
        let code = "#[cfg(test)]\nmod tests {\n    async fn t() { std::fs::read(\"a\"); }\n}\n";
        assert!(check_source(code, &[STD_FS]).is_empty());
    }
}
