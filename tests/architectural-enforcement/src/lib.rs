//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls, in production code or in integration tests
//! - No blocking I/O inside async production code
//!
//! The helpers here walk the workspace sources line by line. They are
//! heuristics, not a parser: good enough to catch violations early.

use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_SOURCES: [&str; 3] = ["relay/core/src", "relay/daemon/src", "client/src"];

/// Integration test directories, relative to the workspace root
pub const INTEGRATION_TESTS: [&str; 3] = ["relay/core/tests", "relay/daemon/tests", "client/tests"];

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files below `dir`, relative to the workspace root
///
/// Panics when the directory is missing so a moved crate cannot silently
/// escape the checks.
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    assert!(path.exists(), "source directory {} not found", path.display());

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// The code part of a line, without a trailing `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Index of the first `#[cfg(test)]` line; everything after it is test code
#[must_use]
pub fn test_section_start(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|l| l.trim().starts_with("#[cfg(test)]"))
}

/// A function signature line, with its visibility stripped
#[must_use]
pub fn fn_signature(line: &str) -> Option<&str> {
    let mut rest = line.trim();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    (rest.starts_with("fn ") || rest.starts_with("async fn ")).then_some(rest)
}

/// Signature of the function enclosing `current_idx`, if any
#[must_use]
pub fn enclosing_fn<'a>(lines: &[&'a str], current_idx: usize) -> Option<&'a str> {
    for i in (0..=current_idx).rev() {
        if let Some(signature) = fn_signature(lines[i]) {
            return Some(signature);
        }
        let line = lines[i].trim();
        // Stop at module boundaries
        if line.starts_with("mod ") || line.starts_with("pub mod ") {
            return None;
        }
    }
    None
}

/// Whether `current_idx` lies in an `async fn`
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    enclosing_fn(lines, current_idx).is_some_and(|sig| sig.starts_with("async fn "))
}

/// Whether `current_idx` lies in test code: after `#[cfg(test)]` or in a
/// function marked `#[test]`/`#[tokio::test]`
#[must_use]
pub fn is_test_code(lines: &[&str], current_idx: usize) -> bool {
    if test_section_start(lines).is_some_and(|start| current_idx > start) {
        return true;
    }

    let Some(fn_idx) = (0..=current_idx).rev().find(|&i| fn_signature(lines[i]).is_some()) else {
        return false;
    };
    for i in (0..fn_idx).rev() {
        let line = lines[i].trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !line.starts_with("#[") && !line.starts_with("///") {
            break;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature_strips_visibility() {
        assert_eq!(
            fn_signature("    pub async fn run(self) {"),
            Some("async fn run(self) {")
        );
        assert_eq!(fn_signature("pub(crate) fn load() {"), Some("fn load() {"));
        assert_eq!(fn_signature("let f = fn_ptr;"), None);
    }

    #[test]
    fn test_test_code_detection() {
        let code = vec![
            "fn production() {}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() {}",
            "}",
        ];
        assert!(!is_test_code(&code, 0));
        assert!(is_test_code(&code, 3));

        let marked = vec!["#[tokio::test]", "async fn case() {", "    body();", "}"];
        assert!(is_test_code(&marked, 2));
    }

    #[test]
    fn test_async_detection() {
        let code = vec![
            "pub async fn serve() {",
            "    let listener = bind();",
            "}",
            "fn sync_helper() {",
            "    read();",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
        assert!(!is_in_async_function(&code, 4));
    }

    #[test]
    fn test_workspace_sources_exist() {
        for dir in PRODUCTION_SOURCES.iter().chain(INTEGRATION_TESTS.iter()) {
            assert!(!rust_files(dir).is_empty(), "{dir} has no sources");
        }
    }
}
