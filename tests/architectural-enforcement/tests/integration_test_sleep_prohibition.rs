//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Nothing sleeps. Production code waits on I/O, channels or
//! cancellation; tests wait on observable state with `tokio::time::timeout`
//! as an upper bound.
//! **Exceptions**: Exponential backoff in retry logic, periodic tasks built
//! on `tokio::time::interval`.

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, is_test_code, rust_files, INTEGRATION_TESTS, PRODUCTION_SOURCES};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations(&PRODUCTION_SOURCES, true);
    report(&violations, "production code");
}

/// Test that integration tests synchronize on state, not on time
#[test]
fn test_no_sleep_in_integration_tests() {
    let violations = find_sleep_violations(&INTEGRATION_TESTS, false);
    report(&violations, "integration tests");
}

fn report(violations: &[String], scope: &str) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ Sleep calls found in {scope}!\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n✅ ACCEPTABLE:");
    eprintln!("  - Exponential backoff in retry logic");
    eprintln!("  - Periodic tasks using tokio::time::interval()");
    eprintln!("  - tokio::time::timeout() as an upper bound in tests");
    eprintln!("\n❌ FORBIDDEN:");
    eprintln!("  - Sleep in polling loops");
    eprintln!("  - Sleep as poor man's synchronization");

    panic!(
        "\nFound {} sleep violation(s) in {scope}.\nFix these before merging!",
        violations.len()
    );
}

fn find_sleep_violations(dirs: &[&str], skip_unit_tests: bool) -> Vec<String> {
    let mut violations = Vec::new();
    for dir in dirs {
        for file in rust_files(dir) {
            check_file(&file, skip_unit_tests, &mut violations);
        }
    }
    violations
}

fn check_file(path: &Path, skip_unit_tests: bool, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            continue;
        }
        // Unit tests beside production code are covered by their own crate's review
        if skip_unit_tests && is_test_code(&lines, idx) {
            continue;
        }
        if is_backoff_context(&lines, idx) || is_interval_pattern(&lines, idx) {
            continue;
        }
        violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
    }
}

/// Check if sleep is used for exponential backoff (acceptable for retry logic)
fn is_backoff_context(lines: &[&str], current_idx: usize) -> bool {
    let context = &lines[current_idx.saturating_sub(15)..(current_idx + 5).min(lines.len())];

    let has_backoff_calc = context
        .iter()
        .any(|l| l.contains("<<") || l.contains("pow") || l.contains("* 2"));
    let has_retry_context = context.iter().any(|l| {
        let l = l.to_lowercase();
        l.contains("retry") || l.contains("backoff") || l.contains("attempt")
    });

    has_backoff_calc && has_retry_context
}

/// Check if this is a `tokio::time::interval` pattern (acceptable for periodic tasks)
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    lines[current_idx.saturating_sub(20)..(current_idx + 5).min(lines.len())]
        .iter()
        .any(|l| l.contains("interval.tick()") || l.contains("tokio::time::interval"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_detection() {
        let code = vec![
            "async fn reconnect() {",
            "    let delay = base_delay * (1 << attempt);",
            "    warn!(attempt, \"Retrying\");",
            "    tokio::time::sleep(Duration::from_millis(delay)).await;",
            "}",
        ];
        assert!(is_backoff_context(&code, 3));
    }

    #[test]
    fn test_plain_sleep_is_not_excused() {
        let code = vec![
            "async fn wait_for_stream() {",
            "    tokio::time::sleep(Duration::from_millis(50)).await;",
            "}",
        ];
        assert!(!is_backoff_context(&code, 1));
        assert!(!is_interval_pattern(&code, 1));
        assert!(!is_test_code(&code, 1));
    }
}
