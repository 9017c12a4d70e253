//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async production code in the relay and the client MUST NOT
//! block a runtime worker.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::io`, not `std::fs`,
//! `std::net` sockets or `std` stdin/stdout.
//!
//! Blocking calls are acceptable in non-async functions that run before the
//! runtime serves requests (config loading) and in test code.

use std::fs;
use std::path::Path;

use architectural_enforcement::{
    code_part, is_in_async_function, is_test_code, rust_files, PRODUCTION_SOURCES,
};

/// Address types from `std::net` that do no I/O
const PLAIN_NET_TYPES: [&str; 4] = ["SocketAddr", "IpAddr", "Ipv4Addr", "Ipv6Addr"];

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();
    for dir in PRODUCTION_SOURCES {
        for file in rust_files(dir) {
            check_file(&file, &mut violations);
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O calls found in async production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await");
        eprintln!("  - tokio::net::TcpListener::bind().await");
        eprintln!("  - tokio::io::stdin() / tokio::io::stdout()");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        if is_test_code(&lines, idx) {
            continue;
        }
        if let Some(kind) = blocking_call(code_part(line), is_in_async_function(&lines, idx)) {
            violations.push(format!(
                "{}:{} - {kind}: {}",
                path.display(),
                idx + 1,
                line.trim()
            ));
        }
    }
}

/// Classify a line of code; `in_async` tells whether it runs on the runtime
fn blocking_call(code: &str, in_async: bool) -> Option<&'static str> {
    if code.contains("reqwest::blocking") {
        return Some("Blocking HTTP client");
    }
    if code.contains("std::process::Command") {
        return Some("Blocking process I/O");
    }
    if !in_async {
        // Module-level imports are checked by what they bring in
        let is_import = code.trim_start().starts_with("use ");
        if !is_import {
            return None;
        }
    }
    if code.contains("std::fs") {
        return Some("Blocking file I/O");
    }
    if code.contains("std::net") && !PLAIN_NET_TYPES.iter().any(|t| code.contains(t)) {
        return Some("Blocking network I/O");
    }
    if in_async && (code.contains("std::io::stdin()") || code.contains("std::io::stdout()")) {
        return Some("Blocking stdin/stdout in async");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_io_detection() {
        assert_eq!(
            blocking_call("    let s = std::fs::read_to_string(path)?;", true),
            Some("Blocking file I/O")
        );
        assert_eq!(
            blocking_call("    print!(\"> \"); std::io::stdout().flush()?;", true),
            Some("Blocking stdin/stdout in async")
        );
        assert_eq!(
            blocking_call("use std::net::TcpStream;", false),
            Some("Blocking network I/O")
        );
    }

    #[test]
    fn test_acceptable_uses() {
        // Config loading before the runtime serves requests
        assert_eq!(blocking_call("    std::fs::read_to_string(p)", false), None);
        assert_eq!(blocking_call("use std::net::SocketAddr;", false), None);
        assert_eq!(
            blocking_call("pub async fn run(self, addr: std::net::SocketAddr) {", true),
            None
        );
        assert_eq!(blocking_call(".with_writer(std::io::stderr)", false), None);
    }
}
