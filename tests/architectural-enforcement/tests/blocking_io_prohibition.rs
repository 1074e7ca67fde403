//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: the replayer runs its sender and receiver as tokio tasks on a
//! shared runtime. A blocking socket, file or sleep call inside an async
//! function stalls the other task.
//!
//! **Required**: `tokio::net`, `tokio::fs`, `tokio::time::sleep`.
//!
//! **Acceptable**: blocking calls in non-async functions (config loading
//! before the runtime does any work) and test code.

use architectural_enforcement::{check_directory, Rule, PRODUCTION_DIRS};

const RULES: &[Rule] = &[
    Rule {
        pattern: "std::net::TcpStream",
        async_only: false,
        category: "Blocking network I/O",
    },
    Rule {
        pattern: "std::net::TcpListener",
        async_only: false,
        category: "Blocking network I/O",
    },
    Rule {
        pattern: "std::thread::sleep",
        async_only: false,
        category: "Blocking sleep",
    },
    Rule {
        pattern: "std::fs::",
        async_only: true,
        category: "Blocking file I/O in async fn",
    },
    Rule {
        pattern: "std::io::stdin()",
        async_only: true,
        category: "Blocking stdin in async fn",
    },
];

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        check_directory(dir, RULES, &mut violations);
    }

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::net::TcpStream / TcpListener");
        eprintln!("  - tokio::fs::File, tokio::io::AsyncBufReadExt");
        eprintln!("  - tokio::time::sleep");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
