//! Output formatting utilities.
//!
//! Pretty printing for CLI commands.

use colored::Colorize;
use whitelist_types::Hash;

/// Format hash (short version).
pub fn format_hash_short(hash: &Hash) -> String {
    let s = hash.to_string();
    format!("{}...{}", &s[..10], &s[s.len() - 8..])
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{}", format!("⚠ {}", msg).yellow());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print a labelled hash.
pub fn print_hash(label: &str, hash: &Hash) {
    println!("{}: {}", label.bold(), hash);
}

/// Print proof siblings, one per line.
pub fn print_proof(siblings: &[Hash]) {
    if siblings.is_empty() {
        println!("{}", "(empty proof: single-member whitelist)".dimmed());
        return;
    }
    for (depth, sibling) in siblings.iter().enumerate() {
        println!("  [{}] {}", depth, sibling);
    }
}
