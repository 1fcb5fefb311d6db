use colored::Colorize;
use entitystore::DiffEntry;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

// ============================================================================
// Diff Rendering
// ============================================================================

/// Plain-text form of one diff entry: `+`, `-` or `~` then path and system
pub fn format_diff_entry(entry: &DiffEntry) -> String {
    let location = format!("{} [{}]", entry.path, entry.system);
    match (&entry.old_value, &entry.new_value) {
        (None, Some(new)) => format!("+ {location}: {new}"),
        (Some(old), None) => format!("- {location}: {old}"),
        (Some(old), Some(new)) => format!("~ {location}: {old} -> {new}"),
        (None, None) => format!("  {location}"),
    }
}

/// Print a diff entry colored by kind
pub fn diff_entry(entry: &DiffEntry) {
    let line = format_diff_entry(entry);
    let line = if entry.is_addition() {
        line.green()
    } else if entry.is_removal() {
        line.red()
    } else {
        line.yellow()
    };
    println!("  {line}");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use entitystore::{PropertyValue, SystemName};

    fn entry(old: Option<&str>, new: Option<&str>) -> DiffEntry {
        DiffEntry {
            path: "metadata.namespace".parse().unwrap(),
            system: SystemName::baseline(),
            old_value: old.map(PropertyValue::from),
            new_value: new.map(PropertyValue::from),
        }
    }

    #[test]
    fn test_format_addition() {
        assert_eq!(
            format_diff_entry(&entry(None, Some("prod"))),
            "+ metadata.namespace [baseline]: prod"
        );
    }

    #[test]
    fn test_format_removal() {
        assert!(format_diff_entry(&entry(Some("dev"), None)).starts_with("- metadata.namespace"));
    }

    #[test]
    fn test_format_modification() {
        let line = format_diff_entry(&entry(Some("dev"), Some("prod")));
        assert!(line.starts_with("~ "));
        assert!(line.ends_with("dev -> prod"));
    }
}
