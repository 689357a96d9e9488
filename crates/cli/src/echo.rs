use owo_colors::OwoColorize;
use pagedoc_core::{PageDoc, Trace};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "PageDoc".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Deterministic document trees from web pages and APIs\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print timing information with color coding
pub fn print_timing(label: &str, ms: u64) {
    let label = format!("{}:", label);
    if ms < 50 {
        eprintln!("  {} {:>8}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 500 {
        eprintln!("  {} {:>8}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print the extraction summary: decisions taken and document shape
pub fn print_run_details(doc: &PageDoc, trace: &Trace) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for step in &trace.steps {
        eprintln!("  {} {} {}", format!("{}:", step.name).dimmed(), step.decision.bright_white(), step.reason.dimmed());
    }

    eprintln!();
    eprintln!("  {} {}", "Kind:".dimmed(), format!("{:?}", doc.kind).to_lowercase().bright_white());
    eprintln!("  {} {}", "Blocks:".dimmed(), doc.content.len().to_string().bright_white());
    eprintln!("  {} {}", "Links:".dimmed(), doc.links.len().to_string().bright_white());
    eprintln!("  {} {}", "Confidence:".dimmed(), format!("{:.1}", doc.meta.confidence).bright_white());
    eprintln!("  {} {}", "Signature:".dimmed(), doc.structural_signature.bright_white());
    print_timing("Total", trace.duration_ms);
    eprintln!();

    for warning in &doc.meta.warnings {
        print_warning(warning);
    }
}

/// Format byte size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
