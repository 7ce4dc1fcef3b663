use std::time::Duration;

use owo_colors::OwoColorize;
use pagewalk_core::{BookChapter, ChapterInfo, ExtractionResult, LockReport, NavigationLink, NavigationOutcome};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Pagewalk".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Extract chapter text and walk paginated pages\n".dimmed());
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

/// Print timing information, green under 500ms, yellow under 2s
pub fn print_timing(label: &str, duration: Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 500.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 2000.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print extraction details summary
pub fn print_extraction_details(result: &ExtractionResult) {
    rule("Extraction Details");
    field("URL", &result.url);
    field("Method", &result.method.to_string());
    if let Some(title) = &result.title {
        field("Title", title);
    }
    if let Some(description) = &result.meta_description {
        field("Description", description);
    }
    field("Size", &format_size(result.text.len()));
    eprintln!();
}

/// Print the chapter a page was recognised as
pub fn print_chapter(info: &ChapterInfo) {
    println!("{} {}", "Chapter:".bold(), info.numeric_value.to_string().bright_white());
    println!("  {} {}", "Fragment:".dimmed(), info.matched_fragment);
    println!("  {} {}", "Source:".dimmed(), format!("{:?}", info.source).to_lowercase());
    if info.has_template() {
        println!("  {} {}", "Base URL:".dimmed(), info.base_url);
        println!("  {} {}", "Template:".dimmed(), info.url_template);
    }
}

/// Print a resolved navigation target
pub fn print_navigation(outcome: &NavigationOutcome) {
    println!("{}", outcome.target_url);
    eprintln!(
        "  {} {}  {} {}",
        "Chapter:".dimmed(),
        chapter_label(outcome.chapter).bright_white(),
        "Via:".dimmed(),
        outcome.tier.to_string().bright_white()
    );
}

/// Print chapter and both navigation links of a page
pub fn print_links(report: &LockReport) {
    println!("{} {}", "Page:".bold(), report.final_url);
    match &report.chapter {
        Some(info) => print_chapter(info),
        None => println!("{} {}", "Chapter:".bold(), "Unknown".dimmed()),
    }
    print_link("Next", report.links.next.as_ref());
    print_link("Previous", report.links.previous.as_ref());
}

fn print_link(label: &str, link: Option<&NavigationLink>) {
    let label = format!("{}:", label);
    match link {
        Some(link) => println!("{} {} ({})", label.bold(), link.url, link.tier.to_string().dimmed()),
        None => println!("{} {}", label.bold(), "none".dimmed()),
    }
}

/// Render collected chapters as plain text, one section per chapter
pub fn render_book(chapters: &[BookChapter]) -> String {
    chapters
        .iter()
        .map(|chapter| {
            format!(
                "## Chapter {}\n<{}>\n\n{}\n",
                chapter_label(chapter.chapter),
                chapter.url,
                chapter.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn chapter_label(chapter: Option<u64>) -> String {
    chapter.map_or_else(|| "Unknown".to_string(), |n| n.to_string())
}

/// Format file size for display
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

fn rule(title: &str) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", title.bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
}

fn field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}
