//! Output formatting module
//!
//! Everything the REPL and one-shot mode print to the terminal goes through
//! [`OutputFormatter`] so colours and framing stay consistent.

use crate::agent::AgentEvent;
use crate::agent::tools::{WEB_SCRAPER, WEB_SEARCH};
use crate::config::{ANTHROPIC_API_KEY, SERPER_API_KEY};
use console::Style;

const FRAME_WIDTH: usize = 53;

const BANNER: &str = "
╔═══════════════════════════════════════════════════╗
║        🔬  Research Assistant Agent               ║
║   Powered by Claude + live web search             ║
╠═══════════════════════════════════════════════════╣
║  Commands:                                        ║
║    'new'  — Start a fresh conversation            ║
║    'quit' — Exit                                  ║
╚═══════════════════════════════════════════════════╝
";

/// Output formatter for CLI results
pub struct OutputFormatter {
    blue: Style,
    green: Style,
    yellow: Style,
    red: Style,
    bold: Style,
    dim: Style,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self {
            blue: Style::new().blue(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            bold: Style::new().bold(),
            dim: Style::new().dim(),
        }
    }
}

impl OutputFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_banner(&self) {
        println!("{}", self.blue.apply_to(BANNER));
    }

    /// Print the final answer between rules
    pub fn print_answer(&self, answer: &str) {
        let rule = "─".repeat(FRAME_WIDTH);
        println!();
        println!("{}", self.dim.apply_to(&rule));
        println!("{}", self.green.apply_to("✅  Answer").bold());
        println!("{}", self.dim.apply_to(&rule));
        println!("{}", answer);
        println!("{}", self.dim.apply_to(&rule));
        println!();
    }

    /// Progress line for an agent event
    pub fn format_event(&self, event: &AgentEvent, search_no: usize, scrape_no: usize) -> String {
        match event {
            AgentEvent::Thinking { max_steps } => format!(
                "\n{} {}",
                self.bold.apply_to("🤖 Agent thinking..."),
                self.dim.apply_to(format!("(max {} steps)", max_steps))
            ),
            AgentEvent::Step { n } => format!("  ↻ Step {}", n),
            AgentEvent::ToolCall { name, detail } => {
                let detail = detail.as_deref().unwrap_or("");
                match name.as_str() {
                    WEB_SEARCH => format!("  🌐 Search #{}: '{}'", search_no, self.yellow.apply_to(detail)),
                    WEB_SCRAPER => format!("  📄 Scraping #{}: {}", scrape_no, self.yellow.apply_to(detail)),
                    other => format!("  🔧 {}: {}", other, detail),
                }
            }
            AgentEvent::Finished { steps, summary } => format!(
                "  {} Finished in {} step(s) — {}",
                self.green.apply_to("✓"),
                steps,
                summary
            ),
            AgentEvent::UnexpectedStop { reason } => format!(
                "  {} Unexpected stop_reason: {}",
                self.yellow.apply_to("⚠"),
                reason
            ),
            AgentEvent::SessionReset => format!("  🔄 {}", self.green.apply_to("New session started.")),
        }
    }

    /// List missing credentials and where to get them
    pub fn print_missing_keys(&self, missing: &[&str]) {
        eprintln!("{}", self.red.apply_to("❌  Missing keys in your .env file:"));
        for key in missing {
            eprintln!("    {}=your-key-here", key);
        }
        eprintln!();
        if missing.contains(&ANTHROPIC_API_KEY) {
            eprintln!("  • Anthropic key → https://console.anthropic.com");
        }
        if missing.contains(&SERPER_API_KEY) {
            eprintln!("  • Serper key    → https://serper.dev");
            eprintln!(
                "  {}",
                self.dim.apply_to("  (or set web_search.provider: duckduckgo in sleuth.yaml)")
            );
        }
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("\n{}\n", self.red.apply_to(format!("❌  Error: {}", message)));
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", self.blue.apply_to(message));
    }

    pub fn print_goodbye(&self) {
        println!("👋 Goodbye!");
    }

    /// Print the redacted configuration
    pub fn print_config(&self, yaml: &str, source: Option<&std::path::Path>) {
        let origin = source
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string());
        println!("{} {}", self.bold.apply_to("Configuration from"), self.green.apply_to(origin));
        println!();
        print!("{}", yaml);
    }
}

/// Keeps per-tool call numbers for progress lines
#[derive(Debug, Default)]
pub struct EventPrinter {
    formatter: OutputFormatter,
    searches: usize,
    scrapes: usize,
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the event and advance the counters it touches
    pub fn render(&mut self, event: &AgentEvent) -> String {
        match event {
            AgentEvent::ToolCall { name, .. } if name == WEB_SEARCH => self.searches += 1,
            AgentEvent::ToolCall { name, .. } if name == WEB_SCRAPER => self.scrapes += 1,
            AgentEvent::SessionReset => {
                self.searches = 0;
                self.scrapes = 0;
            }
            _ => {}
        }
        self.formatter.format_event(event, self.searches, self.scrapes)
    }

    pub fn print(&mut self, event: &AgentEvent) {
        println!("{}", self.render(event));
    }
}

impl std::fmt::Debug for OutputFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OutputFormatter")
    }
}
