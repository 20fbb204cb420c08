pub mod web_scraper;
pub mod web_search;

pub use web_scraper::WebScraperTool;
pub use web_search::WebSearchTool;

pub const WEB_SEARCH: &str = "web_search";
pub const WEB_SCRAPER: &str = "web_scraper";
