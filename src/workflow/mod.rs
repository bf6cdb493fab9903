pub mod scrape_ctx;
pub mod scrape_flow;

pub use scrape_ctx::ScrapeCtx;
pub use scrape_flow::{RetryPolicy, ScrapeFlow};
