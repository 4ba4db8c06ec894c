pub mod onboard;
pub mod scrape;
pub mod serve;
