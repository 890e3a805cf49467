pub mod env;
pub mod match_config;
pub mod progress_bars;
