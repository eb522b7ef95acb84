pub mod text;
pub mod time;

pub use text::{normalize_ticker, replace_placeholder};
pub use time::rfc3339_now;
