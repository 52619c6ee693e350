pub mod caption;
pub mod providers;

pub use caption::{CaptionError, CaptionInvoker};
