pub mod link;
pub mod seen_set;

pub use link::*;
pub use seen_set::*;

// Emoji used in Discord messages
pub const EMOJI_NEW: &str = "🆕";
