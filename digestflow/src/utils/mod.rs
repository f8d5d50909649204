//! Small helpers shared by alerts, composition, adapters and the run guard.

mod panic;
mod text;

pub use panic::panic_message;
pub use text::{chunk_chars, excerpt, html_escape, html_to_text, mask_secret};
