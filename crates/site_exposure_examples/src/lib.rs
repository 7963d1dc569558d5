#![forbid(unsafe_code)]

mod rendering;
mod scenes;

pub use rendering::{init_tracing, render_overlays_to_png, Projection, RenderConfig};
pub use scenes::{certification_documents, context_towers, unit_random};
