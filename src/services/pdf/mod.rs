//! PDF rendering

mod quotation;
mod writer;

pub use quotation::{quotation_filename, render_quotation};
pub use writer::{text_width, wrap_text, Font, Page, PdfDocument};
