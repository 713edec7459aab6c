pub mod classify_reads;
pub mod classify_sequence;
pub mod classify_stats;

pub use classify_reads::classify_file;
pub use classify_sequence::{classify_one, mask_low_quality, ClassifyOptions};
pub use classify_stats::{build_summary, render_classification, render_summary};
