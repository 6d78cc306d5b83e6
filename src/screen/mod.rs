pub mod dedupe;
pub mod extractor;
pub mod screen_model;
pub mod selector;
pub mod snapshot;
