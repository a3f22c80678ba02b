pub mod extractor;
pub mod localizer;
pub mod matcher;
pub mod normalizer;
pub mod ocr;
pub mod pipeline;
pub mod state_machine;
