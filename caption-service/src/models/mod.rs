//! Domain models for the caption service.

pub mod caption;

pub use caption::{Caption, CaptionRequest, ExpressionScoreSet, PromptPayload, RequestBodyError};
