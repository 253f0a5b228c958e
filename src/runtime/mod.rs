//! API surface: response envelopes and batch result shaping.

pub mod api;

pub use api::{
    failure_reports, flatten_successes, format_hms, with_meta, ResponseEnvelope, ResponseMeta,
};
