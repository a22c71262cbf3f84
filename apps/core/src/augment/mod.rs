//! External reply augmentation.
//!
//! An augmenter rewrites the core's reply with a large language model. It is
//! optional and invoked by [`crate::assistant::Assistant`] around the core's
//! output; on failure the composed template reply is used unchanged.

pub mod http;
pub mod traits;

pub use http::HttpAugmenter;
pub use traits::{AugmentRequest, Augmenter};
