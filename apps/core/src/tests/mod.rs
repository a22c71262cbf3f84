//! Test Module
//!
//! Cross-component test suite for the GutChat core.
//!
//! ## Test Categories
//! - `brain_tests`: Rules, classifier, resolver cascade, composition, keywords
//! - `chaos_test`: Concurrent feedback and resolution, augmenter failures under load
//! - `integration_tests`: Full workflows from abundance table to reply
