// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `vector_atlas`.
//!
//! - The `util` module holds the shapes and helpers shared between test modules.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests, so that the helpers only need to be defined once.
//! - Put the "topic" of a test at the start of its name (`raster_`, `cache_`, `glyph_`,
//!   `native_`), so related tests sort together.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod cache;
mod util;
