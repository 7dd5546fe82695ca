//! Foundation types for the treesync engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`TextRange`], [`TextSize`] - Byte offsets into a buffer
//! - [`Edit`] - One atomic buffer mutation
//! - Span mapping helpers for carrying ranges across edits
//! - Byte-offset helpers over [`ropey::Rope`]
//!
//! This module has NO dependencies on other treesync modules.

mod edit;
mod rope;
mod span;

pub use edit::Edit;
pub use rope::{is_char_boundary, line_range, rope_len, slice_text};
pub use span::{map_offset, map_range, to_text_size};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
pub use text_size;
