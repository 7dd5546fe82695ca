//! Mapping offsets and ranges across edits.

use text_size::{TextRange, TextSize};

use super::Edit;

/// Convert a `usize` length to a [`TextSize`], if it fits.
pub fn to_text_size(len: usize) -> Option<TextSize> {
    u32::try_from(len).ok().map(TextSize::from)
}

/// Map a pre-edit offset to the post-edit buffer.
///
/// Offsets before the edit stay put, offsets after the removed range shift by
/// the edit's delta. Offsets inside the removed range collapse to the start of
/// the edit, or to the end of the inserted text when `after` is set.
pub fn map_offset(offset: TextSize, edit: &Edit, after: bool) -> TextSize {
    let removed = edit.removed_range();
    if offset <= removed.start() && !(after && offset == removed.start() && removed.is_empty()) {
        return offset;
    }
    if offset >= removed.end() {
        return offset - edit.removed_len() + edit.inserted_len();
    }
    if after {
        edit.inserted_range().end()
    } else {
        edit.position()
    }
}

/// Map a pre-edit range to the post-edit buffer, growing it to keep covering
/// text inserted inside it.
pub fn map_range(range: TextRange, edit: &Edit) -> TextRange {
    let start = map_offset(range.start(), edit, false);
    let end = map_offset(range.end(), edit, true).max(start);
    TextRange::new(start, end)
}

