//! Byte-offset helpers over ropes.
//!
//! Ropey indexes by chars; the engine works with UTF-8 byte offsets.

use ropey::Rope;
use text_size::{TextRange, TextSize};

use super::to_text_size;

/// Length of `rope` in bytes, if it is addressable.
pub fn rope_len(rope: &Rope) -> Option<TextSize> {
    to_text_size(rope.len_bytes())
}

/// Whether `offset` lies inside `rope` on a character boundary.
pub fn is_char_boundary(rope: &Rope, offset: TextSize) -> bool {
    let offset = usize::from(offset);
    if offset > rope.len_bytes() {
        return false;
    }
    rope.char_to_byte(rope.byte_to_char(offset)) == offset
}

/// Copy the text covered by `range`. The range must be in bounds and on
/// character boundaries.
pub fn slice_text(rope: &Rope, range: TextRange) -> String {
    let start = rope.byte_to_char(usize::from(range.start()));
    let end = rope.byte_to_char(usize::from(range.end()));
    String::from(rope.slice(start..end))
}

/// Grow `range` to whole lines. A range ending right at a line start does not
/// pull in that line unless it is empty.
pub fn line_range(rope: &Rope, range: TextRange) -> TextRange {
    let total = rope.len_bytes();
    let start = usize::from(range.start()).min(total);
    let end = usize::from(range.end()).min(total);

    let line_start = rope.line_to_byte(rope.byte_to_line(start));
    let end_line = rope.byte_to_line(end);
    let line_end = if end > start && rope.line_to_byte(end_line) == end {
        end
    } else if end_line + 1 < rope.len_lines() {
        rope.line_to_byte(end_line + 1)
    } else {
        total
    };
    TextRange::new(
        TextSize::from(line_start as u32),
        TextSize::from(line_end as u32),
    )
}
