//! Filesystem-safe names for tag values.

use tagrenamer_core::Sanitizer;

/// Longest name most filesystems accept for one path component, in bytes.
pub const MAX_COMPONENT_LEN: usize = 255;

/// The default [`Sanitizer`]: makes a tag value usable as a file or
/// directory name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeString;

impl Sanitizer for SafeString {
    fn sanitize(&self, input: &str) -> String {
        safe_string(input)
    }
}

/// Make `input` safe for a single path component.
///
/// Separators and `:` become `-`, shell and Windows reserved characters and
/// control characters are dropped, whitespace runs collapse to one space,
/// and leading dots are stripped so the result is never hidden or relative.
pub fn safe_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '/' | '\\' | ':' => out.push('-'),
            '*' | '?' | '"' | '<' | '>' | '|' => {}
            c if c.is_whitespace() => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    let trimmed = out.trim().trim_start_matches('.').trim_start();

    let mut result = String::with_capacity(trimmed.len());
    let mut prev_space = false;
    for ch in trimmed.chars() {
        if ch == ' ' {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            result.push(ch);
            prev_space = false;
        }
    }

    if result.len() > MAX_COMPONENT_LEN {
        let mut end = MAX_COMPONENT_LEN;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
        result.truncate(result.trim_end().len());
    }
    result
}
