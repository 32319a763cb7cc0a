//! Locating the edit point between two revisions of the buffer.

/// Index of the first `char` at which `old` and `new` differ.
///
/// When one string is a strict prefix of the other the shorter length is returned. Identical
/// strings yield `None`, meaning there is nothing to rebase. Only the leading edge of the change
/// is located: callers assume a single contiguous insertion, deletion, or replacement.
pub fn first_difference(old: &str, new: &str) -> Option<usize> {
    let mut old_chars = old.chars();
    let mut new_chars = new.chars();
    let mut index = 0;
    loop {
        match (old_chars.next(), new_chars.next()) {
            (None, None) => return None,
            (Some(a), Some(b)) if a == b => index += 1,
            _ => return Some(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_no_difference() {
        assert_eq!(first_difference("", ""), None);
        assert_eq!(first_difference("echo foo", "echo foo"), None);
    }

    #[test]
    fn finds_first_mismatch() {
        assert_eq!(first_difference("echo foo", "echo boo"), Some(5));
        assert_eq!(first_difference("abc", "xbc"), Some(0));
    }

    #[test]
    fn prefix_returns_shorter_length() {
        assert_eq!(first_difference("echo", "echo foo"), Some(4));
        assert_eq!(first_difference("echo foo", "echo"), Some(4));
        assert_eq!(first_difference("", "x"), Some(0));
        assert_eq!(first_difference("x", ""), Some(0));
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(first_difference("héllo", "héllO"), Some(4));
    }
}
