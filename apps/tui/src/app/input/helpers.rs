//! Cursor movement for suggestion lists and filter picker columns, wrapping past either end.

pub const fn wrap_decrement(index: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }

    if index == 0 {
        len - 1
    } else {
        index - 1
    }
}

pub const fn wrap_increment(index: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }

    (index + 1) % len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_at_both_ends() {
        assert_eq!(wrap_decrement(0, 5), 4);
        assert_eq!(wrap_decrement(3, 5), 2);
        assert_eq!(wrap_increment(4, 5), 0);
        assert_eq!(wrap_increment(1, 5), 2);
    }

    #[test]
    fn test_empty_lists_stay_at_zero() {
        assert_eq!(wrap_decrement(0, 0), 0);
        assert_eq!(wrap_increment(7, 0), 0);
    }
}
