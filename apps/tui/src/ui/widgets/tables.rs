/// First row to draw so `selected_index` stays on screen.
pub const fn scroll_offset(
    total_rows: usize,
    max_visible_rows: usize,
    selected_index: usize,
) -> usize {
    if total_rows <= max_visible_rows || selected_index < max_visible_rows {
        return 0;
    }

    selected_index + 1 - max_visible_rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lists_never_scroll() {
        assert_eq!(scroll_offset(4, 10, 3), 0);
    }

    #[test]
    fn selection_past_the_fold_scrolls_to_the_bottom_row() {
        assert_eq!(scroll_offset(100, 10, 9), 0);
        assert_eq!(scroll_offset(100, 10, 10), 1);
        assert_eq!(scroll_offset(100, 10, 57), 48);
    }
}
