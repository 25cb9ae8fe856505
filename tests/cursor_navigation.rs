use autojacks::cursor::{JumpError, NavigationCursor};

#[test]
fn next_wraps_back_to_start_after_total_steps() {
    for total in [1, 2, 7] {
        let mut cursor = NavigationCursor::new(total);
        for _ in 0..total {
            cursor.next();
        }
        assert_eq!(cursor.index(), 0, "total={total}");
    }
}

#[test]
fn previous_wraps_to_last_entry() {
    let mut cursor = NavigationCursor::new(4);
    assert_eq!(cursor.previous(), Some(3));
    assert_eq!(cursor.previous(), Some(2));

    for _ in 0..4 {
        cursor.previous();
    }
    assert_eq!(cursor.index(), 2);
}

#[test]
fn jump_is_one_indexed_and_bounds_checked() {
    let mut cursor = NavigationCursor::new(5);

    assert_eq!(cursor.jump(5), Ok(4));
    assert_eq!(cursor.index(), 4);
    assert_eq!(cursor.jump(1), Ok(0));

    cursor.next();
    for bad in [0, 6, 100] {
        assert_eq!(
            cursor.jump(bad),
            Err(JumpError::OutOfRange {
                target: bad,
                total: 5
            })
        );
        assert_eq!(cursor.index(), 1);
    }
}

#[test]
fn out_of_range_message_names_the_bounds() {
    let err = NavigationCursor::new(3).jump(9).unwrap_err();
    assert_eq!(err.to_string(), "Invalid number. Must be between 1 and 3");
}

#[test]
fn empty_cursor_never_moves() {
    let mut cursor = NavigationCursor::new(0);
    assert!(cursor.is_empty());
    assert_eq!(cursor.next(), None);
    assert_eq!(cursor.previous(), None);
    assert_eq!(cursor.jump(1), Err(JumpError::Empty));
    assert_eq!(cursor.index(), 0);
}
