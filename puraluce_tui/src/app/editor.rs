use ratatui::layout::Rect;

/// Columns taken by the ` › ` marker in front of each input line.
pub const INPUT_PREFIX_WIDTH: usize = 3;

pub fn split_line_at_char(line: &str, idx: usize) -> (String, Option<char>, String) {
    let mut before = String::new();
    let mut current = None;
    let mut after = String::new();

    for (i, ch) in line.chars().enumerate() {
        match i.cmp(&idx) {
            std::cmp::Ordering::Less => before.push(ch),
            std::cmp::Ordering::Equal => current = Some(ch),
            std::cmp::Ordering::Greater => after.push(ch),
        }
    }

    (before, current, after)
}

pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

pub fn insert_char_at_cursor(text: &mut String, cursor: &mut usize, ch: char) {
    let idx = byte_index(text, *cursor);
    text.insert(idx, ch);
    *cursor += 1;
}

pub fn insert_str_at_cursor(text: &mut String, cursor: &mut usize, chunk: &str) {
    let idx = byte_index(text, *cursor);
    text.insert_str(idx, chunk);
    *cursor += char_count(chunk);
}

pub fn delete_char_before_cursor(text: &mut String, cursor: &mut usize) {
    if *cursor == 0 {
        return;
    }
    let start = byte_index(text, *cursor - 1);
    let end = byte_index(text, *cursor);
    if start < end {
        text.replace_range(start..end, "");
        *cursor -= 1;
    }
}

pub fn delete_char_at_cursor(text: &mut String, cursor: &mut usize) {
    if *cursor >= char_count(text) {
        return;
    }
    let start = byte_index(text, *cursor);
    let end = byte_index(text, *cursor + 1);
    text.replace_range(start..end, "");
}

pub fn move_cursor_left(cursor: &mut usize) {
    *cursor = cursor.saturating_sub(1);
}

pub fn move_cursor_right(text: &str, cursor: &mut usize) {
    *cursor = (*cursor + 1).min(char_count(text));
}

fn line_lengths(text: &str) -> Vec<usize> {
    text.split('\n').map(char_count).collect()
}

fn cursor_line_col(line_lens: &[usize], cursor: usize) -> (usize, usize) {
    let mut remaining = cursor;
    for (i, len) in line_lens.iter().enumerate() {
        if remaining <= *len {
            return (i, remaining);
        }
        remaining = remaining.saturating_sub(len + 1);
    }
    let last = line_lens.len().saturating_sub(1);
    (last, line_lens.get(last).copied().unwrap_or(0))
}

fn cursor_from_line_col(line_lens: &[usize], line_idx: usize, col: usize) -> usize {
    let preceding: usize = line_lens.iter().take(line_idx).map(|len| len + 1).sum();
    let line_len = line_lens.get(line_idx).copied().unwrap_or(0);
    preceding + col.min(line_len)
}

/// Cursor row within the text, used to keep the caret visible.
pub fn cursor_line(text: &str, cursor: usize) -> usize {
    cursor_line_col(&line_lengths(text), cursor).0
}

pub fn move_cursor_up(text: &str, cursor: &mut usize) {
    let line_lens = line_lengths(text);
    let (line, col) = cursor_line_col(&line_lens, *cursor);
    *cursor = cursor_from_line_col(&line_lens, line.saturating_sub(1), col);
}

pub fn move_cursor_down(text: &str, cursor: &mut usize) {
    let line_lens = line_lengths(text);
    let (line, col) = cursor_line_col(&line_lens, *cursor);
    let target = (line + 1).min(line_lens.len().saturating_sub(1));
    *cursor = cursor_from_line_col(&line_lens, target, col);
}

pub fn move_cursor_line_start(text: &str, cursor: &mut usize) {
    let line_lens = line_lengths(text);
    let (line, _) = cursor_line_col(&line_lens, *cursor);
    *cursor = cursor_from_line_col(&line_lens, line, 0);
}

pub fn move_cursor_line_end(text: &str, cursor: &mut usize) {
    let line_lens = line_lengths(text);
    let (line, _) = cursor_line_col(&line_lens, *cursor);
    *cursor = cursor_from_line_col(&line_lens, line, usize::MAX);
}

pub fn point_in_rect(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x
        && col < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// Places the cursor under a click inside a bordered input box. `first_line`
/// is the text row shown on the first inner row.
pub fn set_cursor_from_click(
    text: &str,
    cursor: &mut usize,
    area: Rect,
    first_line: usize,
    col: u16,
    row: u16,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let inner_row = row.saturating_sub(area.y).saturating_sub(1) as usize;
    let inner_col = col.saturating_sub(area.x).saturating_sub(1) as usize;
    let line_lens = line_lengths(text);
    let line_idx = (first_line + inner_row).min(line_lens.len().saturating_sub(1));
    let target_col = inner_col.saturating_sub(INPUT_PREFIX_WIDTH);

    *cursor = cursor_from_line_col(&line_lens, line_idx, target_col);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_respects_multibyte_chars() {
        let mut text = String::from("Perché");
        let mut cursor = char_count(&text);
        delete_char_before_cursor(&mut text, &mut cursor);
        assert_eq!(text, "Perch");
        insert_char_at_cursor(&mut text, &mut cursor, 'è');
        assert_eq!(text, "Perchè");
        assert_eq!(cursor, 6);

        cursor = 0;
        delete_char_at_cursor(&mut text, &mut cursor);
        assert_eq!(text, "erchè");
    }

    #[test]
    fn paste_moves_cursor_past_chunk() {
        let mut text = String::from("Santa");
        let mut cursor = 5;
        insert_str_at_cursor(&mut text, &mut cursor, " Rita");
        assert_eq!(text, "Santa Rita");
        assert_eq!(cursor, 10);
    }

    #[test]
    fn vertical_moves_clamp_to_line_length() {
        let text = "Paura\ndel futuro lontano\nora";
        let mut cursor = 15;
        move_cursor_down(text, &mut cursor);
        assert_eq!(cursor_line(text, cursor), 2);
        assert_eq!(cursor, char_count(text));

        move_cursor_up(text, &mut cursor);
        move_cursor_up(text, &mut cursor);
        assert_eq!(cursor_line(text, cursor), 0);
        assert_eq!(cursor, 3);

        move_cursor_line_end(text, &mut cursor);
        assert_eq!(cursor, 5);
        move_cursor_line_start(text, &mut cursor);
        assert_eq!(cursor, 0);
    }

    #[test]
    fn click_maps_to_line_and_column() {
        let text = "uno\ndue\ntre";
        let area = Rect::new(10, 5, 30, 5);
        let mut cursor = 0;
        // second inner row, two chars into the text
        set_cursor_from_click(text, &mut cursor, area, 0, 11 + 3 + 2, 7);
        assert_eq!(cursor, 6);

        set_cursor_from_click(text, &mut cursor, area, 1, 11, 6);
        assert_eq!(cursor, 4);
    }
}
