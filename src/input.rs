/// Single-line text field used by the search dialog and name prompts.
/// The cursor counts chars, not bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.text.chars().count();
        if self.cursor < len {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let byte = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let b0 = char_to_byte_index(&self.text, self.cursor - 1);
        let b1 = char_to_byte_index(&self.text, self.cursor);
        if b0 < b1 {
            self.text.replace_range(b0..b1, "");
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        let len = self.text.chars().count();
        if self.cursor >= len {
            return;
        }
        let b0 = char_to_byte_index(&self.text, self.cursor);
        let b1 = char_to_byte_index(&self.text, self.cursor + 1);
        if b0 < b1 {
            self.text.replace_range(b0..b1, "");
        }
    }

    /// Delete back to the previous word boundary (Ctrl+W).
    pub fn delete_word(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut start = self.cursor.min(chars.len());
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let b0 = char_to_byte_index(&self.text, start);
        let b1 = char_to_byte_index(&self.text, self.cursor);
        self.text.replace_range(b0..b1, "");
        self.cursor = start;
    }

    /// Text before the cursor, for placing the terminal caret.
    pub fn before_cursor(&self) -> &str {
        &self.text[..char_to_byte_index(&self.text, self.cursor)]
    }
}

fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or_else(|| s.len())
}
