use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single line text collector for the command line (search terms, filter
/// expressions). Tracks the cursor in characters; edits find the byte
/// position on demand so multi byte input stays intact.
#[derive(Default)]
pub struct Inputter {
    prompt: String,
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub prompt: String,
    pub input: String,
    pub cursor: usize,
    pub finished: bool,
    pub canceled: bool,
}

impl Inputter {
    pub fn start(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
        self.buffer.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            prompt: self.prompt.clone(),
            input: self.buffer.clone(),
            cursor: self.cursor,
            finished: self.finished,
            canceled: self.canceled,
        }
    }

    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.buffer.clear();
                self.cursor = 0;
                self.finished = true;
                self.canceled = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                self.cursor = (self.cursor + 1).min(self.buffer.chars().count());
            }
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    self.buffer.insert(self.byte_pos(self.cursor), chr);
                    self.cursor += 1;
                }
            }
        }
        self.get()
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_pos(self.cursor - 1);
            self.buffer.remove(at);
            self.cursor -= 1;
        }
    }

    fn byte_pos(&self, chars: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(chars)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}
