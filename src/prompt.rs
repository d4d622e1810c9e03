use rustyline::history::MemHistory;
use rustyline::{Config, Editor};

/// Line-based conversation with the user.
pub trait Prompt {
    /// Returns `None` once there is no more input (end of file or interrupt).
    fn ask(&mut self, message: &str) -> Option<String>;

    fn say(&mut self, message: &str);
}

/// Terminal prompt with in-memory history.
pub struct Console {
    inner: Editor<(), MemHistory>,
}

impl Console {
    pub fn new() -> Result<Self, rustyline::error::ReadlineError> {
        let inner = Editor::with_history(Config::default(), MemHistory::new())?;
        Ok(Self { inner })
    }
}

impl Prompt for Console {
    fn ask(&mut self, message: &str) -> Option<String> {
        let input = self.inner.readline(message).ok()?;
        self.inner.add_history_entry(input.as_str()).ok();
        Some(input)
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Replays canned answers and records everything said, for driving interactive flows in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Script {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
    pub said: Vec<String>,
}

#[cfg(test)]
impl Script {
    pub fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            answers: answers.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> String {
        self.said.join("\n")
    }
}

#[cfg(test)]
impl Prompt for Script {
    fn ask(&mut self, message: &str) -> Option<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front()
    }

    fn say(&mut self, message: &str) {
        self.said.push(message.to_string());
    }
}
