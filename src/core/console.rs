//! The external world as seen by the `IO` nodes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Terminal-like effects available to I/O nodes.
///
/// Implementations never fail loudly: a broken stdout or an exhausted stdin
/// is logged and reported as "nothing read".
pub trait Console {
    fn write(&mut self, text: &str);

    fn read_line(&mut self) -> Option<String>;

    fn read_key(&mut self) -> Option<char>;

    fn clear(&mut self);
}

/// The process's stdin/stdout.
#[derive(Default)]
pub struct StdConsole {
    // Characters of the current stdin line not yet consumed by `read_key`.
    keys: VecDeque<char>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for StdConsole {
    fn write(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            log::warn!("console write failed: {}", e);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        if !self.keys.is_empty() {
            let rest: String = self.keys.drain(..).collect();
            return Some(rest.trim_end_matches(['\r', '\n']).to_string());
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                log::warn!("console read failed: {}", e);
                None
            }
        }
    }

    fn read_key(&mut self) -> Option<char> {
        if self.keys.is_empty() {
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self.keys.extend(line.chars()),
                Err(e) => {
                    log::warn!("console read failed: {}", e);
                    return None;
                }
            }
        }
        self.keys.pop_front()
    }

    fn clear(&mut self) {
        self.write("\x1b[2J\x1b[H");
    }
}

/// Everything a [`BufferConsole`] has seen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transcript {
    /// One entry per `write` call, in order.
    pub writes: Vec<String>,
    pub clears: usize,
    /// Scripted input, consumed front to back.
    pub input: VecDeque<String>,
}

impl Transcript {
    /// All written text concatenated.
    pub fn output(&self) -> String {
        self.writes.concat()
    }
}

/// An in-memory console with scripted input, shareable with the code that
/// inspects it afterwards.
#[derive(Clone, Default)]
pub struct BufferConsole {
    transcript: Rc<RefCell<Transcript>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// A console whose stdin yields `lines` one by one.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::new();
        console
            .transcript
            .borrow_mut()
            .input
            .extend(lines.into_iter().map(Into::into));
        console
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.borrow().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.transcript.borrow().writes.clone()
    }
}

impl Console for BufferConsole {
    fn write(&mut self, text: &str) {
        self.transcript.borrow_mut().writes.push(text.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.transcript.borrow_mut().input.pop_front()
    }

    fn read_key(&mut self) -> Option<char> {
        let mut transcript = self.transcript.borrow_mut();
        loop {
            let line = transcript.input.front_mut()?;
            if line.is_empty() {
                transcript.input.pop_front();
                continue;
            }
            let key = line.remove(0);
            if line.is_empty() {
                transcript.input.pop_front();
            }
            return Some(key);
        }
    }

    fn clear(&mut self) {
        self.transcript.borrow_mut().clears += 1;
    }
}
