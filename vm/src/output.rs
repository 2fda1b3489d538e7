use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// Destination for everything a program prints.
pub trait Output {
    fn write_line(&mut self, text: &str);
    fn write(&mut self, text: &str);
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// Writes straight to stdout, flushing after every call.
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl ConsoleOutput {
    fn emit(&mut self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(bytes).and_then(|()| out.flush()) {
            log::warn!("console output failed: {err}");
        }
    }
}

impl Output for ConsoleOutput {
    fn write_line(&mut self, text: &str) {
        self.emit(text.as_bytes());
        self.emit(b"\n");
    }

    fn write(&mut self, text: &str) {
        self.emit(text.as_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.emit(bytes);
    }
}

/// Captures output in memory.
///
/// Clones share one buffer, so the host keeps a clone and reads it after the
/// VM has taken ownership of the sink.
#[derive(Debug, Clone, Default)]
pub struct LoggedOutput {
    log: Arc<Mutex<String>>,
}

impl LoggedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.log.lock().clone()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Output for LoggedOutput {
    fn write_line(&mut self, text: &str) {
        let mut log = self.log.lock();
        log.push_str(text);
        log.push('\n');
    }

    fn write(&mut self, text: &str) {
        self.log.lock().push_str(text);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.log.lock().push_str(&String::from_utf8_lossy(bytes));
    }
}
