//! Journal de traitement destiné à l'opérateur.
//!
//! Le traitement reçoit un `Console` explicite : en production les lignes
//! partent dans `log`, en test elles sont conservées en mémoire.

use log::Level;

pub const CONSOLE_TARGET: &str = "quadraflow::console";

pub trait Console: Send {
    fn emit(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Level::Error, message);
    }
}

/// Transmet chaque ligne à la façade `log` (affichée via env_logger).
#[derive(Debug, Default)]
pub struct LogConsole;

impl Console for LogConsole {
    fn emit(&mut self, level: Level, message: &str) {
        log::log!(target: CONSOLE_TARGET, level, "{}", message);
    }
}

/// Garde les lignes en mémoire, dans l'ordre d'émission.
#[derive(Debug, Default)]
pub struct RecordingConsole {
    pub lines: Vec<(Level, String)>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, line)| line.contains(needle))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, line)| line.as_str())
    }
}

impl Console for RecordingConsole {
    fn emit(&mut self, level: Level, message: &str) {
        self.lines.push((level, message.to_string()));
    }
}
