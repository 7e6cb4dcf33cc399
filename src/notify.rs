// 💬 Notification channel
// Alerts and OK/Cancel prompts shown to whoever runs a ledger operation.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Notifier {
    fn alert(&mut self, message: &str);

    /// OK/Cancel prompt; `true` means OK
    fn confirm(&mut self, title: &str, message: &str) -> bool;
}

/// Prints to stdout and reads answers from stdin
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    /// Answer OK to every prompt without asking (`--yes`)
    pub assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        ConsoleNotifier { assume_yes }
    }
}

impl Notifier for ConsoleNotifier {
    fn alert(&mut self, message: &str) {
        println!("💬 {}", message);
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        println!("❓ {}", title);
        println!("   {}", message);
        if self.assume_yes {
            println!("   → OK (--yes)");
            return true;
        }

        print!("   [s/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí" | "y" | "yes")
    }
}

/// Keeps every message and answers prompts from a queue (empty queue = Cancel)
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub alerts: Vec<String>,
    pub confirmations: Vec<String>,
    pub answers: VecDeque<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: &[bool]) -> Self {
        RecordingNotifier {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn last_alert(&self) -> Option<&str> {
        self.alerts.last().map(String::as_str)
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.confirmations.push(format!("{}: {}", title, message));
        self.answers.pop_front().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_answers_in_order() {
        let mut notifier = RecordingNotifier::answering(&[true, false]);
        assert!(notifier.confirm("A", "first"));
        assert!(!notifier.confirm("B", "second"));
        assert!(!notifier.confirm("C", "queue exhausted"));
        assert_eq!(notifier.confirmations.len(), 3);
        assert_eq!(notifier.confirmations[0], "A: first");
    }

    #[test]
    fn test_recording_notifier_keeps_alerts() {
        let mut notifier = RecordingNotifier::new();
        assert_eq!(notifier.last_alert(), None);
        notifier.alert("uno");
        notifier.alert("dos");
        assert_eq!(notifier.alerts, vec!["uno", "dos"]);
        assert_eq!(notifier.last_alert(), Some("dos"));
    }

    #[test]
    fn test_console_notifier_assume_yes() {
        let mut notifier = ConsoleNotifier::new(true);
        assert!(notifier.confirm("Fecha no encontrada", "¿Usar hoy?"));
    }
}
