//! User feedback sinks
//!
//! The engine reports outcomes through this seam instead of talking to UI
//! directly: transient advisories go to the status line, blocking final
//! failures to a popup, and destructive corrections ask for confirmation.

use std::cell::RefCell;

/// Where user-visible messages go
pub trait FeedbackSink {
    /// Transient advisory, e.g. during a drag preview
    fn status(&self, message: &str);

    /// Blocking failure for a committed command
    fn popup(&self, message: &str);

    /// Ask before a destructive correction; `false` declines
    fn confirm(&self, message: &str) -> bool;
}

/// Swallows everything; confirms everything
#[derive(Debug, Default)]
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn status(&self, _message: &str) {}

    fn popup(&self, _message: &str) {}

    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Captures every call for test assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub statuses: RefCell<Vec<String>>,
    pub popups: RefCell<Vec<String>>,
    pub confirms: RefCell<Vec<String>>,
    /// Answer returned from `confirm`
    pub confirm_answer: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            confirm_answer: true,
            ..Self::default()
        }
    }

    pub fn declining() -> Self {
        Self {
            confirm_answer: false,
            ..Self::default()
        }
    }
}

impl FeedbackSink for RecordingSink {
    fn status(&self, message: &str) {
        self.statuses.borrow_mut().push(message.to_string());
    }

    fn popup(&self, message: &str) {
        self.popups.borrow_mut().push(message.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        self.confirms.borrow_mut().push(message.to_string());
        self.confirm_answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_captures_calls() {
        let sink = RecordingSink::new();
        sink.status("moving");
        sink.popup("blocked");
        assert!(sink.confirm("delete?"));
        assert_eq!(sink.statuses.borrow().len(), 1);
        assert_eq!(sink.popups.borrow().len(), 1);
        assert_eq!(sink.confirms.borrow()[0], "delete?");
    }

    #[test]
    fn test_declining_sink() {
        let sink = RecordingSink::declining();
        assert!(!sink.confirm("delete?"));
    }
}
