//! User-visible notices emitted at the end of an import

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Presentation layer that receives import notices
pub trait NotificationSink {
    fn info(&mut self, message: &str);
    fn warning(&mut self, message: &str);
}

/// Sink that keeps notices in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub notices: Vec<Notice>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, level: NoticeLevel) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.as_str())
            .collect()
    }
}

impl NotificationSink for CollectingSink {
    fn info(&mut self, message: &str) {
        self.notices.push(Notice {
            level: NoticeLevel::Info,
            message: message.to_string(),
        });
    }

    fn warning(&mut self, message: &str) {
        self.notices.push(Notice {
            level: NoticeLevel::Warning,
            message: message.to_string(),
        });
    }
}
