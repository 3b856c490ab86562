/// Display sink that records and logs what it is showing
use crate::domain::connection::{DisplaySink, MediaStreamRef};
use std::sync::RwLock;
use tracing::info;

pub struct LoggingDisplaySink {
    name: String,
    current: RwLock<Option<MediaStreamRef>>,
}

impl LoggingDisplaySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stream currently attached, if any
    pub fn current(&self) -> Option<MediaStreamRef> {
        self.current
            .read()
            .map(|current| current.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl DisplaySink for LoggingDisplaySink {
    fn attach(&self, stream: Option<MediaStreamRef>) {
        match &stream {
            Some(s) => info!("{}: showing stream {}", self.name, s.id),
            None => info!("{}: cleared", self.name),
        }
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = stream;
    }
}
