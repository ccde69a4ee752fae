//! Named loggers and capture buffers

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::emitter::Emitter;
use crate::event::Event;

/// Named event source
///
/// Cheap to clone; clones share one name and one emitter. Whether an
/// event actually leaves the process is decided downstream against the
/// enabled set, so calling [`log`](Logger::log) on a disabled logger
/// costs a single lookup.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    emitter: Arc<dyn Emitter>,
}

impl Logger {
    pub(crate) fn new(name: impl Into<String>, emitter: Arc<dyn Emitter>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                emitter,
            }),
        }
    }

    /// Name this logger registered under
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Emit one event
    ///
    /// The single emission entry point; build payloads with the
    /// [`Event`] chain. Never blocks on delivery and never fails.
    pub fn log(&self, event: Event) {
        self.inner.emitter.log(&self.inner.name, &event);
    }

    /// Open a capture buffer that emits on close
    pub fn capture(&self) -> Capture {
        Capture {
            logger: self.clone(),
            holder: Mutex::new(Event::new()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Accumulates key/value pairs and emits them as one event
///
/// Later puts win on key collision. The flush happens exactly once, on
/// drop, whether the capture is closed explicitly or falls out of scope
/// through an early return or a panic.
pub struct Capture {
    logger: Logger,
    holder: Mutex<Event>,
}

impl Capture {
    /// Add one pair to the buffer
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.holder.lock().insert(key, value);
    }

    /// Flush the buffer now
    ///
    /// Equivalent to dropping the capture; exists for call sites that
    /// want the emission point visible.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        let event = mem::take(&mut *self.holder.lock());
        self.logger.log(event);
    }
}
