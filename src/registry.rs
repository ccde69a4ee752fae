//! Logger registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::emitter::Emitter;
use crate::logger::Logger;

/// Cache of named loggers, one per name
///
/// The first `get` for a name registers it with the emitter; later gets
/// return clones of the cached logger without touching the emitter.
pub struct LoggerRegistry {
    emitter: Arc<dyn Emitter>,
    loggers: Mutex<HashMap<String, Logger>>,
}

impl LoggerRegistry {
    pub fn new(emitter: Arc<dyn Emitter>) -> Self {
        Self {
            emitter,
            loggers: Mutex::new(HashMap::new()),
        }
    }

    /// Logger for `name`, creating and registering it on first use
    pub fn get(&self, name: &str) -> Logger {
        let mut loggers = self.loggers.lock();
        if let Some(logger) = loggers.get(name) {
            return logger.clone();
        }
        // Registration runs under the lock, before the logger becomes
        // visible: two racing gets must produce exactly one registration.
        self.emitter.register(name);
        let logger = Logger::new(name, Arc::clone(&self.emitter));
        loggers.insert(name.to_string(), logger.clone());
        logger
    }

    /// Number of distinct loggers handed out so far
    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().is_empty()
    }
}
