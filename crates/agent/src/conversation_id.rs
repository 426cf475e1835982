//! Conversation id generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Process-local generator of `conv_{YYYYMMDD}_{seq:06}` ids.
///
/// The sequence starts at 1 and only grows; it does not reset at midnight.
pub struct ConversationIdGenerator {
    clock: Arc<dyn Clock>,
    next_seq: AtomicU64,
}

impl ConversationIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn next_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        format!("conv_{}_{:06}", self.clock.now().format("%Y%m%d"), seq)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for ConversationIdGenerator {
    fn default() -> Self {
        Self::system()
    }
}
