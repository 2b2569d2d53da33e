//! Task scheduling for buildq.
//!
//! The producer writes task records into the queue document and announces
//! them; the watcher drains the document at startup and then executes tasks
//! as notifications arrive, one at a time.

pub mod producer;
pub mod watcher;

pub use producer::TaskProducer;
pub use watcher::Watcher;
