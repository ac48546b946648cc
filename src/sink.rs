//! Sink abstraction shared by every output stage
//!
//! A [`Sink`] accepts one [`Record`] for final disposition. Stages compose by
//! wrapping: `Filter<Formatter<W>>` filters before formatting, a bare
//! `Formatter<W>` prints everything, and [`crate::async_sink::AsyncSink`]
//! queues records for another sink running on its own task.

use std::sync::Arc;

use crate::record::Record;

/// Anything capable of accepting one record.
///
/// Implementations must not fail: errors are handled (logged) inside the
/// sink, since callers have no recovery path per record.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    /// Take ownership of a record and dispose of it
    async fn print(&self, record: Record);
}

#[async_trait::async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    async fn print(&self, record: Record) {
        (**self).print(record).await
    }
}

#[async_trait::async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn print(&self, record: Record) {
        (**self).print(record).await
    }
}
