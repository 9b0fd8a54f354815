//! Output boundary
//!
//! A [`Sink`] receives the flat dashboard payload every tick and ad-hoc
//! notifications for state transitions, confirmed flow episodes and session
//! summaries. How they are rendered or transported is up to the sink.

use crate::error::SignalError;
use crate::types::{DashboardUpdate, Notification};
use log::info;

/// Receiver of derived output
pub trait Sink {
    /// Per-tick dashboard payload
    fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError>;

    /// Human-facing notification
    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError>;
}

impl<T: Sink + ?Sized> Sink for &mut T {
    fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError> {
        (**self).publish(update)
    }

    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError> {
        (**self).notify(notification)
    }
}

/// In-memory sink keeping everything it receives
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub updates: Vec<DashboardUpdate>,
    pub notifications: Vec<Notification>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered notification messages, in delivery order
    pub fn messages(&self) -> Vec<String> {
        self.notifications.iter().map(Notification::message).collect()
    }
}

impl Sink for CollectingSink {
    fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError> {
        self.updates.push(update.clone());
        Ok(())
    }

    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError> {
        self.notifications.push(notification.clone());
        Ok(())
    }
}

/// Sink that only logs notifications; dashboard updates are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn publish(&mut self, _update: &DashboardUpdate) -> Result<(), SignalError> {
        Ok(())
    }

    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError> {
        info!("{}", notification.message());
        Ok(())
    }
}
