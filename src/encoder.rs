//! JSON record encoding
//!
//! Wraps sink payloads in self-describing records carrying producer metadata,
//! and provides a newline-delimited JSON sink on top of any writer.

use crate::error::SignalError;
use crate::sink::Sink;
use crate::types::{DashboardUpdate, Notification};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

/// Producer metadata embedded in every record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Producer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Record payload, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordBody {
    Dashboard {
        update: DashboardUpdate,
    },
    Notification {
        notification: Notification,
        message: String,
    },
}

/// A single encoded output record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedRecord {
    pub producer: Producer,
    /// When the record was produced (RFC3339)
    pub emitted_at_utc: String,
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Encoder stamping records with producer metadata
#[derive(Debug, Clone)]
pub struct RecordEncoder {
    instance_id: String,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode_update(&self, update: &DashboardUpdate) -> EncodedRecord {
        self.record(RecordBody::Dashboard {
            update: update.clone(),
        })
    }

    pub fn encode_notification(&self, notification: &Notification) -> EncodedRecord {
        self.record(RecordBody::Notification {
            notification: notification.clone(),
            message: notification.message(),
        })
    }

    fn record(&self, body: RecordBody) -> EncodedRecord {
        EncodedRecord {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            emitted_at_utc: Utc::now().to_rfc3339(),
            body,
        }
    }
}

/// Sink writing one JSON record per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    encoder: RecordEncoder,
    flush: bool,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink over `writer`; with `flush` set, every record is flushed
    /// as soon as it is written
    pub fn new(writer: W, flush: bool) -> Self {
        Self::with_encoder(writer, RecordEncoder::new(), flush)
    }

    pub fn with_encoder(writer: W, encoder: RecordEncoder, flush: bool) -> Self {
        Self {
            writer,
            encoder,
            flush,
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &EncodedRecord) -> Result<(), SignalError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        if self.flush {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError> {
        let record = self.encoder.encode_update(update);
        self.write_record(&record)
    }

    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError> {
        let record = self.encoder.encode_notification(notification);
        self.write_record(&record)
    }
}
