//! Recorded activity replay
//!
//! Parses recorded editing activity (one record per tick) and feeds it through
//! a [`SignalProcessor`] with the recorded timestamps instead of a live clock.

use crate::config::EngineConfig;
use crate::error::SignalError;
use crate::pipeline::{SignalProcessor, TickReport};
use crate::sink::Sink;
use serde::{Deserialize, Serialize};

/// Activity observed during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Tick timestamp in milliseconds
    #[serde(default, deserialize_with = "crate::types::lenient_u64")]
    pub timestamp_ms: u64,
    /// Keystrokes typed since the previous record
    #[serde(default, deserialize_with = "crate::types::lenient_u64")]
    pub keystrokes: u64,
    /// Editor focus at the tick
    #[serde(default, deserialize_with = "crate::types::lenient_bool")]
    pub is_focused: bool,
}

/// Parse newline-delimited JSON records, skipping blank lines
pub fn parse_ndjson(input: &str) -> Result<Vec<ActivityRecord>, SignalError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|e| {
                SignalError::ParseError(format!("line {}: {}", index + 1, e))
            })
        })
        .collect()
}

/// Parse a JSON array of records
pub fn parse_array(input: &str) -> Result<Vec<ActivityRecord>, SignalError> {
    serde_json::from_str(input)
        .map_err(|e| SignalError::ParseError(format!("Failed to parse activity array: {}", e)))
}

/// Replay `records` in timestamp order and flush the final session.
///
/// The processor starts one tick interval before the first record, so the
/// first record covers a full tick.
pub fn replay<K: Sink + ?Sized>(
    records: &[ActivityRecord],
    config: EngineConfig,
    sink: &mut K,
) -> Result<Vec<TickReport>, SignalError> {
    let mut records = records.to_vec();
    records.sort_by_key(|r| r.timestamp_ms);

    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let start_ms = first.timestamp_ms.saturating_sub(config.tick_interval_ms);

    let mut processor = SignalProcessor::new(config, start_ms)?;
    let counter = processor.counter();

    let mut reports = Vec::with_capacity(records.len());
    for record in &records {
        counter.record_keystrokes(record.keystrokes);
        counter.set_focused(record.is_focused);
        reports.push(processor.tick(record.timestamp_ms, sink)?);
    }

    if processor.session().current().tick_count > 0 {
        let end_ms = records.last().map_or(start_ms, |r| r.timestamp_ms);
        processor.flush_session(end_ms, sink)?;
    }

    Ok(reports)
}
