//! Testing utilities for the schemavault workspace
//!
//! Shared fixtures: a controllable clock, audit logger fakes, and
//! placeholder field builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use schemavault_core::{
    AuditError, AuditEvent, AuditEventId, AuditLogger, Clock, FieldType, PlaceholderField,
    PlaceholderSchema,
};

/// Clock whose time only moves when a test says so.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
                .single()
                .expect("fixture timestamp is valid"),
        )
    }
}

impl ManualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Audit logger that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditLogger {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AuditLogger for RecordingAuditLogger {
    async fn log_event(&self, event: AuditEvent) -> Result<AuditEventId, AuditError> {
        self.events.lock().push(event);
        Ok(AuditEventId::generate())
    }
}

/// Audit logger that always fails, for exercising the swallow policy.
#[derive(Debug, Default)]
pub struct FailingAuditLogger;

#[async_trait]
impl AuditLogger for FailingAuditLogger {
    async fn log_event(&self, _event: AuditEvent) -> Result<AuditEventId, AuditError> {
        Err(AuditError::SinkUnavailable("injected failure".to_string()))
    }
}

/// A well-formed string field with one location.
pub fn field(key: &str) -> PlaceholderField {
    PlaceholderField::new(key, key.to_uppercase(), FieldType::String)
        .with_locations(vec!["body".to_string()])
}

/// A well-formed field with explicit locations.
pub fn located_field(key: &str, locations: &[&str]) -> PlaceholderField {
    PlaceholderField::new(key, key.to_uppercase(), FieldType::String)
        .with_locations(locations.iter().map(ToString::to_string).collect())
}

/// A well-formed enum field.
pub fn enum_field(key: &str, options: &[&str]) -> PlaceholderField {
    PlaceholderField::new(key, key.to_uppercase(), FieldType::Enum)
        .with_locations(vec!["body".to_string()])
        .with_options(options.iter().map(ToString::to_string).collect())
}

/// A schema built from simple string fields.
pub fn schema_of(keys: &[&str]) -> PlaceholderSchema {
    PlaceholderSchema::from_fields(keys.iter().map(|key| field(key)))
}
