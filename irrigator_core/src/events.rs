//! Relay event log and VWC history for chart/audit consumers.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// How long VWC points are kept for the chart.
pub const VWC_HISTORY_RETENTION: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEventKind {
    On,
    Off,
}

impl fmt::Display for RelayEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "ON",
            Self::Off => "OFF",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrigationEvent {
    pub at: Instant,
    pub wall: DateTime<Local>,
    pub kind: RelayEventKind,
}

/// Append-only.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<IrrigationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: IrrigationEvent) {
        tracing::debug!(kind = %event.kind, wall = %event.wall.format("%H:%M:%S"), "relay event");
        self.events.push(event);
    }

    pub fn as_slice(&self) -> &[IrrigationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&IrrigationEvent> {
        self.events.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwcPoint {
    pub at: Instant,
    pub wall: DateTime<Local>,
    pub vwc: f64,
}

/// VWC points ordered by time, evicted once older than the retention horizon.
#[derive(Debug, Clone)]
pub struct VwcHistory {
    points: VecDeque<VwcPoint>,
    retention: Duration,
}

impl Default for VwcHistory {
    fn default() -> Self {
        Self::with_retention(VWC_HISTORY_RETENTION)
    }
}

impl VwcHistory {
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            points: VecDeque::new(),
            retention,
        }
    }

    pub fn record(&mut self, point: VwcPoint) {
        self.points.push_back(point);
        self.evict(point.at);
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.points.front() {
            if now.saturating_duration_since(front.at) > self.retention {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &VwcPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
