#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core irrigation logic (hardware-agnostic).
//!
//! All hardware interactions go through `irrigator_traits::Transport` and
//! `irrigator_traits::Relay`; time comes from `irrigator_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Sampling**: bounded rolling window with 10 s / 60 s averages (`window`)
//! - **Estimation**: VWC from weight and the saturation baseline (`vwc`)
//! - **Control**: relay state machine with the AllowRelay interlock (`controller`)
//! - **Recalibration**: drain/collect phase machine and manual-run thread (`recalibration`)
//! - **Ingestion**: line parsing, reader thread and run loop (`ingest`, `reader`, `runner`)
//! - **Output**: CSV measurement log, relay events, VWC history (`logger`, `events`)

pub mod baseline;
pub mod builder;
pub mod controller;
pub mod error;
pub mod events;
pub mod hw_error;
pub mod ingest;
pub mod logger;
pub mod mocks;
pub mod reader;
pub mod recalibration;
pub mod runner;
pub mod settings;
pub mod status;
pub mod vwc;
pub mod window;

pub use baseline::SaturationBaseline;
pub use builder::ControllerBuilder;
pub use controller::{IrrigationController, ManualPoll, SharedClock, Tick, Transition};
pub use error::{BuildError, IrrigatorError, Result, Unavailable};
pub use events::{EventLog, IrrigationEvent, RelayEventKind, VwcHistory, VwcPoint};
pub use ingest::{Ingestion, Line, LineOutcome, parse_line};
pub use logger::{CsvFileSink, LogRow, LogSink, MemorySink};
pub use reader::{DeviceCommand, LineReader, ReaderTimings};
pub use recalibration::{ManualRecalibrator, Recalibration, Step, spawn_manual};
pub use runner::{OperatorCommand, RunOptions, RunSummary};
pub use settings::{SettingsSource, StaticSettings, TrayFileSettings, TrayInputs, TrayInputsExt};
pub use status::{ControllerMode, ControllerSnapshot, Status};
pub use vwc::{estimate_vwc, vwc_from_parts, weight_drop_threshold};
pub use window::{Sample, SampleWindow};
