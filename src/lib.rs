//! This crate provides a client-side cache of desk reservations, as well as to-do tasks and attendance records.
//!
//! Reservations are fetched from a remote store (usually the REST API, through the [`client`] module) into a [`ReservationCache`](cache::ReservationCache).
//! Mutations are applied to the cache right away, so that a calendar widget can display them without waiting for the network,
//! and are reconciled once the remote store has answered. A failed mutation is rolled back.
//!
//! The [`Scheduler`](scheduler::Scheduler) owns a cache and issues the remote calls its mutations need. \
//! Calendar widget interactions are turned into mutations (or editor sessions) by the [`translator`], and the [`editor`] holds the state of a detail form.
//!
//! Tasks ([`task::TaskList`]) and attendance ([`attendance::AttendanceTracker`]) are simpler: they only change once the remote store has answered.

pub mod error;
pub use error::{Error, Result};
pub mod id;
pub use id::{AttendanceId, ReservationId, TaskId};
pub mod traits;

pub mod decoration;
pub mod reservation;
pub use reservation::{Reservation, ReservationDraft, ReservationPatch};
pub mod intent;
pub use intent::Intent;
pub mod cache;
pub use cache::ReservationCache;
pub mod editor;
pub use editor::EditorSession;
pub mod translator;
pub use translator::Interaction;
pub mod scheduler;
pub use scheduler::Scheduler;

pub mod task;
pub use task::{Task, TaskList};
pub mod attendance;
pub use attendance::{AttendanceRecord, AttendanceTracker};

pub mod config;
pub mod resource;
pub mod client;
pub use client::Client;

pub mod mock_behaviour;
pub mod memory_store;
pub use memory_store::MemoryStore;

pub mod utils;
