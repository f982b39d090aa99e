#![warn(clippy::all, rust_2018_idioms)]

//! ec2dash - EC2 Instance Console
//!
//! A small resource-sync client for the EC2 control plane plus a local HTTP
//! proxy. One validated credential session at a time drives paginated
//! instance fetches, a deterministic multi-key ordering, and single-instance
//! start/stop/reboot commands with an awaited re-fetch after every
//! acknowledged action.
//!
//! # Architecture Overview
//!
//! - **Session** ([`app::session`]): the credential/region bundle and the
//!   single live client handle, replaced wholesale on reconnect.
//! - **Filters** ([`app::filters`]): free-text filter input normalized into a
//!   structured, immutable query.
//! - **Inventory** ([`app::inventory`]): paginated describe calls flattened
//!   into normalized records, bounded by a record cap and a per-call timeout.
//! - **Presentation** ([`app::presentation`]): rendered rows with start/stop
//!   enablement recomputed from state on every pass.
//! - **Dispatch** ([`app::dispatch`]): one mutating command per call, no
//!   batching, no retry.
//! - **Controller** ([`app::InstanceConsole`]): owns session, last filter and
//!   record cache; drops concurrent fetches instead of queueing them.
//! - **Server** ([`app::server`]): the axum REST surface the thin front-ends
//!   talk to.
//!
//! Remote failures are categorized into a small taxonomy
//! ([`app::sdk_errors::ConsoleError`]); every retry is a fresh user action.

pub mod app;
