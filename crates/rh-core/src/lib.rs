//! # rh-core
//!
//! `rh-core` implements a frequency-based Rowhammer fuzzer: it searches for
//! DRAM access patterns that induce bit flips in contemporary DDR4 devices
//! despite in-DRAM mitigations, jointly exploring the temporal structure of a
//! hammering pattern and its spatial placement onto physical DRAM rows.
//!
//! ## Modules
//!
//! - [`memory`] - DRAM addressing (`DRAMAddr`, `MemConfiguration`), the
//!   hugepage-backed allocation, and the [`memory::DramAnalyzer`] that
//!   measures conflict timing and activations-per-refresh-interval.
//! - [`pattern`] - the abstract frequency-based [`pattern::HammeringPattern`]
//!   model and its builder.
//! - [`mapper`] - [`mapper::PatternAddressMapper`], binding abstract
//!   aggressor IDs to concrete DRAM rows.
//! - [`jitter`] - [`jitter::CodeJitter`], compiling a concrete access
//!   sequence to an executable hammering routine.
//! - [`fuzzing`] - the generate/probe/rank/record loop ([`fuzzing::Fuzzer`])
//!   and its persisted [`fuzzing::FuzzSummary`] output.
//! - [`ras`] - read-only observer for the OS machine-check event store.
//! - [`util`] - shared constants, sizes, RNG and mmap helpers.
//!
//! ## Platform support
//!
//! This crate targets x86_64 Linux with a hugetlbfs mount, `clflushopt`/
//! `rdtscp` support, and (optionally) a `rasdaemon` event database. It does
//! not attempt to deduce a device's address-mapping functions; those are
//! supplied as configuration.

#![warn(missing_docs)]

pub mod fuzzing;
pub mod jitter;
pub mod mapper;
pub mod memory;
pub mod pattern;
pub mod ras;
pub mod util;

pub use ras::RasObserver;
