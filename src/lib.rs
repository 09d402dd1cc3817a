//! Emulation of a single RV32IMAC hart: the fetch-decode-execute engine of a
//! 32-bit RISC-V core with the multiply/divide, atomic, and
//! compressed-instruction extensions.
//!
//! The crate deliberately stops at the core's edge. All memory and
//! memory-mapped peripherals live behind the [`bus::Bus`] trait, which the
//! host implements; the core only issues byte/halfword/word accesses at
//! addresses derived from its own register state. Construct a
//! [`core::Core`] with a bus and a [`core::Config`], then drive it by
//! calling [`core::Core::step`] in a loop.
//!
//! There is no MMU, no privilege levels, and no trap vectors: anything the
//! core cannot execute surfaces as an explicit [`core::StepError`] for the
//! host to act on.

#[macro_use]
extern crate static_assertions;

pub mod bus;
pub mod core;
pub mod instruction;
pub mod registers;
pub mod trace;
