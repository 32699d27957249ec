//! Test fixtures and an allocation counter for ringsem development.
//!
//! [`fixtures`] holds small planets, sources and 3-D providers that
//! build in milliseconds. [`alloc`] holds a counting global allocator
//! for asserting that code paths do not touch the heap.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod alloc;
pub mod fixtures;

pub use alloc::{count_allocations, CountingAllocator};
