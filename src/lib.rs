//! # `swell` - Thread-Safe Growable Vector
//!
//! A dynamically growable vector that any number of threads may append to,
//! read from, and overwrite simultaneously, while the backing storage
//! transparently grows under load.
//!
//! ## Protocol
//!
//! Three atomic counters and one reader-writer gate carry the whole design:
//!
//! 1. **Slot reservation**: appending threads claim unique indices with a
//!    single relaxed `fetch_add` on the reservation counter. No lock, no
//!    failure, no overlapping ranges.
//! 2. **Growth control**: when a claimed index lands past the current
//!    capacity, the claiming thread grows the buffer under the exclusive
//!    gate (re-checking under the lock so racing growers don't reallocate
//!    twice), applying a three-halves growth factor with a `+1` floor.
//! 3. **Access gating**: element reads and writes take the gate in *shared*
//!    mode and run fully concurrently; only reallocation and `clear` take it
//!    exclusively. The published-length counter advances strictly after each
//!    element write, so readers never observe a torn or uninitialized slot.
//!
//! ## Pluggable policies
//!
//! - **Gate backend** ([`Gate`]): [`TicketGate`], a FIFO ticket spinlock pair
//!   (default: fair, no writer starvation), or [`CondvarGate`], a blocking
//!   reader-writer lock. Same contract, different waiting behavior.
//! - **Allocator** ([`BufferAlloc`]): defaults to the global heap; any
//!   backend honoring the layout contract plugs in.
//! - **Growth factor, initial capacity, cache-line alignment, per-element
//!   drop hook**: all configured through [`ConcurrentVec::builder`].
//!
//! ## Example
//!
//! ```rust
//! use swell::ConcurrentVec;
//!
//! let vec = ConcurrentVec::with_capacity(8);
//!
//! std::thread::scope(|s| {
//!     for t in 0..4 {
//!         let vec = &vec;
//!         s.spawn(move || {
//!             for i in 0..100u64 {
//!                 vec.push(t * 100 + i).unwrap();
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(vec.len(), 400);
//! assert_eq!(vec.iter().sum::<u64>(), (0..400).sum());
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod error;
pub mod gate;
pub mod growth;
mod raw;
pub mod vec;

pub use alloc::{BufferAlloc, Heap};
pub use error::TryReserveError;
pub use gate::{CondvarGate, Gate, TicketGate};
pub use growth::Growth;
pub use vec::{Builder, ConcurrentVec, Iter, DEFAULT_CAPACITY};
