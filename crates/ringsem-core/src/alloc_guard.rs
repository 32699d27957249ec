//! Detection of heap allocation inside code that must not allocate.
//!
//! The time loop runs its step body inside [`forbid_allocations`] in
//! debug builds. A global allocator that calls [`note_allocation`] on
//! every allocation (the counting allocator of `ringsem-test-utils`
//! does) then reports each allocation made inside the scope. With the
//! system allocator the scope only touches two thread-locals.
//!
//! ```rust
//! use ringsem_core::alloc_guard::{forbid_allocations, note_allocation};
//!
//! let ((), n) = forbid_allocations(note_allocation);
//! assert_eq!(n, 1);
//! ```

use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static VIOLATIONS: Cell<usize> = const { Cell::new(0) };
}

/// Record one allocation made by the current thread.
///
/// Meant to be called from a global allocator: it never allocates and
/// never panics, and it is a no-op outside [`forbid_allocations`].
pub fn note_allocation() {
    if allocations_forbidden() {
        let _ = VIOLATIONS.try_with(|n| n.set(n.get().wrapping_add(1)));
    }
}

/// Whether the current thread is inside [`forbid_allocations`].
pub fn allocations_forbidden() -> bool {
    DEPTH.try_with(Cell::get).unwrap_or(0) > 0
}

/// Leaves the scope even if the guarded code panics.
struct Scope;

impl Scope {
    fn enter() -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        Scope
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let _ = DEPTH.try_with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Run `f` and return its output with the number of allocations
/// reported by [`note_allocation`] while it ran.
///
/// Scopes nest; an inner scope's allocations also count for the outer.
pub fn forbid_allocations<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let before = VIOLATIONS.with(Cell::get);
    let out = {
        let _scope = Scope::enter();
        f()
    };
    (out, VIOLATIONS.with(Cell::get).wrapping_sub(before))
}
