//! # Estatísticas do Heap

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::mm::engine::{AllocPath, Allocation};

/// Contadores por heap, atualizados dentro do lock mas lidos sem ele.
pub struct HeapStats {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    freelist_hits: AtomicUsize,
    bump_hits: AtomicUsize,
    migrations: AtomicUsize,
    reassignments: AtomicUsize,
    fallback_allocations: AtomicUsize,
    fallback_releases: AtomicUsize,
    failures: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub allocations: usize,
    pub releases: usize,
    pub freelist_hits: usize,
    pub bump_hits: usize,
    pub migrations: usize,
    pub reassignments: usize,
    pub fallback_allocations: usize,
    pub fallback_releases: usize,
    pub failures: usize,
}

impl StatsSnapshot {
    /// Blocos de região ainda vivos
    pub fn live_blocks(&self) -> usize {
        self.allocations.saturating_sub(self.releases)
    }
}

#[inline]
fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl HeapStats {
    pub const fn new() -> Self {
        Self {
            allocations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            freelist_hits: AtomicUsize::new(0),
            bump_hits: AtomicUsize::new(0),
            migrations: AtomicUsize::new(0),
            reassignments: AtomicUsize::new(0),
            fallback_allocations: AtomicUsize::new(0),
            fallback_releases: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn record_allocation(&self, allocation: &Allocation) {
        bump(&self.allocations);
        match allocation.path {
            AllocPath::Freelist => bump(&self.freelist_hits),
            AllocPath::Bump => bump(&self.bump_hits),
            AllocPath::Migrated(_) => bump(&self.migrations),
        }
        if allocation.reassigned {
            bump(&self.reassignments);
        }
    }

    pub fn record_release(&self) {
        bump(&self.releases);
    }

    pub fn record_fallback_allocation(&self) {
        bump(&self.fallback_allocations);
    }

    pub fn record_fallback_release(&self) {
        bump(&self.fallback_releases);
    }

    pub fn record_failure(&self) {
        bump(&self.failures);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            freelist_hits: self.freelist_hits.load(Ordering::Relaxed),
            bump_hits: self.bump_hits.load(Ordering::Relaxed),
            migrations: self.migrations.load(Ordering::Relaxed),
            reassignments: self.reassignments.load(Ordering::Relaxed),
            fallback_allocations: self.fallback_allocations.load(Ordering::Relaxed),
            fallback_releases: self.fallback_releases.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for HeapStats {
    fn default() -> Self {
        Self::new()
    }
}
