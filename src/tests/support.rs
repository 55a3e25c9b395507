//! Infraestrutura compartilhada pelos testes do host.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::mm::config::ZerofatConfig;
use crate::mpu::{AccessMode, ExecuteMode, HwRange, RangeBinding};
use crate::sync::InterruptProbe;

/// Layout pequeno usado pela maioria dos testes: regiões de 1 KiB.
pub fn small_config(base: usize) -> ZerofatConfig {
    ZerofatConfig::new(base, 4096, 64, [32, 64, 128, 256], [512, 768, 1024])
}

/// Memória do host alinhada para servir de heap.
pub struct TestArena {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl TestArena {
    pub fn new() -> Self {
        Self::with_size(4096)
    }

    pub fn with_size(size: usize) -> Self {
        let layout = Layout::from_size_align(size, 1024).unwrap();
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        Self {
            ptr: NonNull::new(ptr).expect("arena de teste"),
            layout,
        }
    }

    pub fn base(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Mantém a memória viva até o fim do processo.
    pub fn leak(self) -> usize {
        let base = self.base();
        core::mem::forget(self);
        base
    }
}

impl Drop for TestArena {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub slot: u8,
    pub range: HwRange,
    pub access: AccessMode,
    pub execute: ExecuteMode,
}

/// MPU falsa: grava cada `commit_range`.
pub struct RecordingBinding {
    commits: Mutex<Vec<Commit>>,
    enabled: AtomicBool,
}

impl RecordingBinding {
    pub const fn new() -> Self {
        Self {
            commits: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(false),
        }
    }

    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().unwrap().clone()
    }

    /// Último intervalo programado em `slot`
    pub fn last_for(&self, slot: u8) -> Option<HwRange> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.slot == slot)
            .map(|c| c.range)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl RangeBinding for RecordingBinding {
    fn commit_range(&self, slot: u8, range: HwRange, access: AccessMode, execute: ExecuteMode) {
        self.commits.lock().unwrap().push(Commit {
            slot,
            range,
            access,
            execute,
        });
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }
}

/// Sonda de IRQ controlada pelo teste.
pub struct FlagProbe(AtomicBool);

impl FlagProbe {
    pub const fn new(in_interrupt: bool) -> Self {
        Self(AtomicBool::new(in_interrupt))
    }

    pub fn set(&self, in_interrupt: bool) {
        self.0.store(in_interrupt, Ordering::Release);
    }
}

impl InterruptProbe for FlagProbe {
    fn in_interrupt(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Gerador determinístico para sequências de teste (LCG).
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}
