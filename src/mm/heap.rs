//! # Zerofat Heap
//!
//! Fachada do alocador: lock único, inicialização preguiçosa, MPU e
//! fallback. Toda a contabilidade vive no `RegionEngine`; aqui só entram os
//! efeitos colaterais.
//!
//! ## 🎯 Propósito e Responsabilidade
//! - **Superfície estilo C:** `allocate`, `release`, `zeroed_allocate`,
//!   `reallocate` devolvem ponteiro nulo em falha e logam rejeições.
//! - **Superfície tipada:** as variantes `try_*` devolvem `ZfResult`.
//! - **Global Allocator:** implementa `GlobalAlloc` (padrão `LockedHeap`).
//!
//! ## 🏗️ Seção Crítica
//! 1. `assert_thread_context` (antes do lock: nunca travar sob IRQ)
//! 2. `spin::Mutex` do motor
//! 3. mutação no `RegionEngine`
//! 4. `commit_range` das regiões que mudaram, ainda com o lock
//! 5. ponteiro devolvido ao chamador
//!
//! ## ⚠️ Pontos de Atenção
//! - `zeroed_allocate` tenta primeiro o fallback (calloc vai direto para o
//!   alocador real) e só usa as regiões se ele falhar.
//! - `reallocate(p, 0)` é um `allocate(0)`: `p` não é liberado nem lido.

use core::alloc::{GlobalAlloc, Layout};
use core::panic::Location;
use core::ptr::{self, NonNull};

use crate::mm::config::{ZerofatConfig, BLOCK_ALIGN};
use crate::mm::engine::{Allocation, RegionEngine};
use crate::mm::error::{ZfError, ZfResult};
use crate::mm::fallback::FallbackAllocator;
use crate::mm::region::{Region, RegionLookup};
use crate::mm::stats::{HeapStats, StatsSnapshot};
use crate::mm::trace::{self, TraceOp};
use crate::mpu::{AccessMode, ExecuteMode, RangeBinding};
use crate::sync::{assert_thread_context, InterruptProbe, Mutex, MutexGuard, Once};

/// Alocador completo: regiões + MPU + fallback + sonda de IRQ.
pub struct ZerofatHeap<B, F, P> {
    config: ZerofatConfig,
    binding: B,
    fallback: F,
    probe: P,
    state: Once<Mutex<RegionEngine>>,
    stats: HeapStats,
}

impl<B, F, P> ZerofatHeap<B, F, P> {
    /// Construtor em tempo de compilação. Nada é tocado até a primeira
    /// chamada.
    pub const fn new(config: ZerofatConfig, binding: B, fallback: F, probe: P) -> Self {
        Self {
            config,
            binding,
            fallback,
            probe,
            state: Once::new(),
            stats: HeapStats::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &ZerofatConfig {
        &self.config
    }

    #[inline]
    pub fn binding(&self) -> &B {
        &self.binding
    }

    #[inline]
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    #[inline]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_completed()
    }
}

impl<B, F, P> ZerofatHeap<B, F, P>
where
    B: RangeBinding,
    F: FallbackAllocator,
    P: InterruptProbe,
{
    // =========================================================================
    // INICIALIZAÇÃO
    // =========================================================================

    /// Divide o heap, programa a MPU e habilita. Idempotente.
    pub fn ensure_initialized(&self) {
        self.engine();
    }

    fn engine(&self) -> &Mutex<RegionEngine> {
        self.state.call_once(|| self.bring_up())
    }

    fn bring_up(&self) -> Mutex<RegionEngine> {
        let engine = match RegionEngine::new(&self.config) {
            Ok(engine) => engine,
            Err(err) => {
                crate::zerror!("(Zerofat) FATAL: configuração do heap inválida");
                panic!("zerofat: {}", err);
            }
        };

        for system in self.config.system_regions.iter() {
            self.binding
                .commit_range(system.slot, system.range, system.access, system.execute);
        }
        for region in engine.table().iter() {
            self.commit_region(region);
        }
        self.binding.enable();

        crate::zinfo!("(Zerofat) heap base=", self.config.heap_base);
        crate::zinfo!("(Zerofat) tamanho da região=", self.config.region_size());
        crate::zok!("(Zerofat) regiões programadas na MPU");
        Mutex::new(engine)
    }

    fn commit_region(&self, region: &Region) {
        self.binding.commit_range(
            self.config.mpu_slot(region.index().get()),
            region.span(),
            AccessMode::ReadWrite,
            ExecuteMode::NeverExecute,
        );
    }

    fn commit_dirty(&self, engine: &RegionEngine, allocation: &Allocation) {
        for index in allocation.dirty() {
            self.commit_region(engine.table().get(index));
        }
    }

    /// Lock do motor, depois da checagem de contexto.
    #[track_caller]
    fn lock(&self, op: &'static str) -> MutexGuard<'_, RegionEngine> {
        assert_thread_context(&self.probe, op);
        self.engine().lock()
    }

    /// Acesso de leitura ao estado (diagnóstico e testes).
    #[track_caller]
    pub fn inspect<R>(&self, f: impl FnOnce(&RegionEngine) -> R) -> R {
        let engine = self.lock("inspect");
        f(&engine)
    }

    // =========================================================================
    // CAMINHOS COM LOCK
    // =========================================================================

    /// Só regiões; reprograma a MPU antes de devolver o ponteiro.
    fn region_allocate(&self, engine: &mut RegionEngine, size: usize) -> ZfResult<NonNull<u8>> {
        let allocation = engine.allocate(size)?;
        self.commit_dirty(engine, &allocation);
        self.stats.record_allocation(&allocation);
        Ok(allocation.ptr)
    }

    /// Regiões e, em OOM, o fallback.
    fn allocate_locked(&self, engine: &mut RegionEngine, size: usize) -> ZfResult<NonNull<u8>> {
        match self.region_allocate(engine, size) {
            Err(ZfError::OutOfMemory) => {
                let ptr = self.fallback.allocate(size).ok_or(ZfError::OutOfMemory)?;
                self.stats.record_fallback_allocation();
                crate::zdebug!("(Zerofat) regiões sem folga, fallback=", ptr.as_ptr() as usize);
                Ok(ptr)
            }
            other => other,
        }
    }

    fn release_locked(&self, engine: &mut RegionEngine, ptr: NonNull<u8>) -> ZfResult<()> {
        match engine.lookup(ptr.as_ptr() as usize) {
            RegionLookup::Owned(_) => {
                engine.release(ptr)?;
                self.stats.record_release();
                Ok(())
            }
            RegionLookup::NotFound if self.fallback.is_configured() => {
                self.fallback.release(ptr)?;
                self.stats.record_fallback_release();
                Ok(())
            }
            RegionLookup::NotFound => Err(ZfError::ForeignPointer),
        }
    }

    fn failed<T>(&self, result: ZfResult<T>) -> ZfResult<T> {
        if result.is_err() {
            self.stats.record_failure();
        }
        result
    }

    // =========================================================================
    // SUPERFÍCIE TIPADA
    // =========================================================================

    #[track_caller]
    pub fn try_allocate(&self, size: usize) -> ZfResult<NonNull<u8>> {
        let mut engine = self.lock("malloc");
        let result = self.allocate_locked(&mut engine, size);
        self.failed(result)
    }

    /// `Ok(())` também para ponteiro nulo (no-op com diagnóstico).
    #[track_caller]
    pub fn try_release(&self, ptr: *mut u8) -> ZfResult<()> {
        let Some(ptr) = NonNull::new(ptr) else {
            crate::zwarn!("(Zerofat) free(NULL) ignorado");
            return Ok(());
        };
        let mut engine = self.lock("free");
        let result = self.release_locked(&mut engine, ptr);
        self.failed(result)
    }

    #[track_caller]
    pub fn try_zeroed_allocate(&self, count: usize, size: usize) -> ZfResult<NonNull<u8>> {
        // Antes do lock: overflow não tem efeito colateral
        let Some(total) = count.checked_mul(size) else {
            self.stats.record_failure();
            return Err(ZfError::Overflow);
        };

        let mut engine = self.lock("calloc");
        let result = match self.fallback.allocate(total) {
            Some(ptr) => {
                self.stats.record_fallback_allocation();
                Ok(ptr)
            }
            None => self.region_allocate(&mut engine, total),
        };
        let ptr = self.failed(result)?;

        // SAFETY: bloco recém entregue com pelo menos `total` bytes
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, total) };
        Ok(ptr)
    }

    /// Aloca, copia `min(classe antiga, new_size)` e libera, tudo sob o
    /// mesmo lock. Em falha o bloco antigo fica intacto.
    #[track_caller]
    pub fn try_reallocate(&self, ptr: *mut u8, new_size: usize) -> ZfResult<NonNull<u8>> {
        let old = match NonNull::new(ptr) {
            Some(old) if new_size != 0 => old,
            _ => return self.try_allocate(new_size),
        };

        let mut engine = self.lock("realloc");
        let result = self.reallocate_locked(&mut engine, old, new_size);
        self.failed(result)
    }

    fn reallocate_locked(
        &self,
        engine: &mut RegionEngine,
        old: NonNull<u8>,
        new_size: usize,
    ) -> ZfResult<NonNull<u8>> {
        let addr = old.as_ptr() as usize;
        if let RegionLookup::NotFound = engine.lookup(addr) {
            if !self.fallback.owns(old) {
                return Err(ZfError::ForeignPointer);
            }
            return self
                .fallback
                .reallocate(old, new_size)
                .ok_or(ZfError::OutOfMemory);
        }

        // Classe do bloco, não o tamanho pedido originalmente
        let old_size = engine.check_live(addr)?;
        let new = self.allocate_locked(engine, new_size)?;
        // SAFETY: blocos distintos, ambos vivos, cada um com o tamanho copiado
        unsafe {
            ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), old_size.min(new_size));
        }
        engine.release(old)?;
        self.stats.record_release();
        Ok(new)
    }

    // =========================================================================
    // SUPERFÍCIE ESTILO C
    // =========================================================================

    /// `malloc`: nulo em falha.
    #[track_caller]
    pub fn allocate(&self, size: usize) -> *mut u8 {
        let ptr = match self.try_allocate(size) {
            Ok(ptr) => ptr.as_ptr(),
            Err(err) => {
                log_rejection(err, size);
                ptr::null_mut()
            }
        };
        trace::report(TraceOp::Malloc, &[size], ptr as usize, Location::caller());
        ptr
    }

    /// `free`: rejeições são logadas, nunca propagadas.
    #[track_caller]
    pub fn release(&self, ptr: *mut u8) {
        if let Err(err) = self.try_release(ptr) {
            log_rejection(err, ptr as usize);
        }
        trace::report(TraceOp::Free, &[ptr as usize], 0, Location::caller());
    }

    /// `calloc`: nulo em overflow ou falta de memória.
    #[track_caller]
    pub fn zeroed_allocate(&self, count: usize, size: usize) -> *mut u8 {
        let ptr = match self.try_zeroed_allocate(count, size) {
            Ok(ptr) => ptr.as_ptr(),
            Err(err) => {
                log_rejection(err, size);
                ptr::null_mut()
            }
        };
        trace::report(TraceOp::Calloc, &[count, size], ptr as usize, Location::caller());
        ptr
    }

    /// `realloc`: nulo em falha, com o bloco antigo ainda válido.
    #[track_caller]
    pub fn reallocate(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        let new = match self.try_reallocate(ptr, new_size) {
            Ok(new) => new.as_ptr(),
            Err(err) => {
                log_rejection(err, ptr as usize);
                ptr::null_mut()
            }
        };
        trace::report(
            TraceOp::Realloc,
            &[ptr as usize, new_size],
            new as usize,
            Location::caller(),
        );
        new
    }
}

fn log_rejection(err: ZfError, value: usize) {
    match err {
        ZfError::OutOfMemory | ZfError::Overflow => {
            crate::zwarn!("(Zerofat) pedido recusado: ", value);
            crate::zwarn!(err.as_str());
        }
        _ => {
            crate::zerror!("(Zerofat) ponteiro rejeitado: ", value);
            crate::zerror!(err.as_str());
        }
    }
}

// =============================================================================
// GLOBAL ALLOCATOR
// =============================================================================

unsafe impl<B, F, P> GlobalAlloc for ZerofatHeap<B, F, P>
where
    B: RangeBinding,
    F: FallbackAllocator,
    P: InterruptProbe,
{
    /// Retorna `null_mut` em OOM ou alinhamento acima de `BLOCK_ALIGN`.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > BLOCK_ALIGN {
            return ptr::null_mut();
        }
        self.allocate(layout.size())
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > BLOCK_ALIGN {
            return ptr::null_mut();
        }
        self.zeroed_allocate(1, layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.release(ptr)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > BLOCK_ALIGN {
            return ptr::null_mut();
        }
        self.reallocate(ptr, new_size)
    }
}
