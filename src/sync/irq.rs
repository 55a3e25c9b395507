//! Detecção de contexto de interrupção.
//!
//! malloc/free só podem rodar em contexto de thread. A violação é um erro
//! de programação: abortamos em vez de arriscar deadlock no lock do
//! alocador ou corromper um estado que outra thread está mutando.

use crate::mm::error::{ZfError, ZfResult};

/// Consulta se o core está executando um handler de exceção/IRQ.
pub trait InterruptProbe {
    fn in_interrupt(&self) -> bool;
}

impl<T: InterruptProbe + ?Sized> InterruptProbe for &T {
    fn in_interrupt(&self) -> bool {
        (**self).in_interrupt()
    }
}

/// Probe para ambientes sem interrupções (host, testes, firmware bare
/// single-thread).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadOnly;

impl InterruptProbe for ThreadOnly {
    fn in_interrupt(&self) -> bool {
        false
    }
}

/// Probe Cortex-M: IPSR != 0 dentro de qualquer handler.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexMProbe;

#[cfg(all(target_arch = "arm", target_os = "none"))]
impl InterruptProbe for CortexMProbe {
    fn in_interrupt(&self) -> bool {
        let ipsr: u32;
        unsafe {
            core::arch::asm!("mrs {}, IPSR", out(reg) ipsr, options(nomem, nostack, preserves_flags));
        }
        ipsr & 0x1FF != 0
    }
}

/// `Err(InvalidContext)` se a sonda indicar um handler ativo.
#[inline]
pub fn check_thread_context<P: InterruptProbe>(probe: &P) -> ZfResult<()> {
    if probe.in_interrupt() {
        Err(ZfError::InvalidContext)
    } else {
        Ok(())
    }
}

/// Aborta se chamado em contexto de interrupção.
///
/// Deve ser chamado ANTES de adquirir o lock do alocador.
#[inline]
#[track_caller]
pub fn assert_thread_context<P: InterruptProbe>(probe: &P, op: &'static str) {
    if let Err(err) = check_thread_context(probe) {
        crate::zerror!("(Zerofat) CRITICAL: chamada em IRQ: ");
        crate::zerror!(op);
        crate::zerror!(err.as_str());
        panic!("zerofat: allocator entry point called from interrupt context");
    }
}
