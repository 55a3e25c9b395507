//! # Synchronization
//!
//! O alocador usa um único lock para todo o estado (regiões, freelists,
//! bump pointers, tabela de classes). Não há locks por região: com apenas
//! quatro regiões a contenção é aceitável.
//!
//! ## Regras
//!
//! - **Mutex (`spin`)**: protege o estado do alocador. Nunca é adquirido em
//!   contexto de interrupção: um handler que tentasse pegar o lock de uma
//!   thread preemptada giraria para sempre.
//! - **Once (`spin`)**: inicialização preguiçosa, exatamente uma vez.
//! - **Ordem de Lock**: estado do heap -> fallback. O fallback nunca chama
//!   de volta o heap.

pub mod irq;

pub use irq::{assert_thread_context, check_thread_context, InterruptProbe, ThreadOnly};

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use irq::CortexMProbe;

pub use spin::{Mutex, MutexGuard, Once};
