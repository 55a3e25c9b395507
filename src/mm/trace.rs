//! # Tracing de Chamadas
//!
//! Com a feature `malloc_tracing`, cada ponto de entrada estilo C relata
//! local de chamada, argumentos e resultado pelo sink de log:
//!
//! ```text
//! [ZF] malloc(0x12c) @ src/app.rs:42 -> 0x20039e00
//! ```
//!
//! Sem a feature, `report` é vazio e some na compilação. O canal não altera
//! a semântica do alocador.

use core::panic::Location;
#[cfg(feature = "malloc_tracing")]
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    Malloc,
    Free,
    Calloc,
    Realloc,
}

impl TraceOp {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Malloc => "malloc",
            Self::Free => "free",
            Self::Calloc => "calloc",
            Self::Realloc => "realloc",
        }
    }
}

#[cfg(feature = "malloc_tracing")]
static TRACING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Liga/desliga o relato em tempo de execução (só com `malloc_tracing`).
pub fn set_enabled(_enabled: bool) {
    #[cfg(feature = "malloc_tracing")]
    TRACING_ENABLED.store(_enabled, Ordering::Release);
}

pub fn is_enabled() -> bool {
    #[cfg(feature = "malloc_tracing")]
    {
        TRACING_ENABLED.load(Ordering::Acquire)
    }
    #[cfg(not(feature = "malloc_tracing"))]
    {
        false
    }
}

#[cfg(feature = "malloc_tracing")]
pub fn report(op: TraceOp, args: &[usize], result: usize, location: &Location<'_>) {
    use crate::log::sink::{emit_dec, emit_hex, emit_nl, emit_str};

    if !is_enabled() {
        return;
    }
    emit_str("[ZF] ");
    emit_str(op.name());
    emit_str("(");
    for (i, &arg) in args.iter().enumerate() {
        if i > 0 {
            emit_str(", ");
        }
        emit_hex(arg as u64);
    }
    emit_str(") @ ");
    emit_str(location.file());
    emit_str(":");
    emit_dec(location.line() as usize);
    if op != TraceOp::Free {
        emit_str(" -> ");
        emit_hex(result as u64);
    }
    emit_nl();
}

#[cfg(not(feature = "malloc_tracing"))]
#[inline(always)]
pub fn report(_op: TraceOp, _args: &[usize], _result: usize, _location: &Location<'_>) {}
