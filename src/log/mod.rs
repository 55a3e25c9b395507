// =============================================================================
// ZEROFAT LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do alocador com custo ZERO em release.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt - o log roda dentro da seção crítica do malloc
// - SEM alocação - Apenas strings literais + valores hex
// - Escreve no `LogSink` instalado pela aplicação (ver `sink`)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Erros fatais ou críticos (double free, config inválida)
// - WARN:  Situações suspeitas mas recuperáveis (OOM, ponteiro estrangeiro)
// - INFO:  Fluxo normal (inicialização das regiões)
// - DEBUG: Migrações de fronteira, reatribuição de classes
// - TRACE: Cada alocação/liberação
//
// COMO USAR:
//   zinfo!("(Zerofat) Inicializando...");      // Apenas string
//   zinfo!("(Zerofat) Base=", 0x2000_2000);    // String + hex
//   zlog!("Start=", start, " End=", end);      // Múltiplos valores
//
// =============================================================================

pub mod sink;

pub use sink::{has_sink, set_sink, LogSink};

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";

/// Implementação comum: prefixo + mensagem (+ hex) + newline.
#[doc(hidden)]
#[macro_export]
macro_rules! __zf_emit {
    ($prefix:expr, $msg:expr) => {{
        $crate::log::sink::emit_str($prefix);
        $crate::log::sink::emit_str($msg);
        $crate::log::sink::emit_nl();
    }};
    ($prefix:expr, $msg:expr, $val:expr) => {{
        $crate::log::sink::emit_str($prefix);
        $crate::log::sink::emit_str($msg);
        $crate::log::sink::emit_hex($val as u64);
        $crate::log::sink::emit_nl();
    }};
}

// =============================================================================
// ERROR / WARN - ativos exceto com no_logs
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! zerror {
    ($($t:tt)*) => {
        $crate::__zf_emit!($crate::log::P_ERROR, $($t)*)
    };
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! zerror {
    ($($t:tt)*) => {{}};
}

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! zwarn {
    ($($t:tt)*) => {
        $crate::__zf_emit!($crate::log::P_WARN, $($t)*)
    };
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! zwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// INFO - ativo com log_info, log_debug ou log_trace
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! zinfo {
    ($($t:tt)*) => {
        $crate::__zf_emit!($crate::log::P_INFO, $($t)*)
    };
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! zinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// DEBUG - ativo com log_debug ou log_trace
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! zdebug {
    ($($t:tt)*) => {
        $crate::__zf_emit!($crate::log::P_DEBUG, $($t)*)
    };
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! zdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// TRACE - ativo apenas com log_trace
// =============================================================================

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ztrace {
    ($($t:tt)*) => {
        $crate::__zf_emit!($crate::log::P_TRACE, $($t)*)
    };
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ztrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS AUXILIARES
// =============================================================================

/// zlog! - Log genérico sem prefixo de nível nem newline.
///
/// ```ignore
/// zlog!("Addr=", addr);                    // String + hex
/// zlog!("Start=", start, " End=", end);    // Múltiplos
/// ```
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! zlog {
    ($msg:expr) => {{
        $crate::log::sink::emit_str($msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::log::sink::emit_str($msg);
        $crate::log::sink::emit_hex($val as u64);
    }};
    ($msg1:expr, $val:expr, $msg2:expr) => {{
        $crate::log::sink::emit_str($msg1);
        $crate::log::sink::emit_hex($val as u64);
        $crate::log::sink::emit_str($msg2);
    }};
    ($msg1:expr, $val1:expr, $msg2:expr, $val2:expr) => {{
        $crate::log::sink::emit_str($msg1);
        $crate::log::sink::emit_hex($val1 as u64);
        $crate::log::sink::emit_str($msg2);
        $crate::log::sink::emit_hex($val2 as u64);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! zlog {
    ($($t:tt)*) => {{}};
}

/// zok! - Log de sucesso (prefixo verde [OK]).
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! zok {
    ($msg:expr) => {{
        $crate::log::sink::emit_str("\x1b[32m[OK]\x1b[0m ");
        $crate::log::sink::emit_str($msg);
        $crate::log::sink::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! zok {
    ($($t:tt)*) => {{}};
}

/// zfail! - Log de falha (prefixo vermelho [FAIL]).
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! zfail {
    ($msg:expr) => {{
        $crate::log::sink::emit_str("\x1b[1;31m[FAIL]\x1b[0m ");
        $crate::log::sink::emit_str($msg);
        $crate::log::sink::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! zfail {
    ($($t:tt)*) => {{}};
}
