//! Testes de cenário do alocador
//!
//! Cada teste monta um `ZerofatHeap` sobre uma arena do host e uma MPU
//! gravadora (`RecordingBinding`), sem hardware.
//!
//! # Como Executar os Testes
//!
//! ```bash
//! # Todos os cenários
//! cargo test --lib tests
//!
//! # Com trace de cada chamada
//! cargo test --lib tests --features malloc_tracing,log_trace
//! ```
//!
//! # Estrutura dos Testes
//!
//! - `support.rs` - Arena, MPU gravadora e sonda de IRQ controlável
//! - `scenarios.rs` - Fluxos completos (reuso, reatribuição, migração)
//! - `fallback.rs` - Delegação ao alocador real
//! - `concurrency.rs` - Várias threads no mesmo heap
//! - `ffi.rs` - Símbolos `__wrap_*`

#![cfg(test)]

pub mod support;
