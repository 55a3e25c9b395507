//! Zerofat: alocador de heap cercado pela MPU.
//!
//! Ponto central de exportação dos módulos do alocador. O heap é dividido
//! em quatro regiões de classe única, cada uma vigiada por um slot da MPU,
//! de modo que um estouro de bloco cruza a fronteira da região e falha no
//! hardware em vez de corromper o vizinho.
//!
//! ```ignore
//! use zerofat::{ArmV8Mpu, LinkedListFallback, ZerofatConfig, ZerofatHeap};
//! use zerofat::sync::CortexMProbe;
//!
//! #[global_allocator]
//! static HEAP: ZerofatHeap<ArmV8Mpu, LinkedListFallback, CortexMProbe> = ZerofatHeap::new(
//!     ZerofatConfig::DEFAULT,
//!     unsafe { ArmV8Mpu::new() },
//!     LinkedListFallback::empty(),
//!     CortexMProbe,
//! );
//! ```

#![cfg_attr(not(test), no_std)]

// --- Infraestrutura ---
pub mod log; // Macros de log e sink de bytes
pub mod sync; // Lock único e sonda de IRQ

// --- Hardware ---
pub mod mpu; // Hardware Range Binding

// --- Alocador ---
pub mod ffi; // Símbolos __wrap_* para o firmware C
pub mod mm; // Regiões, classes, migração, heap

mod tests;

pub use crate::mm::{
    FallbackAllocator, LinkedListFallback, NoFallback, StatsSnapshot, ZerofatConfig, ZerofatHeap,
    ZfError, ZfResult,
};
pub use crate::mpu::{AccessMode, ArmV8Mpu, ExecuteMode, HwRange, RangeBinding, SystemRegion};
