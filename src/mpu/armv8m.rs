//! MPU ARMv8-M (Cortex-M23/M33/M55).
//!
//! Programação por RNR/RBAR/RLAR: seleciona o slot em RNR, escreve base +
//! atributos em RBAR e limite (inclusivo) + enable em RLAR. Endereços têm
//! granularidade de 32 bytes.
//!
//! ```text
//! RBAR: [31:5] BASE | [4:3] SH | [2:1] AP | [0] XN
//! RLAR: [31:5] LIMIT | [3:1] AttrIndx | [0] EN
//! ```

use core::ptr::{addr_of, addr_of_mut, NonNull};

use bitflags::bitflags;
use volatile::VolatilePtr;

use super::{AccessMode, ExecuteMode, HwRange, RangeBinding};

/// Endereço do bloco MPU no System Control Space
pub const MPU_BASE: usize = 0xE000_ED90;

/// Bits de endereço válidos em RBAR/RLAR
const ADDR_MASK: u32 = !0x1F;

/// MAIR0.Attr0: memória normal, write-back, read/write allocate
const MAIR_NORMAL_WB: u32 = 0xFF;

bitflags! {
    /// Atributos de RBAR
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RbarFlags: u32 {
        /// Execute Never
        const XN = 1 << 0;
        /// AP[1]: acesso também em modo não-privilegiado
        const AP_UNPRIV = 1 << 1;
        /// AP[2]: somente leitura
        const AP_RO = 1 << 2;
        /// SH = Inner Shareable
        const SH_INNER = 0b11 << 3;
    }
}

bitflags! {
    /// Atributos de RLAR
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RlarFlags: u32 {
        /// Região habilitada
        const EN = 1 << 0;
    }
}

bitflags! {
    /// MPU_CTRL
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlFlags: u32 {
        const ENABLE = 1 << 0;
        const HFNMIENA = 1 << 1;
        /// Mapa padrão para acessos privilegiados fora das regiões
        const PRIVDEFENA = 1 << 2;
    }
}

/// Layout do bloco de registradores a partir de `MPU_BASE`.
#[repr(C)]
pub struct MpuRegisters {
    pub typ: u32,
    pub ctrl: u32,
    pub rnr: u32,
    pub rbar: u32,
    pub rlar: u32,
    /// RBAR_A1..A3 / RLAR_A1..A3
    pub alias: [u32; 6],
    _reserved: u32,
    pub mair0: u32,
    pub mair1: u32,
}

impl MpuRegisters {
    pub const fn zeroed() -> Self {
        Self {
            typ: 0,
            ctrl: 0,
            rnr: 0,
            rbar: 0,
            rlar: 0,
            alias: [0; 6],
            _reserved: 0,
            mair0: 0,
            mair1: 0,
        }
    }
}

/// Codifica um intervalo nos pares (RBAR, RLAR).
///
/// Um intervalo vazio desabilita o slot (RLAR sem EN).
pub fn encode(range: HwRange, access: AccessMode, execute: ExecuteMode) -> (u32, u32) {
    let mut flags = RbarFlags::AP_UNPRIV;
    if access == AccessMode::ReadOnly {
        flags |= RbarFlags::AP_RO;
    }
    if execute == ExecuteMode::NeverExecute {
        flags |= RbarFlags::XN;
    }

    let rbar = (range.start as u32 & ADDR_MASK) | flags.bits();
    if range.is_empty() {
        return (rbar, 0);
    }

    let rlar = ((range.limit - 1) as u32 & ADDR_MASK) | RlarFlags::EN.bits();
    (rbar, rlar)
}

/// Binding real da MPU via MMIO volátil.
pub struct ArmV8Mpu {
    regs: NonNull<MpuRegisters>,
}

// Acesso serializado pelo lock do alocador
unsafe impl Send for ArmV8Mpu {}
unsafe impl Sync for ArmV8Mpu {}

impl ArmV8Mpu {
    /// MPU do próprio core.
    ///
    /// # Safety
    /// Só é válido em um Cortex-M com MPU ARMv8-M; em qualquer outro alvo o
    /// primeiro commit escreve em memória arbitrária.
    pub const unsafe fn new() -> Self {
        unsafe { Self::at(MPU_BASE) }
    }

    /// Bloco de registradores em `base` (útil para MPU não-secure ou testes).
    ///
    /// # Safety
    /// `base` deve apontar para um `MpuRegisters` válido durante toda a vida
    /// do binding.
    pub const unsafe fn at(base: usize) -> Self {
        Self {
            regs: unsafe { NonNull::new_unchecked(base as *mut MpuRegisters) },
        }
    }

    /// Número de slots implementados (TYPE.DREGION)
    pub fn region_count(&self) -> u8 {
        let typ = self.read(unsafe { addr_of!((*self.regs.as_ptr()).typ) as *mut u32 });
        ((typ >> 8) & 0xFF) as u8
    }

    #[inline]
    fn write(&self, reg: *mut u32, value: u32) {
        // SAFETY: `reg` é um campo do bloco apontado por `regs`
        unsafe { VolatilePtr::new(NonNull::new_unchecked(reg)).write(value) }
    }

    #[inline]
    fn read(&self, reg: *mut u32) -> u32 {
        // SAFETY: idem `write`
        unsafe { VolatilePtr::new(NonNull::new_unchecked(reg)).read() }
    }
}

impl RangeBinding for ArmV8Mpu {
    fn commit_range(&self, slot: u8, range: HwRange, access: AccessMode, execute: ExecuteMode) {
        let implemented = self.region_count();
        if implemented != 0 && slot >= implemented {
            crate::zerror!("(MPU) slot não implementado=", slot);
            return;
        }

        let (rbar, rlar) = encode(range, access, execute);
        let regs = self.regs.as_ptr();

        // SAFETY: campos do mesmo bloco de registradores
        unsafe {
            self.write(addr_of_mut!((*regs).rnr), slot as u32);
            // Desabilita antes de mover a base para não expor um intervalo misto
            self.write(addr_of_mut!((*regs).rlar), 0);
            self.write(addr_of_mut!((*regs).rbar), rbar);
            self.write(addr_of_mut!((*regs).rlar), rlar);
        }
        barrier();

        crate::ztrace!("(MPU) commit slot=", slot);
    }

    fn enable(&self) {
        let regs = self.regs.as_ptr();
        unsafe {
            self.write(addr_of_mut!((*regs).mair0), MAIR_NORMAL_WB);
            self.write(
                addr_of_mut!((*regs).ctrl),
                (CtrlFlags::ENABLE | CtrlFlags::PRIVDEFENA).bits(),
            );
        }
        barrier();
        crate::zinfo!("(MPU) habilitada");
    }
}

/// DSB + ISB: o novo mapa vale para a próxima instrução.
#[inline(always)]
fn barrier() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        core::arch::asm!("dsb", "isb", options(nostack, preserves_flags));
    }

    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}
