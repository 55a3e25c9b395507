//! # Hardware Range Binding (MPU)
//!
//! Ponte estreita entre a contabilidade das regiões e a MPU. O alocador só
//! conhece `RangeBinding::commit_range`: cada vez que os limites de uma
//! região mudam, o novo intervalo é reprogramado ANTES de qualquer ponteiro
//! governado por ele ser devolvido.
//!
//! | Slot | Uso                          |
//! |------|------------------------------|
//! | 1-4  | Regiões do heap (classes)    |
//! | 5-8  | Flash, `.data`, stack, MMIO  |
//!
//! Falhas de programação da MPU não são modeladas: uma MPU que rejeita um
//! intervalo é erro de configuração da placa.

pub mod armv8m;

pub use armv8m::ArmV8Mpu;

/// Intervalo físico `[start, limit)` em ordem crescente.
///
/// Regiões que crescem para baixo guardam `base` acima de `end`; o
/// intervalo enviado ao hardware é sempre normalizado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwRange {
    pub start: usize,
    pub limit: usize,
}

impl HwRange {
    pub const fn new(start: usize, limit: usize) -> Self {
        Self { start, limit }
    }

    /// Constrói o intervalo a partir de duas bordas em qualquer ordem.
    pub const fn from_edges(a: usize, b: usize) -> Self {
        if a <= b {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.limit - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.limit <= self.start
    }

    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.limit
    }
}

/// Permissão de acesso de dados (AP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

/// Permissão de execução (XN)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteMode {
    Execute,
    NeverExecute,
}

/// Região fixa (não-heap) programada uma vez na inicialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemRegion {
    pub slot: u8,
    pub range: HwRange,
    pub access: AccessMode,
    pub execute: ExecuteMode,
}

impl SystemRegion {
    pub const fn new(slot: u8, range: HwRange, access: AccessMode, execute: ExecuteMode) -> Self {
        Self {
            slot,
            range,
            access,
            execute,
        }
    }
}

/// Destino dos limites de região.
///
/// `commit_range` é chamado com o lock do alocador adquirido e deve ter
/// efeito antes de retornar.
pub trait RangeBinding {
    fn commit_range(&self, slot: u8, range: HwRange, access: AccessMode, execute: ExecuteMode);

    /// Chamado uma vez, depois de todos os commits iniciais.
    fn enable(&self) {}
}

impl<T: RangeBinding + ?Sized> RangeBinding for &T {
    fn commit_range(&self, slot: u8, range: HwRange, access: AccessMode, execute: ExecuteMode) {
        (**self).commit_range(slot, range, access, execute)
    }

    fn enable(&self) {
        (**self).enable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_edges() {
        let up = HwRange::from_edges(0x1000, 0x1400);
        let down = HwRange::from_edges(0x1800, 0x1400);

        assert_eq!(up, HwRange::new(0x1000, 0x1400));
        assert_eq!(down, HwRange::new(0x1400, 0x1800));
        assert_eq!(down.len(), 0x400);
        assert!(down.contains(0x1400));
        assert!(!down.contains(0x1800));
    }
}
