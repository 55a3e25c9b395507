//! # Configuração do Alocador
//!
//! Define constantes, layout padrão do heap e a estrutura `ZerofatConfig`,
//! lida uma única vez na inicialização.
//!
//! O layout padrão reproduz a placa de referência (STM32, SRAM em
//! `0x2000_0000`): `.data/.bss` ocupam os primeiros 8 KiB, o heap vem logo
//! depois e a stack fica no topo da SRAM.

use crate::mm::error::{ZfError, ZfResult};
use crate::mpu::{AccessMode, ExecuteMode, HwRange, SystemRegion};

// =============================================================================
// CONSTANTES
// =============================================================================

/// Número de regiões do heap (fixo: uma por classe de tamanho ativa)
pub const REGION_COUNT: usize = 4;

/// Slots reservados da tabela de classes (requisições grandes)
pub const RESERVED_CLASS_COUNT: usize = 3;

/// Granularidade de endereço da MPU ARMv8-M (RBAR/RLAR bits [31:5])
pub const MPU_GRANULE: usize = 32;

/// Alinhamento de todo bloco entregue pelas regiões
pub const BLOCK_ALIGN: usize = 8;

/// Menor classe possível: o nó intrusivo da freelist ocupa duas palavras
pub const MIN_CLASS_SIZE: usize = 2 * core::mem::size_of::<usize>();

// =============================================================================
// LAYOUT PADRÃO
// =============================================================================

/// Início do heap (logo após `.data/.bss`)
pub const DEFAULT_HEAP_BASE: usize = 0x2000_2000;

/// Tamanho total do heap, dividido igualmente entre as 4 regiões
pub const DEFAULT_HEAP_SIZE: usize = 0x3B600;

/// Quantum de migração de fronteira entre regiões pareadas
pub const DEFAULT_EXPANSION_QUANTUM: usize = 0x400;

/// Classes ativas iniciais, uma por região
pub const DEFAULT_CLASS_SIZES: [usize; REGION_COUNT] = [0x10, 0x100, 0x1000, 0x4000];

/// Degraus usados quando a classe do topo precisa crescer
pub const DEFAULT_RESERVED_CLASSES: [usize; RESERVED_CLASS_COUNT] = [0x6000, 0x8000, 0xE000];

/// Primeiro slot da MPU usado pelas regiões do heap (slots 1..=4)
pub const DEFAULT_MPU_SLOT_BASE: u8 = 1;

/// Regiões fixas do sistema programadas junto com o heap (slots 5..=8)
pub const DEFAULT_SYSTEM_REGIONS: [SystemRegion; 4] = [
    // Flash: código e constantes
    SystemRegion::new(
        5,
        HwRange::new(0x0800_0000, 0x0808_0000),
        AccessMode::ReadOnly,
        ExecuteMode::Execute,
    ),
    // .data / .bss
    SystemRegion::new(
        6,
        HwRange::new(0x2000_0000, 0x2000_2000),
        AccessMode::ReadWrite,
        ExecuteMode::NeverExecute,
    ),
    // Stack principal (topo da SRAM)
    SystemRegion::new(
        7,
        HwRange::new(0x2003_D600, 0x2004_0000),
        AccessMode::ReadWrite,
        ExecuteMode::NeverExecute,
    ),
    // Periféricos
    SystemRegion::new(
        8,
        HwRange::new(0x4000_0000, 0x6000_0000),
        AccessMode::ReadWrite,
        ExecuteMode::NeverExecute,
    ),
];

// =============================================================================
// CONFIGURAÇÃO
// =============================================================================

/// Parâmetros do heap, lidos uma vez na primeira chamada ao alocador.
#[derive(Debug, Clone, Copy)]
pub struct ZerofatConfig {
    pub heap_base: usize,
    pub heap_size: usize,
    pub expansion_quantum: usize,
    pub class_sizes: [usize; REGION_COUNT],
    pub reserved_classes: [usize; RESERVED_CLASS_COUNT],
    pub mpu_slot_base: u8,
    pub system_regions: &'static [SystemRegion],
}

impl ZerofatConfig {
    pub const DEFAULT: Self = Self {
        heap_base: DEFAULT_HEAP_BASE,
        heap_size: DEFAULT_HEAP_SIZE,
        expansion_quantum: DEFAULT_EXPANSION_QUANTUM,
        class_sizes: DEFAULT_CLASS_SIZES,
        reserved_classes: DEFAULT_RESERVED_CLASSES,
        mpu_slot_base: DEFAULT_MPU_SLOT_BASE,
        system_regions: &DEFAULT_SYSTEM_REGIONS,
    };

    /// Configuração com layout explícito e sem regiões de sistema.
    pub const fn new(
        heap_base: usize,
        heap_size: usize,
        expansion_quantum: usize,
        class_sizes: [usize; REGION_COUNT],
        reserved_classes: [usize; RESERVED_CLASS_COUNT],
    ) -> Self {
        Self {
            heap_base,
            heap_size,
            expansion_quantum,
            class_sizes,
            reserved_classes,
            mpu_slot_base: DEFAULT_MPU_SLOT_BASE,
            system_regions: &[],
        }
    }

    pub const fn with_system_regions(mut self, regions: &'static [SystemRegion]) -> Self {
        self.system_regions = regions;
        self
    }

    pub const fn with_mpu_slot_base(mut self, slot: u8) -> Self {
        self.mpu_slot_base = slot;
        self
    }

    /// Tamanho inicial de cada região
    #[inline]
    pub const fn region_size(&self) -> usize {
        self.heap_size / REGION_COUNT
    }

    /// Fim (exclusivo) do heap
    #[inline]
    pub const fn heap_end(&self) -> usize {
        self.heap_base + self.heap_size
    }

    /// Slot da MPU da região `index`
    #[inline]
    pub const fn mpu_slot(&self, index: usize) -> u8 {
        self.mpu_slot_base + index as u8
    }

    /// Verifica todas as restrições de layout.
    ///
    /// Uma configuração inválida na inicialização é fatal: o alocador não
    /// tem como programar a MPU de forma coerente.
    pub fn validate(&self) -> ZfResult<()> {
        if self.heap_size == 0 || self.heap_size % (REGION_COUNT * MPU_GRANULE) != 0 {
            return Err(ZfError::InvalidConfig);
        }
        if self.heap_base == 0 || !is_aligned(self.heap_base, MPU_GRANULE) {
            return Err(ZfError::InvalidConfig);
        }
        if self.heap_base.checked_add(self.heap_size).is_none() {
            return Err(ZfError::InvalidConfig);
        }
        if self.expansion_quantum == 0 || !is_aligned(self.expansion_quantum, MPU_GRANULE) {
            return Err(ZfError::InvalidConfig);
        }

        let region_size = self.region_size();
        if self.class_sizes[0] < MIN_CLASS_SIZE {
            return Err(ZfError::InvalidConfig);
        }
        let mut prev = 0;
        for &class in self.class_sizes.iter() {
            if class <= prev || !is_aligned(class, BLOCK_ALIGN) || class > region_size {
                return Err(ZfError::InvalidConfig);
            }
            prev = class;
        }
        for &class in self.reserved_classes.iter() {
            if class <= prev || !is_aligned(class, BLOCK_ALIGN) {
                return Err(ZfError::InvalidConfig);
            }
            prev = class;
        }

        let first = self.mpu_slot_base as usize;
        let last = first + REGION_COUNT;
        if last > u8::MAX as usize {
            return Err(ZfError::InvalidConfig);
        }
        for system in self.system_regions.iter() {
            let slot = system.slot as usize;
            if slot >= first && slot < last {
                return Err(ZfError::InvalidConfig);
            }
        }

        Ok(())
    }
}

impl Default for ZerofatConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// FUNÇÕES UTILITÁRIAS
// =============================================================================

/// Alinha valor para cima ao múltiplo de align. `None` em overflow.
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> Option<usize> {
    match val.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Verifica se valor está alinhado
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}
