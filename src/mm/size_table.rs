//! Tabela de classes de tamanho.
//!
//! Quatro classes ativas (uma por região, em ordem crescente) mais três
//! degraus reservados, consultados quando um pedido excede a maior classe
//! ativa e a região do topo precisa ser reatribuída.

use crate::mm::config::{align_up, ZerofatConfig, BLOCK_ALIGN, REGION_COUNT, RESERVED_CLASS_COUNT};
use crate::mm::error::{ZfError, ZfResult};
use crate::mm::region::RegionIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeTable {
    active: [usize; REGION_COUNT],
    reserved: [usize; RESERVED_CLASS_COUNT],
}

impl SizeTable {
    pub fn new(config: &ZerofatConfig) -> Self {
        Self {
            active: config.class_sizes,
            reserved: config.reserved_classes,
        }
    }

    #[inline]
    pub fn class(&self, index: RegionIndex) -> usize {
        self.active[index.get()]
    }

    #[inline]
    pub fn active(&self) -> &[usize; REGION_COUNT] {
        &self.active
    }

    #[inline]
    pub fn reserved(&self) -> &[usize; RESERVED_CLASS_COUNT] {
        &self.reserved
    }

    /// Menor classe ativa que comporta `size`. Tamanho zero cai na classe 0.
    pub fn class_for(&self, size: usize) -> Option<RegionIndex> {
        self.active
            .iter()
            .position(|&class| size <= class)
            .and_then(RegionIndex::new)
    }

    /// Nova classe do topo para um pedido maior que todas as ativas.
    ///
    /// Primeiro degrau reservado que comporta `size` e cabe em `capacity`;
    /// sem degrau, o próprio `size` alinhado. A classe só cresce.
    pub fn growth_target(&self, size: usize, capacity: usize) -> Option<usize> {
        let top = self.active[REGION_COUNT - 1];
        if size <= top {
            return None;
        }
        let stepped = self
            .reserved
            .iter()
            .copied()
            .find(|&class| class >= size && class <= capacity);
        let target = match stepped {
            Some(class) => class,
            None => align_up(size, BLOCK_ALIGN)?,
        };
        (target <= capacity).then_some(target)
    }

    /// Troca a classe de uma região mantendo a tabela crescente.
    pub fn set_class(&mut self, index: RegionIndex, size: usize) -> ZfResult<()> {
        let i = index.get();
        if size == 0 || size % BLOCK_ALIGN != 0 {
            return Err(ZfError::InvalidConfig);
        }
        if i > 0 && self.active[i - 1] >= size {
            return Err(ZfError::InvalidConfig);
        }
        if i + 1 < REGION_COUNT && self.active[i + 1] <= size {
            return Err(ZfError::InvalidConfig);
        }
        self.active[i] = size;
        Ok(())
    }
}
