//! # Motor de Regiões
//!
//! Contabilidade completa do heap, sem lock e sem hardware: escolhe a
//! classe, serve pela freelist ou pelo bump, migra fronteiras e reatribui a
//! classe do topo. Quem chama (o `ZerofatHeap`) segura o lock e reprograma a
//! MPU das regiões que `Allocation::dirty` indicar antes de soltar o
//! ponteiro.
//!
//! ## Ordem de tentativa
//!
//! 1. freelist da região (sem checagem de limites)
//! 2. bump até a borda móvel
//! 3. migração de `k * quantum` bytes da vizinha de par
//! 4. `OutOfMemory` (o heap tenta o fallback)

use core::ptr::NonNull;

use crate::mm::config::ZerofatConfig;
use crate::mm::error::{ZfError, ZfResult};
use crate::mm::migration::{self, MigrationPlan};
use crate::mm::region::{RegionIndex, RegionLookup, RegionTable};
use crate::mm::size_table::SizeTable;
use crate::mpu::HwRange;

/// Como o bloco foi obtido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocPath {
    Freelist,
    Bump,
    Migrated(MigrationPlan),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub ptr: NonNull<u8>,
    pub region: RegionIndex,
    pub class_size: usize,
    pub path: AllocPath,
    /// A classe do topo foi trocada para atender este pedido
    pub reassigned: bool,
}

impl Allocation {
    /// Regiões cujos limites mudaram e precisam ir para a MPU
    pub fn dirty(&self) -> impl Iterator<Item = RegionIndex> {
        let pair = match self.path {
            AllocPath::Migrated(plan) => [Some(plan.recipient), Some(plan.donor)],
            _ => [None, None],
        };
        pair.into_iter().flatten()
    }
}

pub struct RegionEngine {
    table: RegionTable,
    classes: SizeTable,
    quantum: usize,
    heap: HwRange,
}

impl RegionEngine {
    pub fn new(config: &ZerofatConfig) -> ZfResult<Self> {
        config.validate()?;
        Ok(Self {
            table: RegionTable::new(config),
            classes: SizeTable::new(config),
            quantum: config.expansion_quantum,
            heap: HwRange::new(config.heap_base, config.heap_end()),
        })
    }

    #[inline]
    pub fn table(&self) -> &RegionTable {
        &self.table
    }

    #[inline]
    pub fn classes(&self) -> &SizeTable {
        &self.classes
    }

    #[inline]
    pub fn heap(&self) -> HwRange {
        self.heap
    }

    #[inline]
    pub fn lookup(&self, addr: usize) -> RegionLookup {
        self.table.lookup(addr)
    }

    // -------------------------------------------------------------------------
    // Alocação
    // -------------------------------------------------------------------------

    pub fn allocate(&mut self, size: usize) -> ZfResult<Allocation> {
        let (index, reassigned) = match self.classes.class_for(size) {
            Some(index) => (index, false),
            None => (self.grow_top(size)?, true),
        };

        let region = self.table.get_mut(index);
        let class_size = region.class_size();
        let done = |ptr, path| Allocation {
            ptr,
            region: index,
            class_size,
            path,
            reassigned,
        };

        if let Some(ptr) = region.take_free() {
            crate::ztrace!("alloc: freelist ", ptr.as_ptr() as usize);
            return Ok(done(ptr, AllocPath::Freelist));
        }
        if let Some(ptr) = region.carve() {
            crate::ztrace!("alloc: bump ", ptr.as_ptr() as usize);
            return Ok(done(ptr, AllocPath::Bump));
        }

        let partner = index.partner();
        let plan = migration::plan(self.table.get(index), self.table.get(partner), self.quantum)?;
        let (recipient, donor) = self.table.pair_mut(index, partner);
        migration::apply(&plan, recipient, donor);
        crate::zdebug!("migração: nova fronteira em ", plan.new_split);

        let ptr = recipient.carve().ok_or(ZfError::Corruption)?;
        Ok(done(ptr, AllocPath::Migrated(plan)))
    }

    /// Cabe mais um bloco de `class_size` na região, com ou sem migração
    fn can_fit(&self, index: RegionIndex, class_size: usize) -> bool {
        let region = self.table.get(index);
        let headroom = region.headroom();
        if class_size <= headroom {
            return true;
        }
        let needed = class_size - headroom;
        match needed.div_ceil(self.quantum).checked_mul(self.quantum) {
            Some(shift) => shift <= self.table.get(index.partner()).headroom(),
            None => false,
        }
    }

    /// Reatribui a classe do topo para um pedido acima da maior classe.
    ///
    /// Nada muda se o bloco não couber depois da troca.
    fn grow_top(&mut self, size: usize) -> ZfResult<RegionIndex> {
        let top = RegionIndex::TOP;
        let capacity = self.table.get(top).headroom() + self.table.get(top.partner()).headroom();
        let target = self
            .classes
            .growth_target(size, capacity)
            .ok_or(ZfError::OutOfMemory)?;

        if !self.table.get(top).can_reassign() || !self.can_fit(top, target) {
            return Err(ZfError::OutOfMemory);
        }

        self.table.get_mut(top).reassign_class(target)?;
        self.classes.set_class(top, target)?;
        crate::zdebug!("classe do topo reatribuída para ", target);
        Ok(top)
    }

    /// Troca a classe de uma região ainda intocada.
    pub fn set_class(&mut self, index: RegionIndex, size: usize) -> ZfResult<()> {
        if !self.table.get(index).is_pristine() {
            return Err(ZfError::InvalidConfig);
        }
        self.classes.set_class(index, size)?;
        self.table.get_mut(index).reassign_class(size)
    }

    // -------------------------------------------------------------------------
    // Liberação
    // -------------------------------------------------------------------------

    pub fn release(&mut self, ptr: NonNull<u8>) -> ZfResult<RegionIndex> {
        let addr = ptr.as_ptr() as usize;
        match self.lookup(addr) {
            RegionLookup::Owned(index) => {
                self.table.get_mut(index).release(addr)?;
                crate::ztrace!("free: ", addr);
                Ok(index)
            }
            RegionLookup::NotFound => Err(ZfError::ForeignPointer),
        }
    }

    /// Tamanho de um bloco vivo; erro se já foi liberado ou não é bloco.
    pub fn check_live(&self, addr: usize) -> ZfResult<usize> {
        match self.lookup(addr) {
            RegionLookup::Owned(index) => self.table.get(index).check_live(addr),
            RegionLookup::NotFound => Err(ZfError::ForeignPointer),
        }
    }

    pub fn block_size(&self, addr: usize) -> ZfResult<usize> {
        match self.lookup(addr) {
            RegionLookup::Owned(index) => self.table.get(index).block_size(addr),
            RegionLookup::NotFound => Err(ZfError::ForeignPointer),
        }
    }

    /// Invariantes globais: partição exata do heap, pares com a mesma borda
    /// e classes da tabela iguais às das regiões.
    pub fn is_consistent(&self) -> bool {
        if !self.table.is_partition_of(self.heap) {
            return false;
        }
        RegionIndex::all().all(|index| {
            let region = self.table.get(index);
            region.end() == self.table.get(index.partner()).end()
                && region.class_size() == self.classes.class(index)
        })
    }
}
