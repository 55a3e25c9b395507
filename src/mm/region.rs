//! # Tabela de Regiões
//!
//! Quatro regiões contíguas, agrupadas em pares (0,1) e (2,3). Dentro de um
//! par as regiões crescem uma em direção à outra e compartilham a borda
//! móvel (`end`):
//!
//! ```text
//!  base0          end0=end1          base1 base2          end2=end3          base3
//!   |  R0 bump ->   |   <- bump R1     |     |  R2 bump ->   |   <- bump R3     |
//! ```
//!
//! Regiões pares têm `base` na borda baixa e cortam blocos para cima; as
//! ímpares têm `base` na borda alta e cortam para baixo. A migração de
//! fronteira só mexe em `end`; `base` nunca muda.

use core::ptr::NonNull;

use crate::mm::config::{ZerofatConfig, REGION_COUNT};
use crate::mm::error::{ZfError, ZfResult};
use crate::mm::freelist::FreeList;
use crate::mpu::HwRange;

// =============================================================================
// ÍNDICE E DIREÇÃO
// =============================================================================

/// Índice válido (0..4) de uma região.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegionIndex(u8);

impl RegionIndex {
    pub const TOP: Self = Self(REGION_COUNT as u8 - 1);

    pub const fn new(index: usize) -> Option<Self> {
        if index < REGION_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Vizinha de par: a única doadora possível.
    #[inline]
    pub const fn partner(self) -> Self {
        Self(self.0 ^ 1)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..REGION_COUNT as u8).map(Self)
    }
}

/// Sentido em que uma região corta blocos novos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    Up,
    Down,
}

impl Growth {
    pub const fn for_index(index: RegionIndex) -> Self {
        if index.get() % 2 == 0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Resultado da busca de dono de um endereço.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLookup {
    Owned(RegionIndex),
    NotFound,
}

// =============================================================================
// REGIÃO
// =============================================================================

/// Trecho já cortado com uma classe antiga, antes de uma reatribuição.
///
/// Os blocos do trecho nunca voltam a ser entregues. Os que já estavam
/// livres na troca, e os liberados depois dela, ficam em `dead`: a marca de
/// freelist continua valendo para detectar double free.
pub struct RetiredSpan {
    pub range: HwRange,
    pub class_size: usize,
    pub live: usize,
    growth: Growth,
    origin: usize,
    dead: FreeList,
}

impl RetiredSpan {
    /// Blocos do trecho já devolvidos
    #[inline]
    pub fn dead_blocks(&self) -> usize {
        self.dead.len()
    }

    fn is_block_start(&self, addr: usize) -> bool {
        self.range.contains(addr)
            && block_offset(self.growth, self.origin, addr) % self.class_size == 0
    }
}

/// Distância de `addr` até a borda onde o corte começou.
#[inline]
fn block_offset(growth: Growth, origin: usize, addr: usize) -> usize {
    match growth {
        Growth::Up => addr - origin,
        Growth::Down => origin - addr,
    }
}

pub struct Region {
    index: RegionIndex,
    growth: Growth,
    /// Borda fixa
    base: usize,
    /// Borda móvel, compartilhada com o par
    end: usize,
    /// Próximo corte (Up: primeiro byte livre; Down: início do último bloco)
    bump: usize,
    /// Onde a classe atual começou a ser cortada
    origin: usize,
    class_size: usize,
    freelist: FreeList,
    live: usize,
    retired: Option<RetiredSpan>,
}

impl Region {
    pub fn new(index: RegionIndex, start: usize, limit: usize, class_size: usize) -> Self {
        let growth = Growth::for_index(index);
        let (base, end) = match growth {
            Growth::Up => (start, limit),
            Growth::Down => (limit, start),
        };
        Self {
            index,
            growth,
            base,
            end,
            bump: base,
            origin: base,
            class_size,
            freelist: FreeList::new(),
            live: 0,
            retired: None,
        }
    }

    #[inline]
    pub fn index(&self) -> RegionIndex {
        self.index
    }

    #[inline]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn bump(&self) -> usize {
        self.bump
    }

    #[inline]
    pub fn class_size(&self) -> usize {
        self.class_size
    }

    /// Blocos entregues e ainda não liberados (classe atual)
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.freelist.len()
    }

    #[inline]
    pub fn retired(&self) -> Option<&RetiredSpan> {
        self.retired.as_ref()
    }

    /// Intervalo governado pela região (o que vai para a MPU)
    #[inline]
    pub fn span(&self) -> HwRange {
        HwRange::from_edges(self.base, self.end)
    }

    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        self.span().contains(addr)
    }

    /// Trecho cortado com a classe atual
    #[inline]
    pub fn carved(&self) -> HwRange {
        HwRange::from_edges(self.origin, self.bump)
    }

    /// Espaço ainda não cortado entre o bump e a borda móvel
    pub fn headroom(&self) -> usize {
        match self.growth {
            Growth::Up => self.end.saturating_sub(self.bump),
            Growth::Down => self.bump.saturating_sub(self.end),
        }
    }

    /// Nunca cortou nada e não tem trecho aposentado
    pub fn is_pristine(&self) -> bool {
        self.bump == self.base && self.live == 0 && self.retired.is_none()
    }

    /// Uma reatribuição de classe é possível agora
    pub fn can_reassign(&self) -> bool {
        self.retired.as_ref().map_or(true, |r| r.live == 0)
    }

    /// Move a borda compartilhada. Só a migração chama isto.
    pub(crate) fn set_end(&mut self, end: usize) {
        self.end = end;
    }

    // -------------------------------------------------------------------------
    // Alocação
    // -------------------------------------------------------------------------

    /// Caminho rápido: cabeça da freelist, sem checagem de limites.
    pub fn take_free(&mut self) -> Option<NonNull<u8>> {
        let block = self.freelist.pop()?;
        self.live += 1;
        Some(block)
    }

    /// Corta um bloco novo. `None` se a borda móvel seria cruzada.
    pub fn carve(&mut self) -> Option<NonNull<u8>> {
        let class = self.class_size;
        let addr = match self.growth {
            Growth::Up => {
                let next = self.bump.checked_add(class)?;
                if next > self.end {
                    return None;
                }
                let addr = self.bump;
                self.bump = next;
                addr
            }
            Growth::Down => {
                let next = self.bump.checked_sub(class)?;
                if next < self.end {
                    return None;
                }
                self.bump = next;
                next
            }
        };
        self.live += 1;
        NonNull::new(addr as *mut u8)
    }

    // -------------------------------------------------------------------------
    // Liberação
    // -------------------------------------------------------------------------

    /// `addr` é o início de um bloco cortado com a classe atual
    pub fn is_block_start(&self, addr: usize) -> bool {
        self.carved().contains(addr)
            && block_offset(self.growth, self.origin, addr) % self.class_size == 0
    }

    /// Tamanho do bloco que começa em `addr`.
    pub fn block_size(&self, addr: usize) -> ZfResult<usize> {
        if let Some(retired) = self.retired_at(addr) {
            return if retired.is_block_start(addr) {
                Ok(retired.class_size)
            } else {
                Err(ZfError::InvalidPointer)
            };
        }
        if self.is_block_start(addr) {
            Ok(self.class_size)
        } else {
            Err(ZfError::InvalidPointer)
        }
    }

    fn retired_at(&self, addr: usize) -> Option<&RetiredSpan> {
        self.retired.as_ref().filter(|r| r.range.contains(addr))
    }

    /// Valida que `addr` é um bloco vivo desta região.
    pub fn check_live(&self, addr: usize) -> ZfResult<usize> {
        let size = self.block_size(addr)?;
        let block = NonNull::new(addr as *mut u8).ok_or(ZfError::InvalidPointer)?;
        let (freed, live) = match self.retired_at(addr) {
            Some(retired) => (&retired.dead, retired.live),
            None => (&self.freelist, self.live),
        };
        // SAFETY: `addr` é início de bloco cortado dentro da região
        if unsafe { FreeList::is_tagged(block) } && freed.contains(addr) {
            return Err(ZfError::DoubleFree);
        }
        if live == 0 {
            return Err(ZfError::Corruption);
        }
        Ok(size)
    }

    /// Devolve o bloco à freelist (ou ao conjunto morto do trecho
    /// aposentado).
    pub fn release(&mut self, addr: usize) -> ZfResult<()> {
        self.check_live(addr)?;
        let block = NonNull::new(addr as *mut u8).ok_or(ZfError::InvalidPointer)?;

        if let Some(retired) = self.retired.as_mut().filter(|r| r.range.contains(addr)) {
            // SAFETY: bloco vivo da classe antiga, nunca mais entregue
            unsafe { retired.dead.push(block) };
            retired.live -= 1;
            return Ok(());
        }

        // SAFETY: bloco vivo da classe atual, alinhado e do tamanho da classe
        unsafe { self.freelist.push(block) };
        self.live -= 1;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reatribuição de classe
    // -------------------------------------------------------------------------

    /// Troca a classe da região.
    ///
    /// Região intocada: troca direta. Com blocos cortados: o trecho cortado
    /// com a classe atual vira trecho aposentado, levando a freelist junto,
    /// e o corte recomeça no bump. Só é permitido se não houver trecho
    /// aposentado ainda com blocos vivos; esse trecho anterior é esquecido.
    pub fn reassign_class(&mut self, class_size: usize) -> ZfResult<()> {
        if self.is_pristine() {
            self.class_size = class_size;
            return Ok(());
        }
        if !self.can_reassign() {
            return Err(ZfError::OutOfMemory);
        }

        self.retired = Some(RetiredSpan {
            range: self.carved(),
            class_size: self.class_size,
            live: self.live,
            growth: self.growth,
            origin: self.origin,
            dead: core::mem::take(&mut self.freelist),
        });
        self.live = 0;
        self.origin = self.bump;
        self.class_size = class_size;
        Ok(())
    }
}

// =============================================================================
// TABELA
// =============================================================================

/// As quatro regiões, em ordem de endereço.
pub struct RegionTable {
    regions: [Region; REGION_COUNT],
}

impl RegionTable {
    /// Particiona `[heap_base, heap_end)` em quatro fatias iguais.
    pub fn new(config: &ZerofatConfig) -> Self {
        let size = config.region_size();
        let make = |i: usize| {
            let start = config.heap_base + i * size;
            Region::new(RegionIndex(i as u8), start, start + size, config.class_sizes[i])
        };
        Self {
            regions: [make(0), make(1), make(2), make(3)],
        }
    }

    #[inline]
    pub fn get(&self, index: RegionIndex) -> &Region {
        &self.regions[index.get()]
    }

    #[inline]
    pub fn get_mut(&mut self, index: RegionIndex) -> &mut Region {
        &mut self.regions[index.get()]
    }

    /// Empréstimo mutável simultâneo de duas regiões distintas.
    pub fn pair_mut(&mut self, a: RegionIndex, b: RegionIndex) -> (&mut Region, &mut Region) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = self.regions.split_at_mut(hi.get());
        let (lo_ref, hi_ref) = (&mut left[lo.get()], &mut right[0]);
        if a < b {
            (lo_ref, hi_ref)
        } else {
            (hi_ref, lo_ref)
        }
    }

    /// Dono de `addr` (intervalos semiabertos, disjuntos).
    pub fn lookup(&self, addr: usize) -> RegionLookup {
        self.regions
            .iter()
            .find(|r| r.contains(addr))
            .map_or(RegionLookup::NotFound, |r| RegionLookup::Owned(r.index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// As regiões cobrem exatamente `heap`, sem sobreposição.
    pub fn is_partition_of(&self, heap: HwRange) -> bool {
        let mut cursor = heap.start;
        for region in self.regions.iter() {
            let span = region.span();
            if span.start != cursor {
                return false;
            }
            cursor = span.limit;
        }
        cursor == heap.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(64))]
    struct Arena([u8; 1024]);

    fn arena() -> Box<Arena> {
        Box::new(Arena([0; 1024]))
    }

    fn idx(i: usize) -> RegionIndex {
        RegionIndex::new(i).unwrap()
    }

    #[test]
    fn test_partner_and_growth() {
        assert_eq!(idx(0).partner(), idx(1));
        assert_eq!(idx(3).partner(), idx(2));
        assert_eq!(Growth::for_index(idx(2)), Growth::Up);
        assert_eq!(Growth::for_index(idx(1)), Growth::Down);
        assert!(RegionIndex::new(4).is_none());
    }

    #[test]
    fn test_table_partitions_heap() {
        let config = ZerofatConfig::new(0x1000, 4096, 64, [32, 64, 128, 256], [512, 768, 1024]);
        let table = RegionTable::new(&config);

        assert!(table.is_partition_of(HwRange::new(0x1000, 0x2000)));
        assert_eq!(table.get(idx(0)).end(), table.get(idx(1)).end());
        assert_eq!(table.get(idx(1)).base(), 0x1800);
        assert_eq!(table.lookup(0x1400), RegionLookup::Owned(idx(1)));
        assert_eq!(table.lookup(0x17FF), RegionLookup::Owned(idx(1)));
        assert_eq!(table.lookup(0x2000), RegionLookup::NotFound);
        assert_eq!(table.lookup(0x0FFF), RegionLookup::NotFound);
    }

    #[test]
    fn test_carve_up_and_down() {
        let mut mem = arena();
        let start = mem.0.as_mut_ptr() as usize;

        let mut up = Region::new(idx(0), start, start + 128, 32);
        let a = up.carve().unwrap().as_ptr() as usize;
        let b = up.carve().unwrap().as_ptr() as usize;
        assert_eq!((a, b), (start, start + 32));
        assert_eq!(up.headroom(), 64);

        let mut down = Region::new(idx(1), start + 128, start + 256, 64);
        let c = down.carve().unwrap().as_ptr() as usize;
        let d = down.carve().unwrap().as_ptr() as usize;
        assert_eq!((c, d), (start + 192, start + 128));
        assert!(down.carve().is_none());
        assert_eq!(down.live(), 2);
    }

    #[test]
    fn test_release_validates_pointer() {
        let mut mem = arena();
        let start = mem.0.as_mut_ptr() as usize;
        let mut region = Region::new(idx(1), start, start + 256, 32);

        let a = region.carve().unwrap().as_ptr() as usize;
        assert_eq!(a, start + 224);

        // Interior do bloco e trecho ainda não cortado
        assert_eq!(region.release(a + 8), Err(ZfError::InvalidPointer));
        assert_eq!(region.release(start), Err(ZfError::InvalidPointer));

        assert_eq!(region.release(a), Ok(()));
        assert_eq!(region.release(a), Err(ZfError::DoubleFree));
        assert_eq!(region.free_blocks(), 1);

        // Reuso sai da freelist
        assert_eq!(region.take_free().map(|p| p.as_ptr() as usize), Some(a));
        assert_eq!(region.live(), 1);
    }

    #[test]
    fn test_reassign_retires_carved_span() {
        let mut mem = arena();
        let start = mem.0.as_mut_ptr() as usize;
        let mut region = Region::new(idx(3), start, start + 1024, 256);

        let old = region.carve().unwrap().as_ptr() as usize;
        assert_eq!(region.reassign_class(512), Ok(()));

        let retired = region.retired().unwrap();
        assert_eq!(retired.range, HwRange::new(start + 768, start + 1024));
        assert_eq!(retired.live, 1);

        // Trecho aposentado com bloco vivo impede nova troca
        assert_eq!(region.reassign_class(768), Err(ZfError::OutOfMemory));

        let new = region.carve().unwrap().as_ptr() as usize;
        assert_eq!(new, start + 256);
        assert_eq!(region.block_size(old), Ok(256));
        assert_eq!(region.block_size(new), Ok(512));

        assert_eq!(region.release(old), Ok(()));
        assert_eq!(region.release(old), Err(ZfError::DoubleFree));
        assert_eq!(region.retired().unwrap().live, 0);
        assert_eq!(region.free_blocks(), 0);
    }

    #[test]
    fn test_retired_span_tracks_each_block() {
        let mut mem = arena();
        let start = mem.0.as_mut_ptr() as usize;
        let mut region = Region::new(idx(3), start, start + 1024, 256);

        let a = region.carve().unwrap().as_ptr() as usize;
        let b = region.carve().unwrap().as_ptr() as usize;
        assert_eq!(region.release(a), Ok(()));
        assert_eq!(region.reassign_class(512), Ok(()));

        let retired = region.retired().unwrap();
        assert_eq!(retired.range, HwRange::new(start + 512, start + 1024));
        assert_eq!((retired.live, retired.dead_blocks()), (1, 1));

        // `a` já estava livre antes da troca
        assert_eq!(region.release(a), Err(ZfError::DoubleFree));
        assert_eq!(region.release(b + 8), Err(ZfError::InvalidPointer));
        assert_eq!(region.check_live(b), Ok(256));
        assert_eq!(region.release(b), Ok(()));
        assert_eq!(region.release(b), Err(ZfError::DoubleFree));
        assert_eq!(region.retired().unwrap().dead_blocks(), 2);
        assert!(region.can_reassign());
    }
}
