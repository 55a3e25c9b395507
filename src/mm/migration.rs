//! Migração de fronteira entre regiões pareadas.
//!
//! Quando o bump de uma região alcançaria a borda compartilhada, a borda
//! anda `k * quantum` bytes para dentro da vizinha, desde que a vizinha
//! tenha essa folga ainda não cortada. O plano é calculado sem efeitos e
//! aplicado depois; quem aplica é responsável por reprogramar a MPU das
//! duas regiões antes de entregar qualquer bloco.

use crate::mm::error::{ZfError, ZfResult};
use crate::mm::region::{Growth, Region, RegionIndex};

/// Deslocamento da borda compartilhada de um par.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPlan {
    pub recipient: RegionIndex,
    pub donor: RegionIndex,
    pub old_split: usize,
    pub new_split: usize,
}

impl MigrationPlan {
    #[inline]
    pub fn shift(&self) -> usize {
        self.old_split.abs_diff(self.new_split)
    }
}

/// Calcula o menor deslocamento (múltiplo de `quantum`) que abre espaço
/// para mais um bloco de `recipient`.
pub fn plan(recipient: &Region, donor: &Region, quantum: usize) -> ZfResult<MigrationPlan> {
    if donor.index() != recipient.index().partner() || recipient.end() != donor.end() {
        return Err(ZfError::Corruption);
    }

    let needed = recipient.class_size().saturating_sub(recipient.headroom());
    if needed == 0 {
        return Err(ZfError::Corruption);
    }

    let quanta = needed.div_ceil(quantum);
    let shift = quanta.checked_mul(quantum).ok_or(ZfError::OutOfMemory)?;
    if shift > donor.headroom() {
        crate::ztrace!("migração: doadora sem folga, precisa ", shift);
        return Err(ZfError::OutOfMemory);
    }

    let old_split = recipient.end();
    let new_split = match recipient.growth() {
        Growth::Up => old_split + shift,
        Growth::Down => old_split - shift,
    };

    Ok(MigrationPlan {
        recipient: recipient.index(),
        donor: donor.index(),
        old_split,
        new_split,
    })
}

/// Move a borda compartilhada das duas regiões.
pub fn apply(plan: &MigrationPlan, recipient: &mut Region, donor: &mut Region) {
    debug_assert_eq!(recipient.index(), plan.recipient);
    debug_assert_eq!(donor.index(), plan.donor);
    recipient.set_end(plan.new_split);
    donor.set_end(plan.new_split);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::config::ZerofatConfig;
    use crate::mm::region::RegionTable;

    fn idx(i: usize) -> RegionIndex {
        RegionIndex::new(i).unwrap()
    }

    fn table() -> RegionTable {
        // carve só mexe na contabilidade: nenhum bloco é tocado
        RegionTable::new(&ZerofatConfig::new(
            0x1000,
            4096,
            64,
            [32, 64, 128, 256],
            [512, 768, 1024],
        ))
    }

    #[test]
    fn test_plan_rounds_up_to_quantum() {
        let mut t = table();
        // 1024 bytes, classe 256: 4 cortes esgotam a região
        for _ in 0..4 {
            let _ = t.get_mut(idx(3)).carve();
        }

        let p = plan(t.get(idx(3)), t.get(idx(2)), 64).unwrap();
        assert_eq!(p.old_split, 0x1C00);
        assert_eq!(p.new_split, 0x1B00);
        assert_eq!(p.shift(), 256);
    }

    #[test]
    fn test_apply_preserves_union() {
        let mut t = table();
        for _ in 0..32 {
            let _ = t.get_mut(idx(0)).carve();
        }

        let p = plan(t.get(idx(0)), t.get(idx(1)), 64).unwrap();
        let (recipient, donor) = t.pair_mut(idx(0), idx(1));
        apply(&p, recipient, donor);

        assert_eq!(t.get(idx(0)).end(), 0x1440);
        assert_eq!(t.get(idx(1)).end(), 0x1440);
        assert!(t.is_partition_of(crate::mpu::HwRange::new(0x1000, 0x2000)));
    }

    #[test]
    fn test_plan_refuses_without_slack() {
        let mut t = table();
        for _ in 0..4 {
            let _ = t.get_mut(idx(3)).carve();
        }
        for _ in 0..8 {
            let _ = t.get_mut(idx(2)).carve();
        }

        assert_eq!(plan(t.get(idx(3)), t.get(idx(2)), 64), Err(ZfError::OutOfMemory));
        assert_eq!(plan(t.get(idx(3)), t.get(idx(1)), 64), Err(ZfError::Corruption));
    }
}
