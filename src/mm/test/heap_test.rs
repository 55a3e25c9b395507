//! Testes do Heap

use core::ptr;

use super::{HeapUnderTest, TestCase, TestResult};
use crate::mm::error::ZfError;

/// Testes do Heap
pub const HEAP_TESTS: &[TestCase] = &[
    TestCase::new("heap_free_reuses_block", test_free_reuses_block),
    TestCase::new("heap_read_write", test_read_write),
    TestCase::new("heap_block_in_regions", test_block_in_regions),
    TestCase::new("heap_calloc_zeroed", test_calloc_zeroed),
    TestCase::new("heap_calloc_overflow", test_calloc_overflow),
    TestCase::new("heap_realloc_preserves", test_realloc_preserves),
    TestCase::new("heap_free_null", test_free_null),
    TestCase::new("heap_double_free", test_double_free),
];

/// Teste: bloco liberado volta no próximo pedido da mesma classe
fn test_free_reuses_block(heap: &dyn HeapUnderTest) -> TestResult {
    let a = heap.malloc(12);
    if a.is_null() {
        crate::zerror!("(Heap) malloc(12) falhou");
        return TestResult::Failed;
    }
    heap.free(a);

    let b = heap.malloc(12);
    heap.free(b);
    if a != b {
        crate::zerror!("(Heap) bloco não reutilizado=", b as usize);
        return TestResult::Failed;
    }
    TestResult::Passed
}

/// Teste: leitura e escrita no bloco
fn test_read_write(heap: &dyn HeapUnderTest) -> TestResult {
    let block = heap.malloc(16) as *mut u64;
    if block.is_null() {
        return TestResult::Failed;
    }
    let test_val: u64 = 0xDEAD_BEEF_CAFE_BABE;

    // SAFETY: bloco vivo de pelo menos 16 bytes, alinhado a 8
    let read_val = unsafe {
        ptr::write_volatile(block, test_val);
        ptr::write_volatile(block.add(1), !test_val);
        ptr::read_volatile(block)
    };
    heap.free(block.cast());

    if read_val != test_val {
        crate::zerror!("(Heap) Valor lido incorreto=", read_val);
        return TestResult::Failed;
    }
    crate::ztrace!("(Heap) Leitura/Escrita OK");
    TestResult::Passed
}

/// Teste: pedido pequeno é servido pelas regiões, não pelo fallback
fn test_block_in_regions(heap: &dyn HeapUnderTest) -> TestResult {
    let p = heap.malloc(8);
    let inside = !p.is_null() && heap.in_regions(p as usize);
    heap.free(p);
    if inside {
        TestResult::Passed
    } else {
        crate::zerror!("(Heap) bloco fora das regiões=", p as usize);
        TestResult::Failed
    }
}

fn test_calloc_zeroed(heap: &dyn HeapUnderTest) -> TestResult {
    // Suja um bloco e devolve, para o calloc reaproveitar
    let dirty = heap.malloc(24);
    if dirty.is_null() {
        return TestResult::Failed;
    }
    // SAFETY: bloco vivo de pelo menos 24 bytes
    unsafe { ptr::write_bytes(dirty, 0xA5, 24) };
    heap.free(dirty);

    let p = heap.calloc(3, 8);
    if p.is_null() {
        return TestResult::Failed;
    }
    // SAFETY: calloc devolveu 24 bytes
    let zeroed = unsafe { core::slice::from_raw_parts(p, 24) }.iter().all(|&b| b == 0);
    heap.free(p);
    if zeroed {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_calloc_overflow(heap: &dyn HeapUnderTest) -> TestResult {
    if heap.calloc(usize::MAX, 2).is_null() {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

/// Teste: realloc para uma classe maior preserva o conteúdo
fn test_realloc_preserves(heap: &dyn HeapUnderTest) -> TestResult {
    let p = heap.malloc(16);
    if p.is_null() {
        return TestResult::Failed;
    }
    for i in 0..16u8 {
        // SAFETY: dentro dos 16 bytes pedidos
        unsafe { p.add(i as usize).write(i) };
    }

    let q = heap.realloc(p, 48);
    if q.is_null() {
        heap.free(p);
        return TestResult::Failed;
    }
    // SAFETY: q tem pelo menos 48 bytes, os 16 primeiros copiados de p
    let kept = (0..16u8).all(|i| unsafe { q.add(i as usize).read() } == i);
    heap.free(q);
    if kept {
        TestResult::Passed
    } else {
        crate::zerror!("(Heap) realloc perdeu dados em=", q as usize);
        TestResult::Failed
    }
}

fn test_free_null(heap: &dyn HeapUnderTest) -> TestResult {
    heap.free(ptr::null_mut());
    match heap.checked_free(ptr::null_mut()) {
        Ok(()) => TestResult::Passed,
        Err(_) => TestResult::Failed,
    }
}

/// Teste: segunda liberação é detectada e não corrompe a freelist
fn test_double_free(heap: &dyn HeapUnderTest) -> TestResult {
    let p = heap.malloc(20);
    if p.is_null() {
        return TestResult::Failed;
    }
    heap.free(p);
    if heap.checked_free(p) != Err(ZfError::DoubleFree) {
        return TestResult::Failed;
    }

    // A freelist continua íntegra: o bloco sai uma única vez
    let a = heap.malloc(20);
    let b = heap.malloc(20);
    let distinct = !a.is_null() && a != b;
    heap.free(a);
    heap.free(b);
    if distinct {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}
