//! # Autotestes do Heap
//!
//! Suite executada no alvo logo após o boot (feature `self_test`) sobre o
//! heap real, com a MPU já habilitada. Os mesmos casos rodam no host a
//! partir dos testes de unidade.
//!
//! - `heap_test.rs` - Casos sobre a superfície estilo C

pub mod heap_test;

use crate::mm::error::ZfResult;
use crate::mm::fallback::FallbackAllocator;
use crate::mm::heap::ZerofatHeap;
use crate::mpu::RangeBinding;
use crate::sync::InterruptProbe;

pub use heap_test::HEAP_TESTS;

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn(&dyn HeapUnderTest) -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn(&dyn HeapUnderTest) -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Visão do heap que os casos exercitam, sem os parâmetros genéricos.
pub trait HeapUnderTest {
    fn malloc(&self, size: usize) -> *mut u8;
    fn free(&self, ptr: *mut u8);
    fn calloc(&self, count: usize, size: usize) -> *mut u8;
    fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8;
    fn checked_free(&self, ptr: *mut u8) -> ZfResult<()>;
    /// `true` se `addr` cai dentro de alguma das quatro regiões.
    fn in_regions(&self, addr: usize) -> bool;
}

impl<B, F, P> HeapUnderTest for ZerofatHeap<B, F, P>
where
    B: RangeBinding,
    F: FallbackAllocator,
    P: InterruptProbe,
{
    fn malloc(&self, size: usize) -> *mut u8 {
        self.allocate(size)
    }

    fn free(&self, ptr: *mut u8) {
        self.release(ptr)
    }

    fn calloc(&self, count: usize, size: usize) -> *mut u8 {
        self.zeroed_allocate(count, size)
    }

    fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        self.reallocate(ptr, size)
    }

    fn checked_free(&self, ptr: *mut u8) -> ZfResult<()> {
        self.try_release(ptr)
    }

    fn in_regions(&self, addr: usize) -> bool {
        addr >= self.config().heap_base && addr < self.config().heap_end()
    }
}

/// Executa a suite e devolve `(passed, failed, skipped)`.
pub fn run_test_suite(
    name: &str,
    tests: &[TestCase],
    heap: &dyn HeapUnderTest,
) -> (usize, usize, usize) {
    crate::zinfo!("=== Executando suite:");
    crate::zinfo!(name);

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for test in tests {
        match (test.func)(heap) {
            TestResult::Passed => {
                crate::zok!(test.name);
                passed += 1;
            }
            TestResult::Failed => {
                crate::zfail!(test.name);
                failed += 1;
            }
            TestResult::Skipped => {
                crate::zwarn!("[SKIP]");
                crate::zwarn!(test.name);
                skipped += 1;
            }
        }
    }

    crate::zinfo!("Resultados: passed=", passed);
    if failed > 0 {
        crate::zerror!("Resultados: failed=", failed);
    }
    (passed, failed, skipped)
}

/// Ponto de entrada no boot.
pub fn run_heap_self_tests(heap: &dyn HeapUnderTest) -> bool {
    let (_, failed, _) = run_test_suite("zerofat heap", HEAP_TESTS, heap);
    failed == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::fallback::NoFallback;
    use crate::sync::ThreadOnly;
    use crate::tests::support::{small_config, RecordingBinding, TestArena};

    #[test]
    fn test_suite_passes_on_host_arena() {
        let arena = TestArena::new();
        let heap = ZerofatHeap::new(
            small_config(arena.base()),
            RecordingBinding::new(),
            NoFallback,
            ThreadOnly,
        );

        let (passed, failed, skipped) = run_test_suite("host", HEAP_TESTS, &heap);
        assert_eq!(failed, 0);
        assert_eq!(passed + skipped, HEAP_TESTS.len());
        assert!(run_heap_self_tests(&heap));
        assert_eq!(heap.stats().live_blocks(), 0);
    }

    #[test]
    fn test_failure_is_counted() {
        fn always_fails(_: &dyn HeapUnderTest) -> TestResult {
            TestResult::Failed
        }
        fn skipped(_: &dyn HeapUnderTest) -> TestResult {
            TestResult::Skipped
        }
        const CASES: &[TestCase] = &[
            TestCase::new("falha", always_fails),
            TestCase::new("pulado", skipped),
        ];

        let arena = TestArena::new();
        let heap = ZerofatHeap::new(
            small_config(arena.base()),
            RecordingBinding::new(),
            NoFallback,
            ThreadOnly,
        );
        assert_eq!(run_test_suite("falhas", CASES, &heap), (0, 1, 1));
    }
}
