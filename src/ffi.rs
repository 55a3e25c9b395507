//! # Interface C (`--wrap=malloc`)
//!
//! O firmware C continua chamando `malloc`/`free`/`calloc`/`realloc`; o
//! linker desvia as chamadas para os símbolos `__wrap_*` gerados aqui:
//!
//! ```text
//! -Wl,--wrap=malloc -Wl,--wrap=free -Wl,--wrap=calloc -Wl,--wrap=realloc
//! ```
//!
//! Os `__real_*` ficam disponíveis para o alocador de fallback da
//! aplicação.
//!
//! ```ignore
//! static HEAP: ZerofatHeap<ArmV8Mpu, LinkedListFallback, CortexMProbe> = ZerofatHeap::new(
//!     ZerofatConfig::DEFAULT,
//!     unsafe { ArmV8Mpu::new() },
//!     LinkedListFallback::empty(),
//!     CortexMProbe,
//! );
//!
//! zerofat::export_wrapped_malloc!(HEAP);
//! ```

/// Gera `__wrap_malloc`, `__wrap_free`, `__wrap_calloc` e `__wrap_realloc`
/// sobre a superfície estilo C de um `ZerofatHeap`.
///
/// `$heap` é avaliado a cada chamada e deve produzir o heap (ou uma
/// referência `'static` a ele).
#[macro_export]
macro_rules! export_wrapped_malloc {
    ($heap:expr) => {
        #[no_mangle]
        pub unsafe extern "C" fn __wrap_malloc(size: usize) -> *mut ::core::ffi::c_void {
            $heap.allocate(size).cast()
        }

        #[no_mangle]
        pub unsafe extern "C" fn __wrap_free(ptr: *mut ::core::ffi::c_void) {
            $heap.release(ptr.cast())
        }

        #[no_mangle]
        pub unsafe extern "C" fn __wrap_calloc(
            count: usize,
            size: usize,
        ) -> *mut ::core::ffi::c_void {
            $heap.zeroed_allocate(count, size).cast()
        }

        #[no_mangle]
        pub unsafe extern "C" fn __wrap_realloc(
            ptr: *mut ::core::ffi::c_void,
            size: usize,
        ) -> *mut ::core::ffi::c_void {
            $heap.reallocate(ptr.cast(), size).cast()
        }
    };
}
