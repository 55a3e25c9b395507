//! Alocador de fallback.
//!
//! Recebe os pedidos que as regiões não atendem (OOM) e os ponteiros que
//! não caem em nenhuma região. A implementação padrão usa o
//! `linked_list_allocator` sobre uma arena separada do heap de regiões.
//!
//! Como a interface estilo C não informa o tamanho na liberação, cada bloco
//! carrega um cabeçalho com o tamanho pedido e uma marca de estado:
//!
//! ```text
//! [ reservado p/ nó de buraco | size | tag ][ dados do usuário ... ]
//! ```
//!
//! As duas primeiras palavras ficam para o nó que o `linked_list_allocator`
//! grava num bloco liberado, de modo que `tag` sobrevive à liberação. Isso
//! pega double free e ponteiros interiores enquanto a memória não for
//! reaproveitada; um ponteiro antigo cujo endereço já voltou a ser entregue
//! não é distinguível do bloco novo.

use core::alloc::Layout;
use core::ptr::NonNull;

use linked_list_allocator::Heap;

use crate::mm::config::BLOCK_ALIGN;
use crate::mm::error::{ZfError, ZfResult};
use crate::sync::Mutex;

/// Alocador "real" consultado fora das regiões.
pub trait FallbackAllocator {
    /// `false` faz o heap rejeitar ponteiros estrangeiros sem delegar
    fn is_configured(&self) -> bool {
        true
    }

    /// `ptr` veio deste alocador
    fn owns(&self, ptr: NonNull<u8>) -> bool;

    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    fn release(&self, ptr: NonNull<u8>) -> ZfResult<()>;

    /// Em falha devolve `None` e o bloco antigo continua válido
    fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>>;
}

impl<T: FallbackAllocator + ?Sized> FallbackAllocator for &T {
    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    fn owns(&self, ptr: NonNull<u8>) -> bool {
        (**self).owns(ptr)
    }

    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    fn release(&self, ptr: NonNull<u8>) -> ZfResult<()> {
        (**self).release(ptr)
    }

    fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
        (**self).reallocate(ptr, size)
    }
}

/// Sem fallback: OOM é definitivo e ponteiro estrangeiro é rejeitado.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackAllocator for NoFallback {
    fn is_configured(&self) -> bool {
        false
    }

    fn owns(&self, _ptr: NonNull<u8>) -> bool {
        false
    }

    fn allocate(&self, _size: usize) -> Option<NonNull<u8>> {
        None
    }

    fn release(&self, _ptr: NonNull<u8>) -> ZfResult<()> {
        Err(ZfError::NoFallback)
    }

    fn reallocate(&self, _ptr: NonNull<u8>, _size: usize) -> Option<NonNull<u8>> {
        None
    }
}

/// Marca de bloco entregue
const LIVE_TAG: usize = 0xA110_C8ED;
/// Marca de bloco devolvido
const FREED_TAG: usize = 0xDEAD_F4EE;

#[repr(C)]
struct Header {
    _hole: [usize; 2],
    size: usize,
    tag: usize,
}

const HEADER: usize = core::mem::size_of::<Header>();

const _: () = assert!(HEADER % BLOCK_ALIGN == 0);

/// Fallback sobre `linked_list_allocator::Heap`.
pub struct LinkedListFallback {
    heap: Mutex<Heap>,
}

impl LinkedListFallback {
    /// Construtor em tempo de compilação, sem arena
    pub const fn empty() -> Self {
        Self {
            heap: Mutex::new(Heap::empty()),
        }
    }

    /// Entrega a arena ao alocador.
    ///
    /// # Safety
    /// - Chamado uma única vez
    /// - `[bottom, bottom + size)` é memória válida, exclusiva e fora do
    ///   heap de regiões
    pub unsafe fn init(&self, bottom: *mut u8, size: usize) {
        crate::zdebug!("(Fallback) init: início=", bottom as usize);
        unsafe { self.heap.lock().init(bottom, size) };
    }

    /// Bytes em uso (cabeçalhos incluídos)
    pub fn used(&self) -> usize {
        self.heap.lock().used()
    }

    fn layout_for(size: usize) -> Option<Layout> {
        let total = size.checked_add(HEADER)?;
        Layout::from_size_align(total, BLOCK_ALIGN).ok()
    }

    /// Cabeçalho do bloco que começa em `ptr`.
    ///
    /// # Safety
    /// `owns(ptr)`: os `HEADER` bytes anteriores estão dentro da arena.
    unsafe fn header(ptr: NonNull<u8>) -> *mut Header {
        unsafe { ptr.as_ptr().sub(HEADER).cast::<Header>() }
    }

    /// Tamanho pedido de um bloco vivo.
    fn live_size(&self, ptr: NonNull<u8>) -> ZfResult<usize> {
        if !self.is_configured() {
            return Err(ZfError::NoFallback);
        }
        if !self.owns(ptr) {
            return Err(ZfError::ForeignPointer);
        }
        // SAFETY: `owns` garante o cabeçalho dentro da arena
        let (size, tag) = unsafe {
            let header = Self::header(ptr);
            (
                core::ptr::addr_of!((*header).size).read(),
                core::ptr::addr_of!((*header).tag).read(),
            )
        };
        match tag {
            LIVE_TAG => Ok(size),
            FREED_TAG => Err(ZfError::DoubleFree),
            _ => Err(ZfError::InvalidPointer),
        }
    }
}

impl Default for LinkedListFallback {
    fn default() -> Self {
        Self::empty()
    }
}

impl FallbackAllocator for LinkedListFallback {
    fn is_configured(&self) -> bool {
        self.heap.lock().size() > 0
    }

    fn owns(&self, ptr: NonNull<u8>) -> bool {
        let heap = self.heap.lock();
        let addr = ptr.as_ptr() as usize;
        addr >= heap.bottom() as usize + HEADER && addr < heap.top() as usize
    }

    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Self::layout_for(size)?;
        let block = self.heap.lock().allocate_first_fit(layout).ok()?;
        // SAFETY: bloco recém alocado com pelo menos HEADER bytes, alinhado
        unsafe {
            let header = block.as_ptr().cast::<Header>();
            core::ptr::addr_of_mut!((*header).size).write(size);
            core::ptr::addr_of_mut!((*header).tag).write(LIVE_TAG);
            Some(NonNull::new_unchecked(block.as_ptr().add(HEADER)))
        }
    }

    fn release(&self, ptr: NonNull<u8>) -> ZfResult<()> {
        let size = self.live_size(ptr)?;
        let layout = Self::layout_for(size).ok_or(ZfError::Corruption)?;
        // SAFETY: bloco vivo validado por `live_size`; o nó de buraco não
        // alcança `tag`
        unsafe {
            let header = Self::header(ptr);
            core::ptr::addr_of_mut!((*header).tag).write(FREED_TAG);
            self.heap
                .lock()
                .deallocate(NonNull::new_unchecked(header.cast()), layout);
        }
        Ok(())
    }

    fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
        let old_size = self.live_size(ptr).ok()?;
        let new = self.allocate(size)?;
        unsafe {
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), old_size.min(size));
        }
        self.release(ptr).ok()?;
        Some(new)
    }
}
