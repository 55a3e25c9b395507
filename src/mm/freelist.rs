//! Freelist intrusiva.
//!
//! Único ponto do crate que reinterpreta memória de blocos como metadados.
//! Um bloco livre guarda no próprio corpo:
//!
//! ```text
//! [ next: Option<NonNull<FreeNode>> | tag: FREE_TAG | ... resto da classe ... ]
//! ```
//!
//! `tag` torna a detecção de double free O(1) no caso comum: só blocos com a
//! marca precisam ser confirmados percorrendo a lista (o usuário pode ter
//! escrito o mesmo valor por acaso).

use core::ptr::NonNull;

use crate::mm::config::{BLOCK_ALIGN, MIN_CLASS_SIZE};

/// Marca gravada na segunda palavra de todo bloco livre
const FREE_TAG: usize = 0xF4EE_B10C;

#[repr(C)]
struct FreeNode {
    next: Option<NonNull<FreeNode>>,
    tag: usize,
}

// O nó precisa caber na menor classe
const _: () = assert!(core::mem::size_of::<FreeNode>() <= MIN_CLASS_SIZE);
const _: () = assert!(core::mem::align_of::<FreeNode>() <= BLOCK_ALIGN);

/// Lista LIFO de blocos livres de mesma classe.
pub struct FreeList {
    head: Option<NonNull<FreeNode>>,
    len: usize,
}

// Send seguro pois é protegido pelo Mutex do alocador
unsafe impl Send for FreeList {}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Empilha `block` na cabeça da lista.
    ///
    /// # Safety
    /// - `block` aponta para pelo menos `MIN_CLASS_SIZE` bytes graváveis,
    ///   alinhados a `BLOCK_ALIGN`
    /// - ninguém mais usa o bloco até ele sair pela `pop`
    pub unsafe fn push(&mut self, block: NonNull<u8>) {
        let node = block.cast::<FreeNode>();
        unsafe {
            node.as_ptr().write(FreeNode {
                next: self.head,
                tag: FREE_TAG,
            });
        }
        self.head = Some(node);
        self.len += 1;
    }

    /// Desempilha a cabeça, transferindo a posse ao chamador.
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = self.head?;
        // SAFETY: todo nó entrou via `push`, que exige memória válida
        unsafe {
            let node_ptr = node.as_ptr();
            self.head = (*node_ptr).next;
            // Bloco vivo não carrega a marca
            (*node_ptr).tag = 0;
        }
        self.len -= 1;
        Some(node.cast())
    }

    /// Verifica se `block` carrega a marca de bloco livre.
    ///
    /// # Safety
    /// `block` aponta para um bloco inteiro (>= `MIN_CLASS_SIZE` bytes
    /// legíveis) dentro de uma região do heap.
    pub unsafe fn is_tagged(block: NonNull<u8>) -> bool {
        let node = block.cast::<FreeNode>().as_ptr();
        unsafe { core::ptr::addr_of!((*node).tag).read() == FREE_TAG }
    }

    /// Percorre a lista procurando `addr`. No máximo `len` passos.
    pub fn contains(&self, addr: usize) -> bool {
        self.iter().any(|a| a == addr)
    }

    /// Endereços dos blocos livres, da cabeça para a cauda.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            remaining: self.len,
            _list: core::marker::PhantomData,
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    next: Option<NonNull<FreeNode>>,
    remaining: usize,
    _list: core::marker::PhantomData<&'a FreeList>,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        // Limita a `len` passos: um ciclo criado por escrita após free não
        // trava o alocador
        if self.remaining == 0 {
            return None;
        }
        let node = self.next?;
        self.remaining -= 1;
        // SAFETY: nós da lista vieram de `push`
        self.next = unsafe { (*node.as_ptr()).next };
        Some(node.as_ptr() as usize)
    }
}
