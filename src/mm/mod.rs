//! # Memory Management (MM)
//!
//! Alocador de quatro regiões cercadas pela MPU. Cada região serve uma
//! única classe de tamanho; as regiões formam pares `(0,1)` e `(2,3)` que
//! crescem uma contra a outra e trocam espaço migrando a fronteira comum.
//!
//! ## 🏗️ Arquitetura dos Módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | `config` | Layout do heap, classes, slots da MPU, validação. |
//! | `freelist` | Lista intrusiva de blocos livres com tag de double free. |
//! | `region` | Região (base, fim, bump), tabela e busca por endereço. |
//! | `size_table` | Classes ativas e reservadas, crescimento da classe do topo. |
//! | `migration` | Planejamento e aplicação da migração de fronteira. |
//! | `engine` | Caminho completo de alocação e liberação, sem efeitos colaterais. |
//! | `fallback` | Alocador real para pedidos que as regiões não atendem. |
//! | `heap` | Fachada travada: MPU, fallback, checagem de contexto. |
//! | `stats` / `trace` | Contadores e relato das chamadas estilo C. |
//!
//! ## 🔍 Invariantes
//! - As quatro regiões particionam `[heap_base, heap_base + heap_size)`.
//! - Todo bloco devolvido cabe inteiro na sua região e nunca se sobrepõe a
//!   outro bloco vivo.
//! - A MPU é reprogramada antes do ponteiro sair da seção crítica.

pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod freelist;
pub mod heap;
pub mod migration;
pub mod region;
pub mod size_table;
pub mod stats;
pub mod trace;

#[cfg(any(test, feature = "self_test"))]
pub mod test;

pub use config::ZerofatConfig;
pub use error::{ZfError, ZfResult};
pub use fallback::{FallbackAllocator, LinkedListFallback, NoFallback};
pub use heap::ZerofatHeap;
pub use stats::StatsSnapshot;
