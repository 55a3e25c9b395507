//! Tipos de Erro do Alocador Zerofat
//!
//! Define erros estruturados para diagnóstico preciso de falhas do alocador.
//! A superfície estilo C (`allocate`, `release`...) converte estes erros em
//! ponteiro nulo ou em rejeição logada; a superfície `try_*` os devolve.

/// Erros do alocador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZfError {
    /// Nenhuma região nem vizinha doadora com folga para a classe pedida
    OutOfMemory,
    /// `count * element_size` estourou a largura de endereço
    Overflow,
    /// Ponto de entrada chamado em contexto de interrupção (fatal)
    InvalidContext,
    /// Ponteiro fora de todas as regiões e sem fallback que o reconheça
    ForeignPointer,
    /// Bloco já está na freelist da região
    DoubleFree,
    /// Invariante interna violada (freelist ou contadores inconsistentes)
    Corruption,
    /// Ponteiro dentro de uma região mas fora do início de um bloco entregue
    InvalidPointer,
    /// Configuração inconsistente (alinhamento, classes, quantum)
    InvalidConfig,
    /// Fallback consultado sem arena ou sem implementação (`NoFallback`)
    NoFallback,
}

impl ZfError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OOM: região e vizinha sem folga",
            Self::Overflow => "Overflow no cálculo do tamanho",
            Self::InvalidContext => "Alocador chamado em contexto de interrupção",
            Self::ForeignPointer => "Ponteiro não pertence a nenhuma região",
            Self::DoubleFree => "Double free detectado",
            Self::Corruption => "Freelist ou contadores corrompidos",
            Self::InvalidPointer => "Ponteiro não aponta para início de bloco",
            Self::InvalidConfig => "Configuração do heap inválida",
            Self::NoFallback => "Nenhum alocador de fallback configurado",
        }
    }
}

impl core::fmt::Display for ZfError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tipo Result específico para operações do alocador
pub type ZfResult<T> = Result<T, ZfError>;
