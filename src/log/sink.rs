//! Saída de bytes do sistema de log.
//!
//! O alocador não conhece a UART da placa. A aplicação instala um `LogSink`
//! uma única vez (tipicamente logo após configurar a serial) e todos os
//! macros de log passam a escrever nele. Sem sink instalado, a saída é
//! descartada silenciosamente.
//!
//! Nenhuma função aqui usa `core::fmt` ou aloca: elas rodam dentro da seção
//! crítica do alocador.

use spin::Once;

/// Destino dos bytes de log (UART, RTT, semihosting, buffer de teste...).
pub trait LogSink: Sync {
    fn write_str(&self, s: &str);
}

static SINK: Once<&'static dyn LogSink> = Once::new();

/// Instala o sink global. Chamadas subsequentes são ignoradas.
pub fn set_sink(sink: &'static dyn LogSink) {
    SINK.call_once(|| sink);
}

/// Retorna `true` se algum sink já foi instalado.
pub fn has_sink() -> bool {
    SINK.get().is_some()
}

#[inline]
pub fn emit_str(s: &str) {
    if let Some(sink) = SINK.get() {
        sink.write_str(s);
    }
}

#[inline]
pub fn emit_nl() {
    emit_str("\r\n");
}

/// Emite `value` em hexadecimal com prefixo `0x`, sem zeros à esquerda.
pub fn emit_hex(value: u64) {
    let mut buf = [0u8; 18];
    let len = format_hex(value, &mut buf);
    emit_bytes(&buf[..len]);
}

/// Emite `value` em decimal.
pub fn emit_dec(value: usize) {
    let mut buf = [0u8; 20];
    let len = format_dec(value, &mut buf);
    emit_bytes(&buf[..len]);
}

fn emit_bytes(bytes: &[u8]) {
    // Só contém dígitos ASCII
    if let Ok(s) = core::str::from_utf8(bytes) {
        emit_str(s);
    }
}

fn nibble_to_ascii(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        _ => b'a' + (nibble - 10),
    }
}

/// Escreve `0x<hex>` em `buf` e retorna o número de bytes usados.
pub(crate) fn format_hex(value: u64, buf: &mut [u8; 18]) -> usize {
    buf[0] = b'0';
    buf[1] = b'x';

    let digits = if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize + 3) / 4
    };

    let mut i = 0;
    while i < digits {
        let shift = (digits - 1 - i) * 4;
        buf[2 + i] = nibble_to_ascii(((value >> shift) & 0xF) as u8);
        i += 1;
    }
    2 + digits
}

/// Escreve `value` em decimal em `buf` e retorna o número de bytes usados.
pub(crate) fn format_dec(mut value: usize, buf: &mut [u8; 20]) -> usize {
    if value == 0 {
        buf[0] = b'0';
        return 1;
    }

    let mut tmp = [0u8; 20];
    let mut pos = 0;
    while value > 0 {
        tmp[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        pos += 1;
    }

    let mut i = 0;
    while i < pos {
        buf[i] = tmp[pos - 1 - i];
        i += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        let mut buf = [0u8; 18];

        let n = format_hex(0, &mut buf);
        assert_eq!(&buf[..n], b"0x0");

        let n = format_hex(0x2000_2000, &mut buf);
        assert_eq!(&buf[..n], b"0x20002000");

        let n = format_hex(u64::MAX, &mut buf);
        assert_eq!(&buf[..n], b"0xffffffffffffffff");
    }

    #[test]
    fn test_format_dec() {
        let mut buf = [0u8; 20];

        let n = format_dec(0, &mut buf);
        assert_eq!(&buf[..n], b"0");

        let n = format_dec(9600, &mut buf);
        assert_eq!(&buf[..n], b"9600");
    }
}
