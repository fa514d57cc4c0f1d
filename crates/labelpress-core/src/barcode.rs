//! # Code 128 Encoding
//!
//! Pure Code 128 (subset B) encoder. Produces the module-width sequence a
//! rendering backend turns into bars; no drawing happens here.
//!
//! ## Symbol Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  START B │ data symbol │ data symbol │ ... │ checksum │ STOP            │
//! │                                                                         │
//! │  Every symbol is 6 elements (bar,space,...) totalling 11 modules;       │
//! │  the STOP symbol is 7 elements totalling 13 modules.                    │
//! │                                                                         │
//! │  Checksum = (start value + Σ value(i) * position(i)) mod 103            │
//! │  with positions starting at 1.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subset B covers ASCII 32..=127, which is everything a SKU in this system
//! may contain. Values outside that range are a planning error, raised
//! before any rendering starts.

// =============================================================================
// Symbol Table
// =============================================================================

/// Code 128 element widths, values 0..=106.
///
/// Each entry lists the widths (in modules) of the alternating bars and
/// spaces, starting with a bar. 103/104/105 are START A/B/C, 106 is STOP.
const PATTERNS: [&[u8]; 107] = [
    &[2, 1, 2, 2, 2, 2],
    &[2, 2, 2, 1, 2, 2],
    &[2, 2, 2, 2, 2, 1],
    &[1, 2, 1, 2, 2, 3],
    &[1, 2, 1, 3, 2, 2],
    &[1, 3, 1, 2, 2, 2],
    &[1, 2, 2, 2, 1, 3],
    &[1, 2, 2, 3, 1, 2],
    &[1, 3, 2, 2, 1, 2],
    &[2, 2, 1, 2, 1, 3],
    &[2, 2, 1, 3, 1, 2],
    &[2, 3, 1, 2, 1, 2],
    &[1, 1, 2, 2, 3, 2],
    &[1, 2, 2, 1, 3, 2],
    &[1, 2, 2, 2, 3, 1],
    &[1, 1, 3, 2, 2, 2],
    &[1, 2, 3, 1, 2, 2],
    &[1, 2, 3, 2, 2, 1],
    &[2, 2, 3, 2, 1, 1],
    &[2, 2, 1, 1, 3, 2],
    &[2, 2, 1, 2, 3, 1],
    &[2, 1, 3, 2, 1, 2],
    &[2, 2, 3, 1, 1, 2],
    &[3, 1, 2, 1, 3, 1],
    &[3, 1, 1, 2, 2, 2],
    &[3, 2, 1, 1, 2, 2],
    &[3, 2, 1, 2, 2, 1],
    &[3, 1, 2, 2, 1, 2],
    &[3, 2, 2, 1, 1, 2],
    &[3, 2, 2, 2, 1, 1],
    &[2, 1, 2, 1, 2, 3],
    &[2, 1, 2, 3, 2, 1],
    &[2, 3, 2, 1, 2, 1],
    &[1, 1, 1, 3, 2, 3],
    &[1, 3, 1, 1, 2, 3],
    &[1, 3, 1, 3, 2, 1],
    &[1, 1, 2, 3, 1, 3],
    &[1, 3, 2, 1, 1, 3],
    &[1, 3, 2, 3, 1, 1],
    &[2, 1, 1, 3, 1, 3],
    &[2, 3, 1, 1, 1, 3],
    &[2, 3, 1, 3, 1, 1],
    &[1, 1, 2, 1, 3, 3],
    &[1, 1, 2, 3, 3, 1],
    &[1, 3, 2, 1, 3, 1],
    &[1, 1, 3, 1, 2, 3],
    &[1, 1, 3, 3, 2, 1],
    &[1, 3, 3, 1, 2, 1],
    &[3, 1, 3, 1, 2, 1],
    &[2, 1, 1, 3, 3, 1],
    &[2, 3, 1, 1, 3, 1],
    &[2, 1, 3, 1, 1, 3],
    &[2, 1, 3, 3, 1, 1],
    &[2, 1, 3, 1, 3, 1],
    &[3, 1, 1, 1, 2, 3],
    &[3, 1, 1, 3, 2, 1],
    &[3, 3, 1, 1, 2, 1],
    &[3, 1, 2, 1, 1, 3],
    &[3, 1, 2, 3, 1, 1],
    &[3, 3, 2, 1, 1, 1],
    &[3, 1, 4, 1, 1, 1],
    &[2, 2, 1, 4, 1, 1],
    &[4, 3, 1, 1, 1, 1],
    &[1, 1, 1, 2, 2, 4],
    &[1, 1, 1, 4, 2, 2],
    &[1, 2, 1, 1, 2, 4],
    &[1, 2, 1, 4, 2, 1],
    &[1, 4, 1, 1, 2, 2],
    &[1, 4, 1, 2, 2, 1],
    &[1, 1, 2, 2, 1, 4],
    &[1, 1, 2, 4, 1, 2],
    &[1, 2, 2, 1, 1, 4],
    &[1, 2, 2, 4, 1, 1],
    &[1, 4, 2, 1, 1, 2],
    &[1, 4, 2, 2, 1, 1],
    &[2, 4, 1, 2, 1, 1],
    &[2, 2, 1, 1, 1, 4],
    &[4, 1, 3, 1, 1, 1],
    &[2, 4, 1, 1, 1, 2],
    &[1, 3, 4, 1, 1, 1],
    &[1, 1, 1, 2, 4, 2],
    &[1, 2, 1, 1, 4, 2],
    &[1, 2, 1, 2, 4, 1],
    &[1, 1, 4, 2, 1, 2],
    &[1, 2, 4, 1, 1, 2],
    &[1, 2, 4, 2, 1, 1],
    &[4, 1, 1, 2, 1, 2],
    &[4, 2, 1, 1, 1, 2],
    &[4, 2, 1, 2, 1, 1],
    &[2, 1, 2, 1, 4, 1],
    &[2, 1, 4, 1, 2, 1],
    &[4, 1, 2, 1, 2, 1],
    &[1, 1, 1, 1, 4, 3],
    &[1, 1, 1, 3, 4, 1],
    &[1, 3, 1, 1, 4, 1],
    &[1, 1, 4, 1, 1, 3],
    &[1, 1, 4, 3, 1, 1],
    &[4, 1, 1, 1, 1, 3],
    &[4, 1, 1, 3, 1, 1],
    &[1, 1, 3, 1, 4, 1],
    &[1, 1, 4, 1, 3, 1],
    &[3, 1, 1, 1, 4, 1],
    &[4, 1, 1, 1, 3, 1],
    &[2, 1, 1, 4, 1, 2],
    &[2, 1, 1, 2, 1, 4],
    &[2, 1, 1, 2, 3, 2],
    &[2, 3, 3, 1, 1, 1, 2],
];

const START_B: usize = 104;
const STOP: usize = 106;

// =============================================================================
// Encoder
// =============================================================================

/// An encoded Code 128 symbol stream.
///
/// `elements` holds alternating bar/space widths in modules, starting with
/// a bar; `module_count` is their sum. The renderer multiplies by a module
/// width in millimeters to get physical bars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    pub elements: Vec<u8>,
    pub module_count: usize,
}

/// Returns true if `value` is encodable in subset B (printable ASCII).
pub fn is_encodable(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| (' '..='\u{7f}').contains(&c))
}

/// Encodes `value` as Code 128 subset B, including start, checksum and
/// stop symbols. Returns `None` when the value is empty or contains
/// characters outside printable ASCII; the planner maps that to a typed
/// layout error.
pub fn encode(value: &str) -> Option<Code128> {
    if !is_encodable(value) {
        return None;
    }

    let mut symbols: Vec<usize> = Vec::with_capacity(value.len() + 3);
    symbols.push(START_B);

    let mut checksum = START_B;
    for (position, ch) in value.chars().enumerate() {
        let symbol = ch as usize - 32;
        checksum += symbol * (position + 1);
        symbols.push(symbol);
    }
    symbols.push(checksum % 103);
    symbols.push(STOP);

    let mut elements = Vec::with_capacity(symbols.len() * 6 + 1);
    for symbol in &symbols {
        elements.extend_from_slice(PATTERNS[*symbol]);
    }

    let module_count = elements.iter().map(|w| *w as usize).sum();
    Some(Code128 {
        elements,
        module_count,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Modules in a standard symbol / in the stop symbol.
    const SYMBOL_MODULES: usize = 11;
    const STOP_MODULES: usize = 13;

    #[test]
    fn test_every_symbol_is_eleven_modules() {
        for (value, pattern) in PATTERNS.iter().enumerate().take(106) {
            let total: usize = pattern.iter().map(|w| *w as usize).sum();
            assert_eq!(total, SYMBOL_MODULES, "symbol {} has wrong width", value);
        }
        let stop: usize = PATTERNS[STOP].iter().map(|w| *w as usize).sum();
        assert_eq!(stop, STOP_MODULES);
    }

    #[test]
    fn test_encode_single_char() {
        // "A" = value 33; checksum = (104 + 33*1) % 103 = 34.
        let code = encode("A").unwrap();
        // start + data + checksum (6 elements each) + stop (7 elements)
        assert_eq!(code.elements.len(), 3 * 6 + 7);
        assert_eq!(code.module_count, 3 * SYMBOL_MODULES + STOP_MODULES);

        assert_eq!(&code.elements[0..6], PATTERNS[START_B]);
        assert_eq!(&code.elements[6..12], PATTERNS[33]);
        assert_eq!(&code.elements[12..18], PATTERNS[34]);
        assert_eq!(&code.elements[18..], PATTERNS[STOP]);
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode("SKU-12345"), encode("SKU-12345"));
    }

    #[test]
    fn test_module_count_grows_linearly() {
        let short = encode("AB").unwrap();
        let long = encode("ABC").unwrap();
        assert_eq!(long.module_count - short.module_count, SYMBOL_MODULES);
    }

    #[test]
    fn test_rejects_empty_and_non_ascii() {
        assert!(encode("").is_none());
        assert!(encode("Арт-1").is_none());
        assert!(encode("SKU\n1").is_none());
    }
}
