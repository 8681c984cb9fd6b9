use rand::rngs::StdRng;
use rand::{RngExt as _, SeedableRng};
use tounicode::{CharCode, ToUnicodeCMap, UnicodeValue};

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Put `body` between the usual CMap prologue and epilogue.
#[allow(dead_code)]
pub fn wrap_cmap(body: &str) -> Vec<u8> {
    format!(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n/CMapType 2 def\n{}\nendcmap\n\
         CMapName currentdict /CMap defineresource pop\nend\nend\n",
        body
    )
    .into_bytes()
}

#[allow(dead_code)]
pub fn assert_maps(cmap: &ToUnicodeCMap, mappings: &[(CharCode, UnicodeValue)]) {
    assert_eq!(cmap.len(), mappings.len());
    for (code, value) in mappings {
        assert_eq!(cmap.get(*code).as_ref(), Some(value), "code {:#X}", code);
    }
}

#[allow(dead_code)]
pub fn below(rng: &mut StdRng, bound: u32) -> u32 {
    let mut bytes = [0u8; 4];
    rng.fill(&mut bytes[..]);
    u32::from_le_bytes(bytes) % bound
}

/// A table mixing incrementing runs, unrelated values, ligatures, astral characters and
/// lone surrogates. Neighbouring codes are at most `max_step` apart.
#[allow(dead_code)]
pub fn mixed_mappings(seed: u64, count: usize, max_step: u32) -> Vec<(CharCode, UnicodeValue)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mappings: Vec<(CharCode, UnicodeValue)> = Vec::with_capacity(count);
    let mut code = below(&mut rng, 16);
    for _ in 0..count {
        let value = match (below(&mut rng, 10), mappings.last()) {
            (0..=4, Some((_, previous))) => previous.offset(1),
            (5, _) => UnicodeValue::new(vec![0xD800 + below(&mut rng, 0x800) as u16]),
            (6, _) => UnicodeValue::from(char::from_u32(0x1F300 + below(&mut rng, 0x300)).unwrap_or('?')),
            (7, _) => UnicodeValue::from("ffi"),
            _ => UnicodeValue::new(vec![0x20 + below(&mut rng, 0xD000) as u16]),
        };
        mappings.push((code, value));
        code += 1 + below(&mut rng, max_step);
    }
    mappings
}
