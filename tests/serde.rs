#![cfg(feature = "serde")]

use tounicode::{ToUnicodeCMap, UnicodeValue};

mod utils;
use utils::*;

#[test]
fn cmap_json_round_trip() {
    init_logger();
    let mappings = mixed_mappings(23, 300, 2);
    let cmap = ToUnicodeCMap::from_mappings(&mappings).unwrap();

    let json = serde_json::to_string(&cmap).unwrap();
    let restored: ToUnicodeCMap = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, cmap);
    assert_maps(&restored, &mappings);
}

#[test]
fn deserialization_validates_entries() {
    let json = r#"{
        "name": "Broken",
        "system_info": { "registry": "Adobe", "ordering": "UCS", "supplement": 0 },
        "code_space": { "ranges": [{ "first": 0, "last": 65535, "len": 2 }] },
        "bf_chars": [{ "code": 5, "value": [65] }],
        "bf_ranges": [{ "first": 1, "last": 9, "target": { "Incrementing": [97] } }]
    }"#;
    let error = serde_json::from_str::<ToUnicodeCMap>(json).unwrap_err();
    assert!(error.to_string().contains("mapped more than once"));

    let valid = json.replace("\"code\": 5", "\"code\": 10");
    let cmap: ToUnicodeCMap = serde_json::from_str(&valid).unwrap();
    assert_eq!(cmap.get(5), Some(UnicodeValue::from('e')));
    assert_eq!(cmap.get(10), Some(UnicodeValue::from('A')));
}
