use hexlink::codec::{decode, encode, format_hex, normalize};
use hexlink::HexLinkError;
use proptest::prelude::*;

/// Hex text with random case and random whitespace between digits.
fn spaced_hex() -> impl Strategy<Value = String> {
    prop::collection::vec(
        ("[0-9a-fA-F]{2}", prop::sample::select(vec!["", " ", "  ", "\t", "\n"])),
        1..32,
    )
    .prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(pair, gap)| format!("{}{}", pair, gap))
            .collect()
    })
}

proptest! {
    #[test]
    fn round_trip_matches_display_form(text in spaced_hex()) {
        let bytes = encode(&text).unwrap();
        prop_assert_eq!(decode(&bytes), format_hex(&text));
        prop_assert_eq!(normalize(&decode(&bytes)), normalize(&text));
    }

    #[test]
    fn any_bytes_survive_decode_then_encode(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let text = decode(&bytes);
        prop_assert_eq!(text.len(), bytes.len() * 3 - 1);
        prop_assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn odd_digit_count_is_rejected(text in "[0-9a-fA-F]{1}([0-9a-fA-F]{2}){0,16}") {
        prop_assert!(matches!(encode(&text), Err(HexLinkError::InvalidHex(_))));
    }

    #[test]
    fn non_hex_character_is_rejected(prefix in "([0-9A-F]{2}){0,4}", bad in "[g-zG-Z]") {
        let text = format!("{}{}0", prefix, bad);
        prop_assert!(matches!(encode(&text), Err(HexLinkError::InvalidHex(_))));
    }
}

#[test]
fn known_examples() {
    assert!(matches!(encode("A"), Err(HexLinkError::InvalidHex(_))));
    assert!(matches!(encode("ZZ"), Err(HexLinkError::InvalidHex(_))));
    assert!(matches!(encode("   "), Err(HexLinkError::InvalidHex(_))));
    assert_eq!(decode(&[]), "");
    assert_eq!(decode(&encode("a0 01 01 a2").unwrap()), "A0 01 01 A2");
}
