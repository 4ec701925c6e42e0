//! Property-based tests for the schema codecs.
//!
//! Ensures decoding and format detection don't panic on arbitrary input,
//! including random strings and JSON-like fragments carrying SBOM markers.

use proptest::prelude::*;
use sbom_enrich::parsers::{detect_format, parse};

proptest! {
    // Only no-panic is asserted: random input is expected to produce Err.
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn parse_doesnt_panic(s in "\\PC{0,2000}") {
        let result = parse(s.as_bytes(), None);
        prop_assert!(result.is_err(), "Random input should not parse successfully: {:?}", s);
    }

    #[test]
    fn parse_arbitrary_bytes_doesnt_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = parse(&bytes, None);
    }

    #[test]
    fn detect_format_doesnt_panic(s in "\\PC{0,2000}") {
        let _ = detect_format(&s);
    }

    #[test]
    fn json_like_input_doesnt_panic(
        s in prop::string::string_regex(r#"\{[^\}]{0,500}\}"#).unwrap()
    ) {
        let _ = parse(s.as_bytes(), None);
    }

    #[test]
    fn cyclonedx_like_input_doesnt_panic(
        version in "1\\.[0-9]",
        body in "\\PC{0,300}",
    ) {
        let input = format!(
            r#"{{"bomFormat": "CycloneDX", "specVersion": "{version}", "components": [{body}]}}"#
        );
        let _ = parse(input.as_bytes(), None);
        let _ = detect_format(&input);
    }

    #[test]
    fn spdx_like_input_doesnt_panic(
        id in "[A-Za-z0-9-]{0,20}",
        body in "\\PC{0,300}",
    ) {
        let input = format!(
            r#"{{"spdxVersion": "SPDX-2.3", "SPDXID": "SPDXRef-{id}", "packages": [{body}]}}"#
        );
        let _ = parse(input.as_bytes(), None);
        let _ = detect_format(&input);
    }

    #[test]
    fn component_arrays_with_random_fields_dont_panic(
        name in "\\PC{0,40}",
        reference in "\\PC{0,40}",
        target in "\\PC{0,40}",
    ) {
        let input = serde_json::json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.5",
            "components": [{"type": "library", "name": name, "bom-ref": reference}],
            "dependencies": [{"ref": reference, "dependsOn": [target]}],
        })
        .to_string();
        let _ = parse(input.as_bytes(), None);
    }
}
