//! Convert command handler.

use super::read_input;
use crate::model::SchemaFamily;
use crate::parsers::{parse, serialize};
use crate::pipeline::{write_output, OutputTarget};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Re-encode a document in another schema family.
pub fn run_convert(
    input: PathBuf,
    from: Option<SchemaFamily>,
    to: SchemaFamily,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let bytes = read_input(&input)?;
    let document = parse(&bytes, from)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    tracing::info!(
        "Converting {} {} document to {}",
        document.schema,
        document.spec_version,
        to
    );

    let encoded = serialize(&document, to).with_context(|| format!("Failed to encode as {to}"))?;
    let text = String::from_utf8(encoded).context("Encoder produced invalid UTF-8")?;
    write_output(&text, &OutputTarget::from_option(output_file), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_to_spdx_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("app.cdx.json");
        std::fs::write(
            &input,
            r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
                "components": [{"type": "library", "name": "lib", "version": "1.0", "bom-ref": "lib"}]}"#,
        )
        .unwrap();
        let output = dir.path().join("app.spdx.json");

        run_convert(input, None, SchemaFamily::Spdx, Some(output.clone())).unwrap();

        let converted = parse(&std::fs::read(output).unwrap(), None).unwrap();
        assert_eq!(converted.schema, SchemaFamily::Spdx);
        assert_eq!(converted.component_count(), 1);
    }

    #[test]
    fn test_convert_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("junk.json");
        std::fs::write(&input, "{}").unwrap();
        let err = run_convert(input, None, SchemaFamily::Spdx, None).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
    }
}
