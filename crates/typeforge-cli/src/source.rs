//! Source command implementation for typeforge CLI.
//!
//! Renders the module a schema describes without compiling it.

use std::fs;
use std::path::Path;

use anyhow::Context;
use typeforge_core::{SchemaDocument, SynthesisRequest, Synthesizer};

use crate::colors;

/// Print or write the generated source for a schema.
pub fn execute(schema_path: &str, view_model: bool, output: Option<&str>) -> anyhow::Result<()> {
    let doc = load_schema(schema_path)?;
    let request = SynthesisRequest::from_document(&doc).view_model(view_model);
    let text = Synthesizer::default().render_source(&request)?;

    match output {
        Some(out) => {
            fs::write(out, &text).with_context(|| format!("Failed to write {out}"))?;
            println!(
                "{}Wrote{} source for {}{}{} to {}",
                colors::GREEN,
                colors::RESET,
                colors::CYAN,
                doc.name,
                colors::RESET,
                out
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Read a schema document, failing with a readable message when it is missing.
pub fn load_schema(schema_path: &str) -> anyhow::Result<SchemaDocument> {
    let path = Path::new(schema_path);
    if !path.exists() {
        anyhow::bail!("Schema not found: {}", schema_path);
    }
    SchemaDocument::from_path(path).with_context(|| format!("Failed to read schema {schema_path}"))
}
