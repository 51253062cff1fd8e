//! Build command implementation for typeforge CLI.
//!
//! Compiles a schema into a module file and loads it once to check it.

use std::path::Path;
use std::time::Instant;

use typeforge_core::paths::ForgeDirs;
use typeforge_core::{
    Diagnostic, EmissionPath, Error, SynthesisConfig, SynthesisRequest, Synthesizer,
};

use crate::colors;
use crate::source::load_schema;

/// Options of the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub emit: EmissionPath,
    pub view_model: bool,
    pub output: Option<String>,
    pub json: bool,
}

/// Build a schema into a module.
pub fn execute(schema_path: &str, options: &BuildOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let doc = load_schema(schema_path)?;

    let mut request = SynthesisRequest::from_document(&doc)
        .view_model(options.view_model)
        .emit(options.emit);
    let config = match &options.output {
        Some(out) => {
            request = request.output(out);
            SynthesisConfig::default()
        }
        None => SynthesisConfig::for_dirs(&ForgeDirs::from_schema_path(Path::new(schema_path))?),
    };

    if !options.json {
        println!(
            "\n{}typeforge{} - Building {}{}{} ({} path)\n",
            colors::BOLD,
            colors::RESET,
            colors::CYAN,
            doc.name,
            colors::RESET,
            options.emit
        );
    }

    let mut synthesis = match Synthesizer::new(config).synthesize(&request) {
        Ok(synthesis) => synthesis,
        Err(Error::Compilation {
            module,
            diagnostics,
        }) => {
            report_failure(&diagnostics, options.json);
            anyhow::bail!("Compilation of {} failed", module);
        }
        Err(e) => return Err(e.into()),
    };

    let warnings = synthesis
        .compiled()
        .map(|c| c.warnings.clone())
        .unwrap_or_default();
    let path = synthesis
        .persisted_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let types = synthesis.module()?.type_names()?;

    if options.json {
        let result = serde_json::json!({
            "success": true,
            "module": synthesis.module_name(),
            "path": path,
            "types": types,
            "diagnostics": warnings.iter().map(Diagnostic::to_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for warning in &warnings {
            eprint!("{}", warning.format_terminal());
        }
        for name in &types {
            println!("  {}◆{} {}", colors::CYAN, colors::RESET, name);
        }
        println!(
            "\n{}Built{} {} in {:.2}s",
            colors::GREEN,
            colors::RESET,
            path,
            start.elapsed().as_secs_f64()
        );
    }

    synthesis.unload(false)?;
    Ok(())
}

fn report_failure(diagnostics: &[Diagnostic], json: bool) {
    if json {
        let result = serde_json::json!({
            "success": false,
            "diagnostics": diagnostics.iter().map(Diagnostic::to_json).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::warn!("Failed to encode diagnostics: {}", e),
        }
        return;
    }

    eprintln!(
        "{}{} diagnostic(s):{}",
        colors::RED,
        diagnostics.len(),
        colors::RESET
    );
    for diag in diagnostics {
        eprint!("{}", diag.format_terminal());
    }
}
