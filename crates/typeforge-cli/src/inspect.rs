//! Inspect command implementation for typeforge CLI.

use std::path::Path;

use typeforge_core::LoadedModule;

use crate::colors;

/// Load a module file and list its types.
pub fn execute(module_path: &str, type_filter: Option<&str>) -> anyhow::Result<()> {
    let path = Path::new(module_path);
    if !path.exists() {
        anyhow::bail!("Module not found: {}", module_path);
    }

    let mut module = LoadedModule::load_from_path(path, "inspect")?;
    println!(
        "{}Module{} {}",
        colors::BOLD,
        colors::RESET,
        module.module_name()
    );

    let names = match type_filter {
        Some(name) => vec![module.get_type(name)?.full_name()],
        None => module.type_names()?,
    };

    for name in &names {
        let handle = module.get_type(name)?;
        let def = handle.definition();
        println!("\n{}{}{}", colors::CYAN, handle.full_name(), colors::RESET);
        if !def.interfaces.is_empty() {
            println!("  {}implements{} {}", colors::DIM, colors::RESET, def.interfaces.join(", "));
        }
        for prop in &def.properties {
            println!("  property {}: {}", prop.name, prop.ty.rust_type());
        }
        for method in handle.method_names() {
            println!("  method {method}");
        }
    }

    module.dispose();
    Ok(())
}
