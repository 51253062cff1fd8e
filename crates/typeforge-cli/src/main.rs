//! typeforge CLI - synthesize, compile and inspect types from tabular schemas.

mod build;
mod colors;
mod inspect;
mod source;

use clap::{Parser, Subcommand, ValueEnum};
use typeforge_core::EmissionPath;

#[derive(Parser)]
#[command(name = "typeforge")]
#[command(about = "Synthesize loadable types from tabular schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Compiler input used by `build`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Emit {
    /// Render source text, then compile it
    Source,
    /// Compile type metadata directly
    Metadata,
}

impl From<Emit> for EmissionPath {
    fn from(emit: Emit) -> Self {
        match emit {
            Emit::Source => EmissionPath::Source,
            Emit::Metadata => EmissionPath::Metadata,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated source for a schema
    Source {
        /// Path to the schema (.json file)
        schema: String,

        /// Also generate the view-model
        #[arg(long)]
        view_model: bool,

        /// Write the source to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compile a schema into a module file
    Build {
        /// Path to the schema (.json file)
        schema: String,

        /// Compiler input
        #[arg(long, value_enum, default_value = "metadata")]
        emit: Emit,

        /// Also generate the view-model
        #[arg(long)]
        view_model: bool,

        /// Output path (default: .typeforge/modules next to the schema)
        #[arg(short, long)]
        output: Option<String>,

        /// Print the result and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the types of a compiled module
    Inspect {
        /// Path to the module (.tfm file)
        module: String,

        /// Show only this type
        #[arg(long = "type")]
        type_name: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Source {
            schema,
            view_model,
            output,
        } => source::execute(&schema, view_model, output.as_deref())?,

        Commands::Build {
            schema,
            emit,
            view_model,
            output,
            json,
        } => {
            let options = build::BuildOptions {
                emit: emit.into(),
                view_model,
                output,
                json,
            };
            build::execute(&schema, &options)?;
        }

        Commands::Inspect { module, type_name } => {
            inspect::execute(&module, type_name.as_deref())?;
        }
    }

    Ok(())
}
