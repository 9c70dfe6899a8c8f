use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scaffold_core::analysis::suggestions::{file_type, suggest_imports, validate_structure};
use scaffold_core::{BundleWriter, Category, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scaffold")]
#[command(about = "Pattern extraction and code generation for micro_py_framework projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and print the report as JSON
    Analyze {
        /// Project root
        root: PathBuf,
    },
    /// Generate a controller/model/table bundle for a resource
    Generate {
        /// Resource name, e.g. `product`
        resource: String,

        /// Use the authenticated controller template
        #[arg(long)]
        auth: bool,

        /// Also write the bundle under this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Project root (editor state and config)
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Suggest code for a file
    Suggest {
        /// File being edited
        file: PathBuf,

        /// Text to suggest for; defaults to the file's contents
        #[arg(long)]
        context: Option<String>,

        /// Project root (editor state and config)
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print pattern documentation for a category
    Docs {
        /// controller, model, table, helper or interface
        category: String,

        /// Project root to analyze first
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scaffold=info,scaffold_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { root } => run_analyze(root)?,
        Commands::Generate {
            resource,
            auth,
            out,
            root,
        } => run_generate(&resource, auth, out, root)?,
        Commands::Suggest {
            file,
            context,
            root,
        } => run_suggest(file, context, root)?,
        Commands::Docs { category, root } => run_docs(&category, root)?,
    }

    Ok(())
}

fn run_analyze(root: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::open(&root);
    let report = session.analyze_directory(&root);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_generate(
    resource: &str,
    auth: bool,
    out: Option<PathBuf>,
    root: PathBuf,
) -> anyhow::Result<()> {
    let mut session = Session::open(&root);
    let outcome = session.generate_bundle(resource, auth);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "bundle": outcome.bundle,
            "diagnostics": outcome.diagnostics,
        }))?
    );
    if !outcome.succeeded() {
        bail!("generation failed for '{resource}'");
    }
    if let Some(dir) = out {
        let written = BundleWriter::new(&dir)
            .write(&outcome.bundle, resource)
            .with_context(|| format!("writing bundle to {}", dir.display()))?;
        for path in written {
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn run_suggest(file: PathBuf, context: Option<String>, root: PathBuf) -> anyhow::Result<()> {
    let context = match context {
        Some(text) => text,
        None => std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?,
    };
    let name = file.to_string_lossy();
    let mut session = Session::open(&root);
    println!("{}", session.suggest_code(&context, &name));

    if let Some(category) = file_type(&name) {
        for line in suggest_imports(&context, category) {
            eprintln!("hint: {line}");
        }
        for issue in validate_structure(&context, category) {
            eprintln!("{}: {}", issue.severity, issue.message);
        }
    }
    Ok(())
}

fn run_docs(category: &str, root: PathBuf) -> anyhow::Result<()> {
    let Some(category) = Category::parse(category) else {
        bail!("unknown category '{category}'");
    };
    let mut session = Session::open(&root);
    session.analyze_directory(&root);
    print!("{}", session.generate_documentation(category));
    Ok(())
}
