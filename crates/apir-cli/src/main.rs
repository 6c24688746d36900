use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use apir_core::config::{self, ApirConfig, CONFIG_FILE_NAME};
use apir_core::ir::IrSpec;
use apir_core::parse::{self, spec::OpenApiSpec};
use apir_core::transform::{self, RequiredMode, TransformOptions};

#[derive(Parser)]
#[command(
    name = "apir",
    about = "Reduce an OpenAPI 3.x contract to a language-agnostic IR",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the models and endpoints derived from a contract
    Inspect {
        /// Path to the OpenAPI spec file (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate a contract and report what the pipeline would produce
    Validate {
        /// Path to the OpenAPI spec file (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Initialize a new apir configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Flags that take precedence over `.apir.yaml`.
#[derive(clap::Args)]
struct Overrides {
    /// Content-type family, most preferred first (repeatable)
    #[arg(long = "family")]
    families: Vec<String>,

    /// How optionality and nullability are derived
    #[arg(long)]
    required_mode: Option<ModeArg>,
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Spec,
    All,
}

impl From<ModeArg> for RequiredMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Spec => RequiredMode::Spec,
            ModeArg::All => RequiredMode::All,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            input,
            format,
            overrides,
        } => cmd_inspect(input, format, overrides),

        Commands::Validate { input, overrides } => cmd_validate(input, overrides),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "apir", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Load the project config file from the current directory, or defaults.
fn load_project_config() -> Result<ApirConfig> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    let cfg = config::load_config(&config_path)?;
    if cfg.is_some() {
        log::debug!("loaded {}", config_path.display());
    }
    Ok(cfg.unwrap_or_default())
}

fn resolve_options(cfg: &ApirConfig, overrides: Overrides) -> Result<TransformOptions> {
    let mut options = cfg.to_options()?;
    if !overrides.families.is_empty() {
        options.families = overrides.families;
    }
    if let Some(mode) = overrides.required_mode {
        options.required_mode = mode.into();
    }
    Ok(options)
}

fn read_spec(path: &Path) -> Result<OpenApiSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let parsed = match ext {
        "json" => parse::from_json(&content),
        _ => parse::from_yaml(&content),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

fn load_ir(input: Option<PathBuf>, overrides: Overrides) -> Result<(OpenApiSpec, IrSpec)> {
    let cfg = load_project_config()?;
    let input = input.unwrap_or_else(|| PathBuf::from(&cfg.input));
    let options = resolve_options(&cfg, overrides)?;
    let spec = read_spec(&input)?;
    let ir = transform::transform(&spec, &options)?;
    Ok((spec, ir))
}

fn cmd_inspect(input: Option<PathBuf>, format: InspectFormat, overrides: Overrides) -> Result<()> {
    let (_, ir) = load_ir(input, overrides)?;

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&ir)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&ir)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn cmd_validate(input: Option<PathBuf>, overrides: Overrides) -> Result<()> {
    let (spec, ir) = load_ir(input, overrides)?;

    eprintln!("Valid OpenAPI {} spec: {}", spec.openapi, spec.info.title);
    eprintln!("  Version: {}", spec.info.version);
    eprintln!("  Paths: {}", spec.paths.len());
    eprintln!("  Schemas: {}", spec.catalog().map_or(0, |c| c.len()));
    eprintln!("  Identifiers: {}", ir.identifiers.len());
    eprintln!("  Models: {}", ir.models.len());
    eprintln!("  Endpoints: {}", ir.endpoints.len());

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
