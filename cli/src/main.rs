use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ktv::{
    compile_lines, decode_value, describe_to_json, encode_value, load_tree, value_from_json,
    value_to_json,
};
use ktv::error::KtvError;

#[derive(Parser)]
#[command(name = "ktvc")]
#[command(about = "Compile KTV schemas and inspect descriptors and data buffers", long_about = None)]
struct Cli {
    /// Log the parsed models and each model's bytes (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema file to a binary descriptor
    Compile {
        /// Input schema file
        input: PathBuf,

        /// Output descriptor (defaults to the input path + `.bin`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a binary descriptor as JSON (printed to stdout)
    Describe {
        /// Input descriptor
        input: PathBuf,

        /// Print in schema syntax with type bytes instead of JSON
        #[arg(long)]
        tree: bool,
    },

    /// Decode a data buffer to JSON (printed to stdout)
    Decode {
        /// Descriptor describing the data
        #[arg(short, long)]
        schema: PathBuf,

        /// Model of the top-level object
        #[arg(short, long)]
        model: String,

        /// Input data buffer
        input: PathBuf,
    },

    /// Encode a JSON object to a data buffer
    Encode {
        /// Descriptor describing the data
        #[arg(short, long)]
        schema: PathBuf,

        /// Model of the top-level object
        #[arg(short, long)]
        model: String,

        /// Input JSON file
        input: PathBuf,

        /// Output data buffer (defaults to the input path + `.bin`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), KtvError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Compile { input, output } => {
            let text = fs::read_to_string(input)?;
            let compiled = compile_lines(text.lines())?;

            if let Ok(models) = serde_json::to_string(&compiled.schema.models) {
                debug!(models = %models, "parsed schema");
            }
            for (model, run) in compiled.schema.models.iter().zip(&compiled.model_runs) {
                debug!(model = %model.name, bytes = %to_hex(run), "encoded model");
            }

            let out_path = output.clone().unwrap_or_else(|| with_bin_suffix(input));
            fs::write(&out_path, &compiled.bytes)?;
            info!(
                models = compiled.schema.models.len(),
                size = compiled.bytes.len(),
                "compiled {} → {}",
                input.display(),
                out_path.display()
            );
            Ok(())
        }

        Commands::Describe { input, tree } => {
            let data = fs::read(input)?;
            if *tree {
                print!("{}", load_tree(&data)?);
            } else {
                println!("{}", describe_to_json(&data)?);
            }
            Ok(())
        }

        Commands::Decode { schema, model, input } => {
            let tree = load_tree(&fs::read(schema)?)?;
            let data = fs::read(input)?;
            let value = decode_value(&tree, model, &data)?;
            let json = serde_json::to_string_pretty(&value_to_json(&value))
                .map_err(|e| KtvError::Json(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }

        Commands::Encode { schema, model, input, output } => {
            let tree = load_tree(&fs::read(schema)?)?;
            let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(input)?)
                .map_err(|e| KtvError::Json(e.to_string()))?;
            let value = value_from_json(&tree, model, &json)?;
            let bytes = encode_value(&tree, &value)?;
            debug!(model = %model, bytes = %to_hex(&bytes), "encoded object");

            let out_path = output.clone().unwrap_or_else(|| with_bin_suffix(input));
            fs::write(&out_path, &bytes)?;
            info!(size = bytes.len(), "encoded {} → {}", input.display(), out_path.display());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `schema.ktv` → `schema.ktv.bin`
fn with_bin_suffix(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".bin");
    PathBuf::from(name)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_with_bin_suffix() {
        assert_eq!(with_bin_suffix(Path::new("dir/user.ktv")), PathBuf::from("dir/user.ktv.bin"));
        assert_eq!(with_bin_suffix(Path::new("schema")), PathBuf::from("schema.bin"));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x02, 0x04, 0x55]), "02 04 55");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_parse_compile_args() {
        let cli = Cli::try_parse_from(["ktvc", "-v", "compile", "user.ktv", "-o", "out.bin"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Compile { input, output } => {
                assert_eq!(input, PathBuf::from("user.ktv"));
                assert_eq!(output, Some(PathBuf::from("out.bin")));
            }
            _ => panic!("expected the compile subcommand"),
        }
    }
}
