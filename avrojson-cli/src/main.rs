use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use avrojson_core::{Codec, CodecConfig};

#[derive(Parser)]
#[command(name = "avrojson")]
#[command(about = "Convert JSON to and from the Avro binary encoding")]
#[command(version)]
struct Cli {
    /// Codec configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON into binary
    Encode {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Binary output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the binary output as hex text
        #[arg(long)]
        hex: bool,
    },
    /// Decode binary into JSON
    Decode {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Binary input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the binary input as hex text
        #[arg(long)]
        hex: bool,
    },
    /// Show the canonical form and JSON shape of a schema
    Schema {
        /// Schema file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Encode {
            schema,
            input,
            output,
            hex,
        } => {
            let codec = load_codec(schema, config)?;
            let json = read_input(input.as_deref())?;
            let bytes = codec.encode(&json)?;
            tracing::debug!(input = json.len(), output = bytes.len(), "encoded");

            if *hex {
                let mut text = to_hex(&bytes);
                text.push('\n');
                write_output(output.as_deref(), text.as_bytes())?;
            } else {
                write_output(output.as_deref(), &bytes)?;
            }
        }
        Commands::Decode {
            schema,
            input,
            output,
            hex,
        } => {
            let codec = load_codec(schema, config)?;
            let mut bytes = read_input(input.as_deref())?;
            if *hex {
                let text = String::from_utf8(bytes).wrap_err("Hex input is not UTF-8")?;
                bytes = from_hex(&text)?;
            }
            let mut json = codec.decode(&bytes)?;
            tracing::debug!(input = bytes.len(), output = json.len(), "decoded");

            json.push(b'\n');
            write_output(output.as_deref(), &json)?;
        }
        Commands::Schema { file } => {
            show_schema(file)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
    let config: CodecConfig = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(?config, "loaded config");
    Ok(config)
}

fn load_codec(schema: &Path, config: CodecConfig) -> Result<Codec> {
    let text = fs::read_to_string(schema)
        .wrap_err_with(|| format!("Failed to read schema {}", schema.display()))?;
    let codec = Codec::new(&text).wrap_err_with(|| format!("In schema {}", schema.display()))?;
    Ok(codec.with_config(config))
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            fs::read(path).wrap_err_with(|| format!("Failed to read input {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .wrap_err("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => fs::write(path, bytes)
            .wrap_err_with(|| format!("Failed to write output {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn show_schema(file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .wrap_err_with(|| format!("Failed to read schema {}", file.display()))?;
    let codec = Codec::new(&text)?;
    let schema = codec.schema();

    println!("Schema: {}", file.display());
    println!("Type: {}", schema.kind());
    if let Some(name) = schema.name() {
        println!("Name: {}", name);
    }
    println!("Canonical: {}", schema);
    println!("JSON shape: {}", codec.shape());

    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse hex text, ignoring whitespace between digits
fn from_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(eyre!("Hex input has an odd number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).wrap_err("Hex input is not ASCII")?;
            u8::from_str_radix(pair, 16).map_err(|_| eyre!("Invalid hex digits '{}'", pair))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let bytes = vec![0x02, 0x06, b'a', b'b', b'c', 0xf6, 0x01, 0x00];
        let text = to_hex(&bytes);
        assert_eq!(text, "0206616263f60100");
        assert_eq!(from_hex(&text).unwrap(), bytes);
        assert_eq!(from_hex("f6 01\n").unwrap(), vec![0xf6, 0x01]);
    }

    #[test]
    fn test_hex_errors() {
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_decode_args() {
        let cli = Cli::try_parse_from([
            "avrojson", "decode", "--schema", "s.json", "--hex", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        match cli.command {
            Commands::Decode { schema, hex, input, .. } => {
                assert_eq!(schema, PathBuf::from("s.json"));
                assert!(hex);
                assert!(input.is_none());
            }
            _ => panic!("Expected decode command"),
        }
    }
}
