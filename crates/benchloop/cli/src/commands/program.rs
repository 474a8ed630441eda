//! Print the encoded benchmark program

use benchloop_core::{encode_program, EncodeOptions, EncodingFormat};
use clap::Args;
use serde::Serialize;

use super::load_benchmark;
use crate::config::BenchConfig;
use crate::error::CliResult;
use crate::output::{print_single, OutputFormat};

#[derive(Args)]
pub struct ProgramArgs {
    /// Built-in benchmark name
    #[arg(short, long, default_value = "matmul")]
    benchmark: String,

    /// Literal format (chisel, verilog); defaults to the configured format
    #[arg(short, long)]
    format: Option<EncodingFormat>,

    /// Append mnemonics as block comments
    #[arg(long)]
    annotate: bool,
}

#[derive(Serialize)]
struct EncodedProgram {
    name: String,
    format: EncodingFormat,
    entries: Vec<String>,
}

pub fn execute(args: ProgramArgs, config: &BenchConfig, format: OutputFormat) -> CliResult<()> {
    let program = load_benchmark(&args.benchmark)?;
    let options = EncodeOptions {
        format: args.format.unwrap_or(config.patch.encoding.format),
        annotate: args.annotate || config.patch.encoding.annotate,
    };
    let entries = encode_program(&program, options);

    match format {
        OutputFormat::Table => {
            for entry in &entries {
                println!("{}", entry);
            }
            Ok(())
        }
        _ => print_single(
            &EncodedProgram {
                name: program.name().to_string(),
                format: options.format,
                entries,
            },
            format,
        ),
    }
}
