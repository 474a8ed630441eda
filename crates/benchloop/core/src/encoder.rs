//! Renders a program as initializer entries for the CPU's instruction memory.

use std::str::FromStr;

use benchloop_types::{Instruction, ParseKindError, Program};
use serde::{Deserialize, Serialize};

/// Literal syntax of the target source language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// `"h200001B7".U(32.W)`
    #[default]
    Chisel,
    /// `32'h200001B7`
    Verilog,
}

impl std::fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chisel => write!(f, "chisel"),
            Self::Verilog => write!(f, "verilog"),
        }
    }
}

impl FromStr for EncodingFormat {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chisel" => Ok(Self::Chisel),
            "verilog" => Ok(Self::Verilog),
            other => Err(ParseKindError {
                kind: "encoding format",
                value: other.to_string(),
            }),
        }
    }
}

/// Encoder settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    #[serde(default)]
    pub format: EncodingFormat,
    /// Append each mnemonic as a `/* ... */` comment. Block comments keep
    /// the separator the patcher inserts between entries intact.
    #[serde(default)]
    pub annotate: bool,
}

/// One literal per instruction, in program order, without separators.
pub fn encode_program(program: &Program, options: EncodeOptions) -> Vec<String> {
    program
        .instructions()
        .iter()
        .map(|inst| encode_instruction(inst, options))
        .collect()
}

/// A single instruction literal.
pub fn encode_instruction(inst: &Instruction, options: EncodeOptions) -> String {
    let literal = match options.format {
        EncodingFormat::Chisel => format!("\"h{:08X}\".U(32.W)", inst.word()),
        EncodingFormat::Verilog => format!("32'h{:08X}", inst.word()),
    };
    if options.annotate && !inst.comment().is_empty() {
        format!("{} /* {} */", literal, inst.comment().replace("*/", "* /"))
    } else {
        literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks;
    use proptest::prelude::*;

    #[test]
    fn chisel_literals_match_matmul() {
        let lines = encode_program(&benchmarks::matmul().unwrap(), EncodeOptions::default());
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "\"h200001B7\".U(32.W)");
        assert_eq!(lines[12], "\"h0000006F\".U(32.W)");
    }

    #[test]
    fn verilog_literals() {
        let options = EncodeOptions {
            format: EncodingFormat::Verilog,
            annotate: false,
        };
        let lines = encode_program(&benchmarks::matmul().unwrap(), options);
        assert_eq!(lines[1], "32'h00A00093");
    }

    #[test]
    fn annotated_entries_use_block_comments() {
        let options = EncodeOptions {
            format: EncodingFormat::Chisel,
            annotate: true,
        };
        let inst = Instruction::new(0x0000_006F, "JAL x0, 0 (Halt)");
        assert_eq!(
            encode_instruction(&inst, options),
            "\"h0000006F\".U(32.W) /* JAL x0, 0 (Halt) */"
        );
        let sneaky = Instruction::new(0x0000_006F, "halt */ oops");
        assert!(!encode_instruction(&sneaky, options).contains("*/ oops"));
    }

    #[test]
    fn format_parse() {
        assert_eq!("Verilog".parse::<EncodingFormat>().unwrap(), EncodingFormat::Verilog);
        assert!("vhdl".parse::<EncodingFormat>().is_err());
    }

    fn arb_program() -> impl Strategy<Value = Program> {
        prop::collection::vec((any::<u32>(), "[A-Za-z0-9 ,()]{0,20}"), 0..32).prop_map(|body| {
            let mut insts: Vec<Instruction> = body
                .into_iter()
                .map(|(w, c)| Instruction::new(w, c))
                .collect();
            insts.push(Instruction::new(0x0000_006F, "JAL x0, 0"));
            Program::new("prop", insts).unwrap()
        })
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(program in arb_program(), annotate in any::<bool>()) {
            let options = EncodeOptions { format: EncodingFormat::Chisel, annotate };
            let a = encode_program(&program, options);
            let b = encode_program(&program, options);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len(), program.len());
        }

        #[test]
        fn entries_follow_program_order(program in arb_program()) {
            let lines = encode_program(&program, EncodeOptions::default());
            for (line, word) in lines.iter().zip(program.words()) {
                let expected = format!("\"h{:08X}\".U(32.W)", word);
                prop_assert_eq!(line, &expected);
            }
        }
    }
}
