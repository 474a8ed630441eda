//! Benchmark programs and the source region they are injected into.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ProgramError, ProgramResult};

const OPCODE_MASK: u32 = 0x7F;
const OPCODE_JAL: u32 = 0x6F;
const OPCODE_BRANCH: u32 = 0x63;

// ── Instruction ─────────────────────────────────────────────────────

/// One encoded machine word and the mnemonic it was assembled from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    word: u32,
    comment: String,
}

impl Instruction {
    pub fn new(word: u32, comment: impl Into<String>) -> Self {
        Self {
            word,
            comment: comment.into(),
        }
    }

    pub fn word(&self) -> u32 {
        self.word
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Whether this word keeps the core spinning in place.
    ///
    /// Recognizes the RV32I self-loops `JAL xN, 0` and `BEQ xN, xN, 0`.
    pub fn is_terminator(&self) -> bool {
        let w = self.word;
        match w & OPCODE_MASK {
            OPCODE_JAL => w >> 12 == 0,
            OPCODE_BRANCH => {
                let funct3 = (w >> 12) & 0x7;
                let rs1 = (w >> 15) & 0x1F;
                let rs2 = (w >> 20) & 0x1F;
                let imm_hi = w >> 25;
                let imm_lo = (w >> 7) & 0x1F;
                funct3 == 0 && rs1 == rs2 && imm_hi == 0 && imm_lo == 0
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}  {}", self.word, self.comment)
    }
}

// ── Program ─────────────────────────────────────────────────────────

/// An ordered, non-empty instruction sequence ending in a terminator.
///
/// Index order is load order: instruction `i` occupies memory word `i`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProgram")]
pub struct Program {
    name: String,
    instructions: Vec<Instruction>,
}

#[derive(Deserialize)]
struct RawProgram {
    name: String,
    instructions: Vec<Instruction>,
}

impl TryFrom<RawProgram> for Program {
    type Error = ProgramError;

    fn try_from(raw: RawProgram) -> ProgramResult<Self> {
        Program::new(raw.name, raw.instructions)
    }
}

impl Program {
    /// Validate and build a program.
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> ProgramResult<Self> {
        let name = name.into();
        let last = instructions
            .last()
            .ok_or_else(|| ProgramError::Empty(name.clone()))?;
        if !last.is_terminator() {
            return Err(ProgramError::MissingTerminator {
                last: last.word(),
                name,
            });
        }
        Ok(Self { name, instructions })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always false for a constructed program; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.instructions.iter().map(Instruction::word)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Program({}, {} words)", self.name, self.instructions.len())
    }
}

// ── Patch Target ────────────────────────────────────────────────────

/// A source file and the marker pair delimiting the program literal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchTarget {
    pub path: PathBuf,
    pub start_marker: String,
    pub end_marker: String,
}

impl PatchTarget {
    pub fn new(
        path: impl Into<PathBuf>,
        start_marker: impl Into<String>,
        end_marker: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
        }
    }
}

impl std::fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} .. {}]",
            self.path.display(),
            self.start_marker,
            self.end_marker
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halt() -> Instruction {
        Instruction::new(0x0000_006F, "JAL x0, 0 (Halt)")
    }

    #[test]
    fn jal_self_loop_is_terminator() {
        assert!(halt().is_terminator());
        // JAL x1, 0 still spins in place
        assert!(Instruction::new(0x0000_00EF, "JAL x1, 0").is_terminator());
    }

    #[test]
    fn beq_self_branch_is_terminator() {
        assert!(Instruction::new(0x0000_0063, "BEQ x0, x0, 0").is_terminator());
    }

    #[test]
    fn ordinary_words_are_not_terminators() {
        let add = Instruction::new(0x0020_8233, "ADD x4, x1, x2");
        let bne = Instruction::new(0xFE02_9CE3, "BNE x5, x0, -8");
        let jal_fwd = Instruction::new(0x0080_006F, "JAL x0, 8");
        assert!(!add.is_terminator());
        assert!(!bne.is_terminator());
        assert!(!jal_fwd.is_terminator());
    }

    #[test]
    fn program_requires_instructions() {
        let err = Program::new("empty", vec![]).unwrap_err();
        assert_eq!(err, ProgramError::Empty("empty".into()));
    }

    #[test]
    fn program_requires_terminator() {
        let err = Program::new("open", vec![Instruction::new(0x0020_8233, "ADD")]).unwrap_err();
        assert!(matches!(err, ProgramError::MissingTerminator { last: 0x0020_8233, .. }));
    }

    #[test]
    fn program_keeps_load_order() {
        let p = Program::new(
            "tiny",
            vec![Instruction::new(0x00A0_0093, "ADDI x1, x0, 10"), halt()],
        )
        .unwrap();
        assert_eq!(p.words().collect::<Vec<_>>(), vec![0x00A0_0093, 0x0000_006F]);
        assert_eq!(p.len(), 2);
        assert!(!p.is_empty());
        assert_eq!(p.to_string(), "Program(tiny, 2 words)");
    }

    #[test]
    fn deserialize_validates() {
        let bad = r#"{"name":"x","instructions":[{"word":1,"comment":"nop"}]}"#;
        assert!(serde_json::from_str::<Program>(bad).is_err());

        let good = r#"{"name":"x","instructions":[{"word":111,"comment":"halt"}]}"#;
        let p: Program = serde_json::from_str(good).unwrap();
        assert_eq!(p.name(), "x");
    }

    #[test]
    fn instruction_display_is_hex() {
        assert_eq!(halt().to_string(), "0000006F  JAL x0, 0 (Halt)");
    }

    #[test]
    fn patch_target_display() {
        let t = PatchTarget::new("Memory.scala", "val program = VecInit(Seq(", "))");
        assert_eq!(t.to_string(), "Memory.scala [val program = VecInit(Seq( .. ))]");
    }
}
