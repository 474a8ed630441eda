//! Built-in benchmark programs.

use benchloop_types::{Instruction, Program, ProgramError, ProgramResult};

/// Names accepted by [`by_name`].
pub const NAMES: [&str; 1] = ["matmul"];

/// The default RV32I workload.
///
/// Spins an add/decrement loop 100 times, waits for the UART transmitter,
/// writes `'D'` and halts.
pub fn matmul() -> ProgramResult<Program> {
    Program::new(
        "matmul",
        vec![
            Instruction::new(0x2000_01B7, "LUI x3, 0x20000 (UART Base)"),
            Instruction::new(0x00A0_0093, "ADDI x1, x0, 10"),
            Instruction::new(0x0140_0113, "ADDI x2, x0, 20"),
            Instruction::new(0x0640_0293, "ADDI x5, x0, 100"),
            Instruction::new(0x0020_8233, "ADD x4, x1, x2"),
            Instruction::new(0xFFF2_8293, "ADDI x5, x5, -1"),
            Instruction::new(0xFE02_9CE3, "BNE x5, x0, -4"),
            Instruction::new(0x0041_A303, "LW x6, 4(x3) (Read Status)"),
            Instruction::new(0x0023_7313, "ANDI x6, x6, 2 (Check TX Ready)"),
            Instruction::new(0xFE03_0CE3, "BEQ x6, x0, -8"),
            Instruction::new(0x0440_0393, "ADDI x7, x0, 68 ('D')"),
            Instruction::new(0x0071_A023, "SW x7, 0(x3)"),
            Instruction::new(0x0000_006F, "JAL x0, 0 (Halt)"),
        ],
    )
}

/// Look up a built-in benchmark.
pub fn by_name(name: &str) -> ProgramResult<Program> {
    match name {
        "matmul" => matmul(),
        other => Err(ProgramError::UnknownBenchmark(other.to_string())),
    }
}
