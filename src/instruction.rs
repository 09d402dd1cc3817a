//! Instruction descriptors and the 16/32-bit decoders that produce them.

use crate::registers::Specifier;
use thiserror::Error;

/// Data structure that can hold any supported instruction in its decoded
/// form.
///
/// Compressed (16-bit) instructions decode to the descriptor of the 32-bit
/// operation they are an encoding of, so the execution unit never needs to
/// know which encoding an instruction arrived in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    OpImm {
        op: RegImmOp,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
    },
    OpShiftImm {
        op: RegShiftImmOp,
        dest: Specifier,
        src: Specifier,
        shift_amount_u5: u32,
    },
    Auipc {
        dest: Specifier,
        immediate: i32,
    },
    Lui {
        dest: Specifier,
        immediate: i32,
    },
    Op {
        op: RegRegOp,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    Jal {
        dest: Specifier,
        offset: i32,
    },
    Jalr {
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Branch {
        condition: BranchCondition,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
    },
    Load {
        width: LoadWidth,
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Store {
        width: StoreWidth,
        src: Specifier,
        base: Specifier,
        offset: i32,
    },
    /// An A-extension memory operation. `addr` names the register holding
    /// the memory address, `src` the register providing the operand.
    Amo {
        op: AmoOp,
        dest: Specifier,
        addr: Specifier,
        src: Specifier,
    },
    /// Memory ordering fence. With a single hart and no caches this retires
    /// as a no-op, so the predecessor/successor sets are not preserved.
    Fence,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegShiftImmOp {
    Slli,
    Srli,
    Srai,
}

/// Register-register operations: the base integer set (funct7 `0b0000000`
/// and `0b0100000`) plus the M-extension set (funct7 `0b0000001`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BranchCondition {
    Beq,
    Bne,
    Blt,
    Bltu,
    Bge,
    Bgeu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
}

/// Word-size A-extension operations (funct5 of the AMO opcode class).
/// The aq/rl ordering bits are ignored: a single hart observes its own
/// accesses in program order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AmoOp {
    Lr,
    Sc,
    Swap,
    Add,
    Xor,
    And,
    Or,
    Min,
    Max,
    Minu,
    Maxu,
}

/// Returns `true` if the halfword fetched at the program counter starts a
/// 16-bit compressed instruction.
///
/// > Instructions with the two least-significant bits set to 11 are 32 bits
/// > long; the 16-bit formats use the remaining three values.
pub fn is_compressed(first_halfword: u16) -> bool {
    first_halfword & 0b11 != 0b11
}

impl Instruction {
    /// Decodes a full 32-bit instruction.
    pub fn decode(raw_instruction: u32) -> Result<Self, DecodeError> {
        match opcode(raw_instruction).ok_or(DecodeError::UnsupportedOpcode)? {
            Opcode::OpImm => match i_funct(raw_instruction) {
                Some(op) => Ok(Self::OpImm {
                    op,
                    dest: rd(raw_instruction),
                    src: rs1(raw_instruction),
                    immediate: i_imm(raw_instruction),
                }),
                None => match i_shfunct(raw_instruction) {
                    Some(op) => Ok(Self::OpShiftImm {
                        op,
                        dest: rd(raw_instruction),
                        src: rs1(raw_instruction),
                        shift_amount_u5: shamt(raw_instruction),
                    }),
                    None => Err(DecodeError::UnsupportedFunction),
                },
            },
            Opcode::Auipc => Ok(Self::Auipc {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Lui => Ok(Self::Lui {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Op => match r_funct(raw_instruction) {
                Some(op) => Ok(Self::Op {
                    op,
                    dest: rd(raw_instruction),
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                }),
                None => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::Jal => Ok(Self::Jal {
                dest: rd(raw_instruction),
                offset: j_imm(raw_instruction),
            }),
            Opcode::Jalr => match funct3(raw_instruction) {
                0b000 => Ok(Self::Jalr {
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                }),
                _ => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::Branch => match b_funct(raw_instruction) {
                Some(condition) => Ok(Self::Branch {
                    condition,
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                    offset: b_imm(raw_instruction),
                }),
                None => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::Load => match i_width(raw_instruction) {
                Some(width) => Ok(Self::Load {
                    width,
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                }),
                None => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::Store => match s_width(raw_instruction) {
                Some(width) => Ok(Self::Store {
                    width,
                    src: rs2(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: s_imm(raw_instruction),
                }),
                None => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::Amo => match a_funct(raw_instruction) {
                Some(op) => Ok(Self::Amo {
                    op,
                    dest: rd(raw_instruction),
                    addr: rs1(raw_instruction),
                    src: rs2(raw_instruction),
                }),
                None => Err(DecodeError::UnsupportedFunction),
            },
            Opcode::MiscMem => match funct3(raw_instruction) {
                // All unused FENCE fields (fm, pred, succ, rd, rs1) are
                // reserved for future use and must be treated as a normal
                // fence for forward compatibility, so none of them are
                // inspected here.
                0b000 => Ok(Self::Fence),
                _ => Err(DecodeError::UnsupportedFunction),
            },
        }
    }

    /// Decodes a 16-bit compressed instruction into the descriptor of its
    /// 32-bit equivalent.
    ///
    /// The RV32 integer subset of the C extension is supported. Reserved
    /// encodings, the floating-point forms, and C.EBREAK (this machine has
    /// no trap vectors) are rejected. HINT code points (writes to `x0`
    /// through otherwise-valid forms) decode normally and retire as no-ops
    /// through the hardwired-zero rule.
    pub fn decode_compressed(raw_instruction: u16) -> Result<Self, DecodeError> {
        let quadrant = raw_instruction & 0b11;
        match (quadrant, c_funct3(raw_instruction)) {
            (0b00, 0b000) => match ciw_imm(raw_instruction) {
                // The all-zero immediate is reserved; this also rejects the
                // all-zero instruction, which is defined to be illegal.
                0 => Err(DecodeError::ReservedCompressed),
                imm => Ok(Self::OpImm {
                    op: RegImmOp::Addi,
                    dest: c_rd_short(raw_instruction),
                    src: Specifier::SP,
                    immediate: imm as i32,
                }),
            },
            (0b00, 0b010) => Ok(Self::Load {
                width: LoadWidth::Lw,
                dest: c_rd_short(raw_instruction),
                base: c_rs1_short(raw_instruction),
                offset: cl_imm(raw_instruction) as i32,
            }),
            (0b00, 0b110) => Ok(Self::Store {
                width: StoreWidth::Sw,
                src: c_rd_short(raw_instruction),
                base: c_rs1_short(raw_instruction),
                offset: cl_imm(raw_instruction) as i32,
            }),
            (0b01, 0b000) => {
                // C.ADDI, including C.NOP (dest = x0).
                let dest = c_rd_full(raw_instruction);
                Ok(Self::OpImm {
                    op: RegImmOp::Addi,
                    dest,
                    src: dest,
                    immediate: ci_imm(raw_instruction),
                })
            }
            (0b01, 0b001) => Ok(Self::Jal {
                dest: Specifier::RA,
                offset: cj_imm(raw_instruction),
            }),
            (0b01, 0b010) => Ok(Self::OpImm {
                op: RegImmOp::Addi,
                dest: c_rd_full(raw_instruction),
                src: Specifier::X0,
                immediate: ci_imm(raw_instruction),
            }),
            (0b01, 0b011) => {
                let dest = c_rd_full(raw_instruction);
                if dest == Specifier::SP {
                    // C.ADDI16SP
                    match ci16sp_imm(raw_instruction) {
                        0 => Err(DecodeError::ReservedCompressed),
                        imm => Ok(Self::OpImm {
                            op: RegImmOp::Addi,
                            dest: Specifier::SP,
                            src: Specifier::SP,
                            immediate: imm,
                        }),
                    }
                } else {
                    // C.LUI
                    match ci_imm(raw_instruction) {
                        0 => Err(DecodeError::ReservedCompressed),
                        imm => Ok(Self::Lui {
                            dest,
                            immediate: imm << 12,
                        }),
                    }
                }
            }
            (0b01, 0b100) => {
                let dest = c_rs1_short(raw_instruction);
                match (raw_instruction >> 10) & 0b11 {
                    0b00 => Ok(Self::OpShiftImm {
                        op: RegShiftImmOp::Srli,
                        dest,
                        src: dest,
                        shift_amount_u5: c_shamt(raw_instruction)?,
                    }),
                    0b01 => Ok(Self::OpShiftImm {
                        op: RegShiftImmOp::Srai,
                        dest,
                        src: dest,
                        shift_amount_u5: c_shamt(raw_instruction)?,
                    }),
                    0b10 => Ok(Self::OpImm {
                        op: RegImmOp::Andi,
                        dest,
                        src: dest,
                        immediate: ci_imm(raw_instruction),
                    }),
                    0b11 => {
                        if raw_instruction & 0x1000 != 0 {
                            // C.SUBW/C.ADDW exist on RV64 only.
                            return Err(DecodeError::UnsupportedCompressed);
                        }
                        let op = match (raw_instruction >> 5) & 0b11 {
                            0b00 => RegRegOp::Sub,
                            0b01 => RegRegOp::Xor,
                            0b10 => RegRegOp::Or,
                            _ => RegRegOp::And,
                        };
                        Ok(Self::Op {
                            op,
                            dest,
                            src1: dest,
                            src2: c_rs2_short(raw_instruction),
                        })
                    }
                    _ => unreachable!(),
                }
            }
            (0b01, 0b101) => Ok(Self::Jal {
                dest: Specifier::X0,
                offset: cj_imm(raw_instruction),
            }),
            (0b01, 0b110) => Ok(Self::Branch {
                condition: BranchCondition::Beq,
                src1: c_rs1_short(raw_instruction),
                src2: Specifier::X0,
                offset: cb_imm(raw_instruction),
            }),
            (0b01, 0b111) => Ok(Self::Branch {
                condition: BranchCondition::Bne,
                src1: c_rs1_short(raw_instruction),
                src2: Specifier::X0,
                offset: cb_imm(raw_instruction),
            }),
            (0b10, 0b000) => {
                let dest = c_rd_full(raw_instruction);
                Ok(Self::OpShiftImm {
                    op: RegShiftImmOp::Slli,
                    dest,
                    src: dest,
                    shift_amount_u5: c_shamt(raw_instruction)?,
                })
            }
            (0b10, 0b010) => {
                let dest = c_rd_full(raw_instruction);
                if dest == Specifier::X0 {
                    return Err(DecodeError::ReservedCompressed);
                }
                Ok(Self::Load {
                    width: LoadWidth::Lw,
                    dest,
                    base: Specifier::SP,
                    offset: clwsp_imm(raw_instruction) as i32,
                })
            }
            (0b10, 0b100) => {
                let first = c_rd_full(raw_instruction);
                let second = c_rs2_full(raw_instruction);
                match (raw_instruction & 0x1000 != 0, second == Specifier::X0) {
                    (false, true) => {
                        // C.JR; base = x0 is reserved.
                        if first == Specifier::X0 {
                            return Err(DecodeError::ReservedCompressed);
                        }
                        Ok(Self::Jalr {
                            dest: Specifier::X0,
                            base: first,
                            offset: 0,
                        })
                    }
                    (false, false) => Ok(Self::Op {
                        op: RegRegOp::Add,
                        dest: first,
                        src1: Specifier::X0,
                        src2: second,
                    }),
                    (true, true) => {
                        if first == Specifier::X0 {
                            // C.EBREAK; no trap support in this subset.
                            return Err(DecodeError::UnsupportedCompressed);
                        }
                        Ok(Self::Jalr {
                            dest: Specifier::RA,
                            base: first,
                            offset: 0,
                        })
                    }
                    (true, false) => Ok(Self::Op {
                        op: RegRegOp::Add,
                        dest: first,
                        src1: first,
                        src2: second,
                    }),
                }
            }
            (0b10, 0b110) => Ok(Self::Store {
                width: StoreWidth::Sw,
                src: c_rs2_full(raw_instruction),
                base: Specifier::SP,
                offset: cswsp_imm(raw_instruction) as i32,
            }),
            // Remaining rows are the floating-point and RV64 load/store
            // forms.
            _ => Err(DecodeError::UnsupportedCompressed),
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("instruction has unsupported opcode")]
    UnsupportedOpcode,
    #[error("instruction has unsupported function code")]
    UnsupportedFunction,
    #[error("compressed instruction form is not supported")]
    UnsupportedCompressed,
    #[error("compressed encoding is reserved")]
    ReservedCompressed,
}

/// Returns the 7-bit *opcode* value of the instruction, or `None` if it
/// isn't supported.
#[allow(clippy::unusual_byte_groupings)]
fn opcode(raw_instruction: u32) -> Option<Opcode> {
    match raw_instruction & 0x7F {
        0b00_000_11 => Some(Opcode::Load),
        // LoadFp: no floating point
        0b00_011_11 => Some(Opcode::MiscMem),
        0b00_100_11 => Some(Opcode::OpImm),
        0b00_101_11 => Some(Opcode::Auipc),
        0b01_000_11 => Some(Opcode::Store),
        // StoreFp: no floating point
        0b01_011_11 => Some(Opcode::Amo),
        0b01_100_11 => Some(Opcode::Op),
        0b01_101_11 => Some(Opcode::Lui),
        0b11_000_11 => Some(Opcode::Branch),
        0b11_001_11 => Some(Opcode::Jalr),
        0b11_011_11 => Some(Opcode::Jal),
        // System (ECALL/EBREAK/Zicsr): no trap vectors or CSRs in this
        // machine, so the whole opcode is outside the supported subset.
        _ => None,
    }
}

/// Returns the 5-bit *rd* value for R-type, I-type, U-type, J-type
/// instructions.
fn rd(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 7) & 0x1F) as u8)
}

/// Returns the 5-bit *rs1* value for R-type, I-type, S-type, B-type
/// instructions.
fn rs1(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 15) & 0x1F) as u8)
}

/// Returns the 5-bit *rs2* value for R-type, S-type, B-type instructions.
fn rs2(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 20) & 0x1F) as u8)
}

fn i_funct(raw_instruction: u32) -> Option<RegImmOp> {
    match funct3(raw_instruction) {
        0b000 => Some(RegImmOp::Addi),
        0b010 => Some(RegImmOp::Slti),
        0b011 => Some(RegImmOp::Sltiu),
        0b100 => Some(RegImmOp::Xori),
        0b110 => Some(RegImmOp::Ori),
        0b111 => Some(RegImmOp::Andi),
        _ => None,
    }
}

fn i_shfunct(raw_instruction: u32) -> Option<RegShiftImmOp> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b001) => Some(RegShiftImmOp::Slli),
        (0b0000000, 0b101) => Some(RegShiftImmOp::Srli),
        (0b0100000, 0b101) => Some(RegShiftImmOp::Srai),
        _ => None,
    }
}

fn i_width(raw_instruction: u32) -> Option<LoadWidth> {
    match funct3(raw_instruction) {
        0b000 => Some(LoadWidth::Lb),
        0b001 => Some(LoadWidth::Lh),
        0b010 => Some(LoadWidth::Lw),
        0b100 => Some(LoadWidth::Lbu),
        0b101 => Some(LoadWidth::Lhu),
        _ => None,
    }
}

fn s_width(raw_instruction: u32) -> Option<StoreWidth> {
    match funct3(raw_instruction) {
        0b000 => Some(StoreWidth::Sb),
        0b001 => Some(StoreWidth::Sh),
        0b010 => Some(StoreWidth::Sw),
        _ => None,
    }
}

fn r_funct(raw_instruction: u32) -> Option<RegRegOp> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b000) => Some(RegRegOp::Add),
        (0b0000000, 0b001) => Some(RegRegOp::Sll),
        (0b0000000, 0b010) => Some(RegRegOp::Slt),
        (0b0000000, 0b011) => Some(RegRegOp::Sltu),
        (0b0000000, 0b100) => Some(RegRegOp::Xor),
        (0b0000000, 0b101) => Some(RegRegOp::Srl),
        (0b0000000, 0b110) => Some(RegRegOp::Or),
        (0b0000000, 0b111) => Some(RegRegOp::And),
        (0b0100000, 0b000) => Some(RegRegOp::Sub),
        (0b0100000, 0b101) => Some(RegRegOp::Sra),
        (0b0000001, 0b000) => Some(RegRegOp::Mul),
        (0b0000001, 0b001) => Some(RegRegOp::Mulh),
        (0b0000001, 0b010) => Some(RegRegOp::Mulhsu),
        (0b0000001, 0b011) => Some(RegRegOp::Mulhu),
        (0b0000001, 0b100) => Some(RegRegOp::Div),
        (0b0000001, 0b101) => Some(RegRegOp::Divu),
        (0b0000001, 0b110) => Some(RegRegOp::Rem),
        (0b0000001, 0b111) => Some(RegRegOp::Remu),
        _ => None,
    }
}

fn b_funct(raw_instruction: u32) -> Option<BranchCondition> {
    match funct3(raw_instruction) {
        0b000 => Some(BranchCondition::Beq),
        0b001 => Some(BranchCondition::Bne),
        0b100 => Some(BranchCondition::Blt),
        0b101 => Some(BranchCondition::Bge),
        0b110 => Some(BranchCondition::Bltu),
        0b111 => Some(BranchCondition::Bgeu),
        _ => None,
    }
}

/// Returns the A-extension operation selected by funct5, if valid.
/// Only word-size (funct3 = `0b010`) operations exist on RV32.
fn a_funct(raw_instruction: u32) -> Option<AmoOp> {
    if funct3(raw_instruction) != 0b010 {
        return None;
    }
    // Bits 26:25 are the aq/rl ordering hints, which a single hart ignores.
    match raw_instruction >> 27 {
        // LR.W requires rs2 = 0; other values are reserved.
        0b00010 => (u8::from(rs2(raw_instruction)) == 0).then_some(AmoOp::Lr),
        0b00011 => Some(AmoOp::Sc),
        0b00001 => Some(AmoOp::Swap),
        0b00000 => Some(AmoOp::Add),
        0b00100 => Some(AmoOp::Xor),
        0b01100 => Some(AmoOp::And),
        0b01000 => Some(AmoOp::Or),
        0b10000 => Some(AmoOp::Min),
        0b10100 => Some(AmoOp::Max),
        0b11000 => Some(AmoOp::Minu),
        0b11100 => Some(AmoOp::Maxu),
        _ => None,
    }
}

/// Returns the 3-bit *funct3* value for R-type, I-type, S-type, B-type
/// instructions.
fn funct3(raw_instruction: u32) -> u8 {
    ((raw_instruction >> 12) & 0b111) as u8
}

/// Returns the 7-bit *funct7* value for R-type instructions.
fn funct7(raw_instruction: u32) -> u8 {
    (raw_instruction >> 25) as u8
}

/// Returns the 5-bit *shamt* value for I-type shift instructions.
fn shamt(raw_instruction: u32) -> u32 {
    (raw_instruction >> 20) & 0x1F
}

/// Returns the 12-bit I-immediate sign-extended to 32 bits.
fn i_imm(raw_instruction: u32) -> i32 {
    raw_instruction as i32 >> 20
}

/// Returns the 12-bit S-immediate sign-extended to 32 bits.
fn s_imm(raw_instruction: u32) -> i32 {
    let imm_11_5 = raw_instruction & 0xFE00_0000;
    let imm_4_0 = raw_instruction & 0x0000_0F80;
    (imm_11_5 | (imm_4_0 << 13)) as i32 >> 20
}

/// Returns the 13-bit B-immediate sign-extended to 32 bits.
/// Bit 0 is implicit and always zero.
fn b_imm(raw_instruction: u32) -> i32 {
    let imm_12 = raw_instruction & 0x8000_0000;
    let imm_10_5 = raw_instruction & 0x7E00_0000;
    let imm_4_1 = raw_instruction & 0x0000_0F00;
    let imm_11 = raw_instruction & 0x0000_0080;
    (imm_12 | (imm_11 << 23) | (imm_10_5 >> 1) | (imm_4_1 << 12)) as i32 >> 19
}

/// Returns the signed 32-bit U-immediate (upper 20 bits in place, low 12
/// bits zero).
fn u_imm(raw_instruction: u32) -> i32 {
    (raw_instruction & 0xFFFF_F000) as i32
}

/// Returns the 21-bit J-immediate sign-extended to 32 bits.
/// Bit 0 is implicit and always zero.
fn j_imm(raw_instruction: u32) -> i32 {
    let imm_20 = raw_instruction & 0x8000_0000;
    let imm_10_1 = raw_instruction & 0x7FE0_0000;
    let imm_11 = raw_instruction & 0x0010_0000;
    let imm_19_12 = raw_instruction & 0x000F_F000;
    (imm_20 | (imm_19_12 << 11) | (imm_11 << 2) | (imm_10_1 >> 9)) as i32 >> 11
}

/// Returns the 3-bit *funct3* value of a compressed instruction.
fn c_funct3(raw_instruction: u16) -> u16 {
    raw_instruction >> 13
}

/// Returns the full 5-bit *rd/rs1* field (bits 11:7) of a compressed
/// instruction.
fn c_rd_full(raw_instruction: u16) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 7) & 0x1F) as u8)
}

/// Returns the full 5-bit *rs2* field (bits 6:2) of a compressed
/// instruction.
fn c_rs2_full(raw_instruction: u16) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 2) & 0x1F) as u8)
}

/// Returns the compressed 3-bit *rd'/rs2'* field (bits 4:2), remapped to
/// the full register space.
fn c_rd_short(raw_instruction: u16) -> Specifier {
    Specifier::from_c3(((raw_instruction >> 2) & 0b111) as u8)
}

/// Returns the compressed 3-bit *rs1'* field (bits 9:7), remapped to the
/// full register space.
fn c_rs1_short(raw_instruction: u16) -> Specifier {
    Specifier::from_c3(((raw_instruction >> 7) & 0b111) as u8)
}

/// Alias for the *rs2'* role of bits 4:2 in the CA format.
fn c_rs2_short(raw_instruction: u16) -> Specifier {
    c_rd_short(raw_instruction)
}

/// Sign-extends the low `bits` bits of `value` to 32 bits.
fn sign_extend(value: u32, bits: u32) -> i32 {
    (value << (32 - bits)) as i32 >> (32 - bits)
}

/// Returns the 6-bit CI-format immediate (imm[5] at bit 12, imm[4:0] at
/// bits 6:2), sign-extended.
fn ci_imm(raw_instruction: u16) -> i32 {
    let raw = raw_instruction as u32;
    sign_extend((raw >> 7) & 0x20 | (raw >> 2) & 0x1F, 6)
}

/// Returns the shift amount of C.SLLI/C.SRLI/C.SRAI, or an error if bit 12
/// (shamt[5]) is set, which is reserved on RV32.
fn c_shamt(raw_instruction: u16) -> Result<u32, DecodeError> {
    if raw_instruction & 0x1000 != 0 {
        return Err(DecodeError::ReservedCompressed);
    }
    Ok(((raw_instruction >> 2) & 0x1F) as u32)
}

/// Returns the zero-extended C.ADDI4SPN immediate
/// (nzuimm[5:4|9:6|2|3] at bits 12:5), a multiple of 4.
fn ciw_imm(raw_instruction: u16) -> u32 {
    let raw = raw_instruction as u32;
    (raw >> 7) & 0x30 | (raw >> 1) & 0x3C0 | (raw >> 4) & 0x4 | (raw >> 2) & 0x8
}

/// Returns the zero-extended C.LW/C.SW offset (uimm[5:3] at bits 12:10,
/// uimm[2] at bit 6, uimm[6] at bit 5), a multiple of 4.
fn cl_imm(raw_instruction: u16) -> u32 {
    let raw = raw_instruction as u32;
    (raw >> 7) & 0x38 | (raw >> 4) & 0x4 | (raw << 1) & 0x40
}

/// Returns the sign-extended C.ADDI16SP immediate
/// (nzimm[9|4|6|8:7|5] at bits 12, 6:2), a multiple of 16.
fn ci16sp_imm(raw_instruction: u16) -> i32 {
    let raw = raw_instruction as u32;
    sign_extend(
        (raw >> 3) & 0x200
            | (raw >> 2) & 0x10
            | (raw << 1) & 0x40
            | (raw << 4) & 0x180
            | (raw << 3) & 0x20,
        10,
    )
}

/// Returns the zero-extended C.LWSP offset (uimm[5] at bit 12, uimm[4:2] at
/// bits 6:4, uimm[7:6] at bits 3:2), a multiple of 4.
fn clwsp_imm(raw_instruction: u16) -> u32 {
    let raw = raw_instruction as u32;
    (raw >> 7) & 0x20 | (raw >> 2) & 0x1C | (raw << 4) & 0xC0
}

/// Returns the zero-extended C.SWSP offset (uimm[5:2] at bits 12:9,
/// uimm[7:6] at bits 8:7), a multiple of 4.
fn cswsp_imm(raw_instruction: u16) -> u32 {
    let raw = raw_instruction as u32;
    (raw >> 7) & 0x3C | (raw >> 1) & 0xC0
}

/// Returns the sign-extended CJ-format jump offset
/// (imm[11|4|9:8|10|6|7|3:1|5] at bits 12:2), a multiple of 2.
fn cj_imm(raw_instruction: u16) -> i32 {
    let raw = raw_instruction as u32;
    let imm = (raw >> 1) & 0x800
        | (raw >> 7) & 0x10
        | (raw >> 1) & 0x300
        | (raw << 2) & 0x400
        | (raw >> 1) & 0x40
        | (raw << 1) & 0x80
        | (raw >> 2) & 0xE
        | (raw << 3) & 0x20;
    sign_extend(imm, 12)
}

/// Returns the sign-extended CB-format branch offset
/// (imm[8|4:3] at bits 12:10, imm[7:6|2:1|5] at bits 6:2), a multiple of 2.
fn cb_imm(raw_instruction: u16) -> i32 {
    let raw = raw_instruction as u32;
    let imm = (raw >> 4) & 0x100
        | (raw >> 7) & 0x18
        | (raw << 1) & 0xC0
        | (raw >> 2) & 0x6
        | (raw << 3) & 0x20;
    sign_extend(imm, 9)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Opcode {
    OpImm,
    Auipc,
    Lui,
    Op,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    Amo,
    MiscMem,
}
