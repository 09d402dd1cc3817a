//! A single RV32IMAC hart and its fetch-decode-execute loop.

mod execute;

use crate::bus::Bus;
use crate::instruction::{
    self, AmoOp, BranchCondition, DecodeError, Instruction, LoadWidth, RegImmOp, RegRegOp,
    RegShiftImmOp, StoreWidth,
};
use crate::registers::{Registers, Specifier};
use crate::trace::TraceBuffer;
use execute::Executor;
use log::{debug, trace};
use thiserror::Error;

/// Build-time parameters of a core. Fixed for the core's lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the program counter is set to at construction and on
    /// [`Core::reset`].
    pub reset_vector: u32,
    /// Number of retired instructions the trace buffer retains.
    pub trace_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_vector: 0x8000_0000,
            trace_depth: 5,
        }
    }
}

/// The encoded size of an instruction, decided by the low two bits of its
/// first halfword.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Width {
    /// A 16-bit instruction from the C extension.
    Compressed,
    /// A full 32-bit instruction.
    Full,
}

impl Width {
    /// The amount a sequential instruction of this width advances the
    /// program counter.
    pub fn advance(self) -> u32 {
        match self {
            Self::Compressed => 2,
            Self::Full => 4,
        }
    }
}

/// A single RV32IMAC hart: register file, retirement trace, and the bus it
/// reaches memory through.
///
/// The core owns its bus. Hosts that need to keep hold of the bus can pass
/// a `&mut` to it instead, since `&mut B: Bus` where `B: Bus`, or take it
/// back with [`Core::into_bus`].
#[derive(Debug)]
pub struct Core<B> {
    config: Config,
    registers: Registers,
    trace: TraceBuffer,
    bus: B,
}

impl<B: Bus> Core<B> {
    /// Creates a core in its reset state: all `x` registers zero and the
    /// program counter at the configured reset vector.
    ///
    /// The bus is taken as-is. Loading a program image into memory is the
    /// host's job, before or after construction.
    pub fn new(bus: B, config: Config) -> Self {
        let registers = Registers::new(config.reset_vector);
        let trace = TraceBuffer::new(config.trace_depth);
        Self {
            config,
            registers,
            trace,
            bus,
        }
    }

    /// Creates a core with the default [`Config`].
    pub fn with_bus(bus: B) -> Self {
        Self::new(bus, Config::default())
    }

    /// Returns the core to its reset state.
    ///
    /// Register state and the trace buffer are cleared; memory behind the
    /// bus is untouched.
    pub fn reset(&mut self) {
        self.registers = Registers::new(self.config.reset_vector);
        self.trace.clear();
        debug!(
            "Resetting core, pc restored to {:#010x}",
            self.config.reset_vector
        );
    }

    /// Fetches, decodes, executes, and retires a single instruction.
    ///
    /// On success the program counter has advanced past the instruction (or
    /// to its branch/jump target) and the instruction has been recorded in
    /// the trace buffer. On failure the core is unchanged: the program
    /// counter still points at the offending instruction and nothing is
    /// recorded, so the host can inspect, patch, or abandon the core.
    pub fn step(&mut self) -> Result<(), StepError> {
        let pc = self.registers.pc();
        if pc & 1 != 0 {
            return Err(StepError::MisalignedFetch { pc });
        }
        let first_halfword = self.bus.read16(pc);
        let (instruction, raw_instruction, width) = if instruction::is_compressed(first_halfword) {
            let raw_instruction = u32::from(first_halfword);
            let instruction = Instruction::decode_compressed(first_halfword)
                .map_err(|source| StepError::IllegalInstruction {
                    pc,
                    raw_instruction,
                    source,
                })?;
            (instruction, raw_instruction, Width::Compressed)
        } else {
            let second_halfword = self.bus.read16(pc.wrapping_add(2));
            let raw_instruction = u32::from(first_halfword) | u32::from(second_halfword) << 16;
            let instruction = Instruction::decode(raw_instruction).map_err(|source| {
                StepError::IllegalInstruction {
                    pc,
                    raw_instruction,
                    source,
                }
            })?;
            (instruction, raw_instruction, Width::Full)
        };
        trace!("Executing instruction {raw_instruction:#010x} at {pc:#010x}");
        self.execute_instruction(instruction, width);
        self.trace.record(pc, raw_instruction);
        debug_assert_eq!(0, self.registers.x(Specifier::X0));
        Ok(())
    }

    /// Returns the hart's register file.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Returns a mutable reference to the hart's register file, for hosts
    /// that act as a debugger.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Current value of the program counter.
    pub fn pc(&self) -> u32 {
        self.registers.pc()
    }

    /// Returns the retirement trace.
    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consumes the core, handing the bus back to the host.
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn execute_instruction(&mut self, instruction: Instruction, width: Width) {
        let mut executor = Executor { core: self, width };
        match instruction {
            Instruction::OpImm {
                op,
                dest,
                src,
                immediate,
            } => {
                let op = match op {
                    RegImmOp::Addi => Executor::addi,
                    RegImmOp::Slti => Executor::slti,
                    RegImmOp::Sltiu => Executor::sltiu,
                    RegImmOp::Xori => Executor::xori,
                    RegImmOp::Ori => Executor::ori,
                    RegImmOp::Andi => Executor::andi,
                };
                op(&mut executor, dest, src, immediate)
            }
            Instruction::OpShiftImm {
                op,
                dest,
                src,
                shift_amount_u5,
            } => {
                let op = match op {
                    RegShiftImmOp::Slli => Executor::slli,
                    RegShiftImmOp::Srli => Executor::srli,
                    RegShiftImmOp::Srai => Executor::srai,
                };
                op(&mut executor, dest, src, shift_amount_u5)
            }
            Instruction::Auipc { dest, immediate } => executor.auipc(dest, immediate),
            Instruction::Lui { dest, immediate } => executor.lui(dest, immediate),
            Instruction::Op {
                op,
                dest,
                src1,
                src2,
            } => {
                let op = match op {
                    RegRegOp::Add => Executor::add,
                    RegRegOp::Sub => Executor::sub,
                    RegRegOp::Sll => Executor::sll,
                    RegRegOp::Slt => Executor::slt,
                    RegRegOp::Sltu => Executor::sltu,
                    RegRegOp::Xor => Executor::xor,
                    RegRegOp::Srl => Executor::srl,
                    RegRegOp::Sra => Executor::sra,
                    RegRegOp::Or => Executor::or,
                    RegRegOp::And => Executor::and,
                    RegRegOp::Mul => Executor::mul,
                    RegRegOp::Mulh => Executor::mulh,
                    RegRegOp::Mulhsu => Executor::mulhsu,
                    RegRegOp::Mulhu => Executor::mulhu,
                    RegRegOp::Div => Executor::div,
                    RegRegOp::Divu => Executor::divu,
                    RegRegOp::Rem => Executor::rem,
                    RegRegOp::Remu => Executor::remu,
                };
                op(&mut executor, dest, src1, src2)
            }
            Instruction::Jal { dest, offset } => executor.jal(dest, offset),
            Instruction::Jalr { dest, base, offset } => executor.jalr(dest, base, offset),
            Instruction::Branch {
                condition,
                src1,
                src2,
                offset,
            } => {
                let op = match condition {
                    BranchCondition::Beq => Executor::beq,
                    BranchCondition::Bne => Executor::bne,
                    BranchCondition::Blt => Executor::blt,
                    BranchCondition::Bltu => Executor::bltu,
                    BranchCondition::Bge => Executor::bge,
                    BranchCondition::Bgeu => Executor::bgeu,
                };
                op(&mut executor, src1, src2, offset)
            }
            Instruction::Load {
                width,
                dest,
                base,
                offset,
            } => {
                let op = match width {
                    LoadWidth::Lb => Executor::lb,
                    LoadWidth::Lh => Executor::lh,
                    LoadWidth::Lw => Executor::lw,
                    LoadWidth::Lbu => Executor::lbu,
                    LoadWidth::Lhu => Executor::lhu,
                };
                op(&mut executor, dest, base, offset)
            }
            Instruction::Store {
                width,
                src,
                base,
                offset,
            } => {
                let op = match width {
                    StoreWidth::Sb => Executor::sb,
                    StoreWidth::Sh => Executor::sh,
                    StoreWidth::Sw => Executor::sw,
                };
                op(&mut executor, src, base, offset)
            }
            Instruction::Amo {
                op,
                dest,
                addr,
                src,
            } => {
                let op = match op {
                    AmoOp::Lr => Executor::lr_w,
                    AmoOp::Sc => Executor::sc_w,
                    AmoOp::Swap => Executor::amoswap_w,
                    AmoOp::Add => Executor::amoadd_w,
                    AmoOp::Xor => Executor::amoxor_w,
                    AmoOp::And => Executor::amoand_w,
                    AmoOp::Or => Executor::amoor_w,
                    AmoOp::Min => Executor::amomin_w,
                    AmoOp::Max => Executor::amomax_w,
                    AmoOp::Minu => Executor::amominu_w,
                    AmoOp::Maxu => Executor::amomaxu_w,
                };
                op(&mut executor, dest, addr, src)
            }
            Instruction::Fence => executor.fence(),
        }
    }
}

/// Errors that can occur while stepping a core.
///
/// Both variants leave the core unchanged, with the program counter still
/// pointing at the instruction that could not retire.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StepError {
    #[error("illegal instruction {raw_instruction:#010x} at address {pc:#010x}")]
    IllegalInstruction {
        pc: u32,
        raw_instruction: u32,
        #[source]
        source: DecodeError,
    },
    #[error("instruction fetch from misaligned address {pc:#010x}")]
    MisalignedFetch { pc: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAM_BASE: u32 = 0x8000_0000;

    struct TestBus {
        ram: Vec<u8>,
    }

    impl TestBus {
        fn new(size: usize) -> Self {
            Self { ram: vec![0; size] }
        }
    }

    impl Bus for TestBus {
        fn read8(&mut self, address: u32) -> u8 {
            address
                .checked_sub(RAM_BASE)
                .and_then(|offset| self.ram.get(offset as usize))
                .copied()
                .unwrap_or(0)
        }

        fn write8(&mut self, address: u32, value: u8) {
            if let Some(byte) = address
                .checked_sub(RAM_BASE)
                .and_then(|offset| self.ram.get_mut(offset as usize))
            {
                *byte = value;
            }
        }
    }

    fn core_with_program(words: &[u32]) -> Core<TestBus> {
        let mut bus = TestBus::new(0x1000);
        for (i, word) in words.iter().enumerate() {
            bus.write32(RAM_BASE + 4 * i as u32, *word);
        }
        Core::new(bus, Config::default())
    }

    fn x(index: u8) -> Specifier {
        Specifier::from_u5(index)
    }

    #[test]
    fn test_reset_smoke_instruction() {
        // lui x1, 0x12345
        let mut core = core_with_program(&[0x1234_50B7]);
        core.step().unwrap();
        assert_eq!(0x1234_5000, core.registers().x(x(1)));
        assert_eq!(RAM_BASE + 4, core.pc());
    }

    #[test]
    fn test_x0_ignores_writes() {
        // addi x0, x0, 42
        let mut core = core_with_program(&[0x02A0_0013]);
        core.step().unwrap();
        assert_eq!(0, core.registers().x(Specifier::X0));
        assert_eq!(RAM_BASE + 4, core.pc());
    }

    #[test]
    fn test_add_wraps_on_overflow() {
        // lui x1, 0x80000; addi x1, x1, -1; addi x2, x1, 1
        let mut core = core_with_program(&[0x8000_00B7, 0xFFF0_8093, 0x0010_8113]);
        for _ in 0..3 {
            core.step().unwrap();
        }
        assert_eq!(0x7FFF_FFFF, core.registers().x(x(1)));
        assert_eq!(0x8000_0000, core.registers().x(x(2)));
    }

    #[test]
    fn test_division_by_zero() {
        // addi x1, x0, 7; div x3, x1, x0; rem x4, x1, x0;
        // divu x5, x1, x0; remu x6, x1, x0
        let mut core = core_with_program(&[
            0x0070_0093,
            0x0200_C1B3,
            0x0200_E233,
            0x0200_D2B3,
            0x0200_F333,
        ]);
        for _ in 0..5 {
            core.step().unwrap();
        }
        assert_eq!(u32::MAX, core.registers().x(x(3)));
        assert_eq!(7, core.registers().x(x(4)));
        assert_eq!(u32::MAX, core.registers().x(x(5)));
        assert_eq!(7, core.registers().x(x(6)));
    }

    #[test]
    fn test_signed_division_overflow() {
        // lui x1, 0x80000; addi x2, x0, -1; div x3, x1, x2; rem x4, x1, x2
        let mut core =
            core_with_program(&[0x8000_00B7, 0xFFF0_0113, 0x0220_C1B3, 0x0220_E233]);
        for _ in 0..4 {
            core.step().unwrap();
        }
        assert_eq!(0x8000_0000, core.registers().x(x(3)));
        assert_eq!(0, core.registers().x(x(4)));
    }

    #[test]
    fn test_high_multiplies() {
        // lui x1, 0x80000; mulh x3, x1, x1; mulhu x4, x1, x1;
        // mulhsu x5, x1, x1; mul x6, x1, x1
        let mut core = core_with_program(&[
            0x8000_00B7,
            0x0210_91B3,
            0x0210_B233,
            0x0210_A2B3,
            0x0210_0333,
        ]);
        for _ in 0..5 {
            core.step().unwrap();
        }
        // (-2^31)^2 = 2^62
        assert_eq!(0x4000_0000, core.registers().x(x(3)));
        // (2^31)^2 = 2^62
        assert_eq!(0x4000_0000, core.registers().x(x(4)));
        // -2^31 * 2^31 = -2^62
        assert_eq!(0xC000_0000, core.registers().x(x(5)));
        assert_eq!(0, core.registers().x(x(6)));
    }

    #[test]
    fn test_branch_taken_and_not_taken() {
        // beq x0, x0, +8
        let mut core = core_with_program(&[0x0000_0463]);
        core.step().unwrap();
        assert_eq!(RAM_BASE + 8, core.pc());

        // bne x0, x0, +8
        let mut core = core_with_program(&[0x0000_1463]);
        core.step().unwrap();
        assert_eq!(RAM_BASE + 4, core.pc());
    }

    #[test]
    fn test_store_load_roundtrip() {
        // addi x1, x0, 123; lui x2, 0x80000; sw x1, 256(x2); lw x3, 256(x2)
        let mut core =
            core_with_program(&[0x07B0_0093, 0x8000_0137, 0x1011_2023, 0x1001_2183]);
        for _ in 0..4 {
            core.step().unwrap();
        }
        assert_eq!(123, core.registers().x(x(3)));
        assert_eq!([123u8, 0, 0, 0], core.bus_mut().ram[256..260]);
    }

    #[test]
    fn test_jalr_clears_target_bit0() {
        // lui x1, 0x80000; jalr x2, 13(x1)
        let mut core = core_with_program(&[0x8000_00B7, 0x00D0_8167]);
        core.step().unwrap();
        core.step().unwrap();
        assert_eq!(RAM_BASE + 12, core.pc());
        assert_eq!(RAM_BASE + 8, core.registers().x(x(2)));
    }

    #[test]
    fn test_jal_links_past_instruction() {
        // jal x1, +2048
        let mut core = core_with_program(&[0x0010_00EF]);
        core.step().unwrap();
        assert_eq!(RAM_BASE + 2048, core.pc());
        assert_eq!(RAM_BASE + 4, core.registers().x(x(1)));
    }

    #[test]
    fn test_auipc() {
        // auipc x1, 0
        let mut core = core_with_program(&[0x0000_0097]);
        core.step().unwrap();
        assert_eq!(RAM_BASE, core.registers().x(x(1)));
    }

    #[test]
    fn test_fence_is_a_nop() {
        // fence iorw, iorw
        let mut core = core_with_program(&[0x0FF0_000F]);
        core.step().unwrap();
        assert_eq!(RAM_BASE + 4, core.pc());
    }

    #[test]
    fn test_atomics() {
        // lui x1, 0x80000; addi x1, x1, 128; addi x2, x0, 2;
        // amoadd.w x3, x2, (x1); lr.w x4, (x1); sc.w x5, x2, (x1)
        let mut core = core_with_program(&[
            0x8000_00B7,
            0x0800_8093,
            0x0020_0113,
            0x0020_A1AF,
            0x1000_A22F,
            0x1820_A2AF,
        ]);
        core.bus_mut().write32(RAM_BASE + 128, 40);
        for _ in 0..4 {
            core.step().unwrap();
        }
        assert_eq!(40, core.registers().x(x(3)));
        assert_eq!(42, core.bus_mut().read32(RAM_BASE + 128));
        core.step().unwrap();
        assert_eq!(42, core.registers().x(x(4)));
        core.step().unwrap();
        // sc.w always succeeds on a single hart
        assert_eq!(0, core.registers().x(x(5)));
        assert_eq!(2, core.bus_mut().read32(RAM_BASE + 128));
    }

    #[test]
    fn test_compressed_and_full_widths_mix() {
        // c.li x10, 5; c.addi x10, 1; addi x11, x10, 0
        let mut core = core_with_program(&[]);
        core.bus_mut().write16(RAM_BASE, 0x4515);
        core.bus_mut().write16(RAM_BASE + 2, 0x0505);
        core.bus_mut().write32(RAM_BASE + 4, 0x0005_0593);
        core.step().unwrap();
        assert_eq!(RAM_BASE + 2, core.pc());
        core.step().unwrap();
        assert_eq!(RAM_BASE + 4, core.pc());
        core.step().unwrap();
        assert_eq!(RAM_BASE + 8, core.pc());
        assert_eq!(6, core.registers().x(x(10)));
        assert_eq!(6, core.registers().x(x(11)));
    }

    #[test]
    fn test_illegal_instruction_leaves_core_unchanged() {
        let mut core = core_with_program(&[0xFFFF_FFFF]);
        let error = core.step().unwrap_err();
        assert_eq!(
            StepError::IllegalInstruction {
                pc: RAM_BASE,
                raw_instruction: 0xFFFF_FFFF,
                source: DecodeError::UnsupportedOpcode,
            },
            error
        );
        assert_eq!(RAM_BASE, core.pc());
        assert!(core.trace().is_empty());
    }

    #[test]
    fn test_misaligned_fetch_is_reported() {
        let mut core = core_with_program(&[0x0000_0013]);
        *core.registers_mut().pc_mut() = RAM_BASE + 1;
        assert_eq!(
            Err(StepError::MisalignedFetch { pc: RAM_BASE + 1 }),
            core.step()
        );
        assert_eq!(RAM_BASE + 1, core.pc());
    }

    #[test]
    fn test_trace_retains_newest_entries() {
        // Seven nops through a depth-5 trace.
        let mut core = core_with_program(&[0x0000_0013; 7]);
        for _ in 0..7 {
            core.step().unwrap();
        }
        let entries: Vec<_> = core.trace().iter().copied().collect();
        assert_eq!(5, entries.len());
        assert_eq!(RAM_BASE + 8, entries[0].pc);
        assert_eq!(RAM_BASE + 24, entries[4].pc);
        assert!(entries.iter().all(|e| e.raw_instruction == 0x0000_0013));
    }

    #[test]
    fn test_reset_restores_registers_and_trace() {
        let mut core = core_with_program(&[0x1234_50B7]);
        core.step().unwrap();
        assert!(!core.trace().is_empty());
        core.reset();
        assert_eq!(RAM_BASE, core.pc());
        assert_eq!(0, core.registers().x(x(1)));
        assert!(core.trace().is_empty());
        // Memory is untouched by reset.
        assert_eq!(0x1234_50B7, core.bus_mut().read32(RAM_BASE));
    }
}
