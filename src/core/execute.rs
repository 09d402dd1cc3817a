//! Execution of decoded instructions against a core's state.
//!
//! Execution is infallible: every instruction that decodes also retires.
//! Memory accesses go through the bus, which never faults, and the decoders
//! only produce branch and jump offsets that keep the program counter
//! halfword-aligned. `jalr` clears bit 0 of its target as the ISA requires.

use super::{Core, Width};
use crate::bus::Bus;
use crate::registers::Specifier;

/// Executes a single decoded instruction against a core, then advances the
/// program counter past it (or to the branch/jump target).
///
/// `width` is the encoded size of the instruction being executed, which
/// determines how far a sequential instruction advances the program counter
/// and what the link registers of `jal`/`jalr` receive.
pub struct Executor<'c, B> {
    pub core: &'c mut Core<B>,
    pub width: Width,
}

impl<B: Bus> Executor<'_, B> {
    /// > ADDI adds the sign-extended 12-bit immediate to register rs1.
    /// > Arithmetic overflow is ignored and the result is simply the low
    /// > XLEN bits of the result.
    pub fn addi(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, u32::wrapping_add)
    }

    /// > SLTI (set less than immediate) places the value 1 in register rd
    /// > if register rs1 is less than the sign-extended immediate when both
    /// > are treated as signed numbers, else 0 is written to rd.
    pub fn slti(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, |a, b| {
            u32::from((a as i32) < (b as i32))
        })
    }

    /// > SLTIU is similar but compares the values as unsigned numbers (i.e.,
    /// > the immediate is first sign-extended to XLEN bits then treated as
    /// > an unsigned number).
    pub fn sltiu(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, |a, b| u32::from(a < b))
    }

    /// > ANDI, ORI, XORI are logical operations that perform bitwise AND,
    /// > OR, and XOR on register rs1 and the sign-extended 12-bit immediate
    /// > and place the result in rd.
    pub fn xori(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, |a, b| a ^ b)
    }

    /// See [`Self::xori`].
    pub fn ori(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, |a, b| a | b)
    }

    /// See [`Self::xori`].
    pub fn andi(&mut self, dest: Specifier, src: Specifier, immediate: i32) {
        self.reg_imm_op(dest, src, immediate, |a, b| a & b)
    }

    /// > SLLI is a logical left shift (zeros are shifted into the lower
    /// > bits).
    pub fn slli(&mut self, dest: Specifier, src: Specifier, shift_amount_u5: u32) {
        self.reg_imm_op(dest, src, shift_amount_u5 as i32, |a, b| a << b)
    }

    /// > SRLI is a logical right shift (zeros are shifted into the upper
    /// > bits).
    pub fn srli(&mut self, dest: Specifier, src: Specifier, shift_amount_u5: u32) {
        self.reg_imm_op(dest, src, shift_amount_u5 as i32, |a, b| a >> b)
    }

    /// > SRAI is an arithmetic right shift (the original sign bit is copied
    /// > into the vacated upper bits).
    pub fn srai(&mut self, dest: Specifier, src: Specifier, shift_amount_u5: u32) {
        self.reg_imm_op(dest, src, shift_amount_u5 as i32, |a, b| {
            ((a as i32) >> b) as u32
        })
    }

    /// > LUI (load upper immediate) is used to build 32-bit constants. LUI
    /// > places the 32-bit U-immediate value into the destination register
    /// > rd, filling in the lowest 12 bits with zeros.
    pub fn lui(&mut self, dest: Specifier, immediate: i32) {
        self.core.registers.set_x(dest, immediate as u32 & !0xFFF);
        self.advance_pc();
    }

    /// > AUIPC (add upper immediate to pc) is used to build pc-relative
    /// > addresses. AUIPC forms a 32-bit offset from the U-immediate,
    /// > filling in the lowest 12 bits with zeros, adds this offset to the
    /// > address of the AUIPC instruction, then places the result in
    /// > register rd.
    pub fn auipc(&mut self, dest: Specifier, immediate: i32) {
        let pc = self.core.registers.pc();
        let value = pc.wrapping_add(immediate as u32 & !0xFFF);
        self.core.registers.set_x(dest, value);
        self.advance_pc();
    }

    /// > ADD performs the addition of rs1 and rs2. Overflows are ignored
    /// > and the low XLEN bits of results are written to the destination
    /// > rd.
    pub fn add(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, u32::wrapping_add)
    }

    /// > SUB performs the subtraction of rs2 from rs1.
    pub fn sub(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, u32::wrapping_sub)
    }

    /// > SLL, SRL, and SRA perform logical left, logical right, and
    /// > arithmetic right shifts on the value in register rs1 by the shift
    /// > amount held in the lower 5 bits of register rs2.
    pub fn sll(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| a << (b & 0x1F))
    }

    /// > SLT and SLTU perform signed and unsigned compares respectively,
    /// > writing 1 to rd if rs1 < rs2, 0 otherwise.
    pub fn slt(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| u32::from((a as i32) < (b as i32)))
    }

    /// See [`Self::slt`].
    pub fn sltu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| u32::from(a < b))
    }

    pub fn xor(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| a ^ b)
    }

    /// See [`Self::sll`].
    pub fn srl(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| a >> (b & 0x1F))
    }

    /// See [`Self::sll`].
    pub fn sra(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| ((a as i32) >> (b & 0x1F)) as u32)
    }

    pub fn or(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| a | b)
    }

    pub fn and(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| a & b)
    }

    /// > MUL performs an XLEN-bit×XLEN-bit multiplication of rs1 by rs2 and
    /// > places the lower XLEN bits in the destination register.
    pub fn mul(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, u32::wrapping_mul)
    }

    /// > MULH, MULHU, and MULHSU perform the same multiplication but return
    /// > the upper XLEN bits of the full 2×XLEN-bit product, for
    /// > signed×signed, unsigned×unsigned, and signed rs1×unsigned rs2
    /// > multiplication, respectively.
    pub fn mulh(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| {
            ((i64::from(a as i32) * i64::from(b as i32)) >> 32) as u32
        })
    }

    /// See [`Self::mulh`].
    pub fn mulhsu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| {
            ((i64::from(a as i32) * i64::from(b)) >> 32) as u32
        })
    }

    /// See [`Self::mulh`].
    pub fn mulhu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| {
            ((u64::from(a) * u64::from(b)) >> 32) as u32
        })
    }

    /// > DIV and DIVU perform an XLEN bits by XLEN bits signed and unsigned
    /// > integer division of rs1 by rs2, rounding towards zero.
    ///
    /// Division never traps: dividing by zero yields all bits set, and the
    /// signed overflow case (most negative value divided by -1) yields the
    /// dividend back.
    pub fn div(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| {
            if b == 0 {
                u32::MAX
            } else {
                (a as i32).wrapping_div(b as i32) as u32
            }
        })
    }

    /// See [`Self::div`].
    pub fn divu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| if b == 0 { u32::MAX } else { a / b })
    }

    /// > REM and REMU provide the remainder of the corresponding division
    /// > operation. For REM, the sign of a nonzero result equals the sign
    /// > of the dividend.
    ///
    /// The remainder of a division by zero is the dividend; the remainder
    /// of the signed overflow case is zero.
    pub fn rem(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| {
            if b == 0 {
                a
            } else {
                (a as i32).wrapping_rem(b as i32) as u32
            }
        })
    }

    /// See [`Self::rem`].
    pub fn remu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) {
        self.reg_reg_op(dest, src1, src2, |a, b| if b == 0 { a } else { a % b })
    }

    /// > The jump and link (JAL) instruction uses the J-type format, where
    /// > the J-immediate encodes a signed offset in multiples of 2 bytes.
    /// > The offset is sign-extended and added to the address of the jump
    /// > instruction to form the jump target address. JAL stores the
    /// > address of the instruction following the jump in register rd.
    pub fn jal(&mut self, dest: Specifier, offset: i32) {
        let pc = self.core.registers.pc();
        let return_address = pc.wrapping_add(self.width.advance());
        self.core.registers.set_x(dest, return_address);
        *self.core.registers.pc_mut() = pc.wrapping_add(offset as u32);
    }

    /// > The target address is obtained by adding the sign-extended 12-bit
    /// > I-immediate to the register rs1, then setting the
    /// > least-significant bit of the result to zero.
    pub fn jalr(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        let pc = self.core.registers.pc();
        let return_address = pc.wrapping_add(self.width.advance());
        // Read the base before the link write in case base == dest.
        let target = self.core.registers.x(base).wrapping_add(offset as u32) & !1;
        self.core.registers.set_x(dest, return_address);
        *self.core.registers.pc_mut() = target;
    }

    /// > BEQ and BNE take the branch if registers rs1 and rs2 are equal or
    /// > unequal respectively.
    pub fn beq(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| a == b)
    }

    /// See [`Self::beq`].
    pub fn bne(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| a != b)
    }

    /// > BLT and BLTU take the branch if rs1 is less than rs2, using signed
    /// > and unsigned comparison respectively.
    pub fn blt(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| (a as i32) < (b as i32))
    }

    /// See [`Self::blt`].
    pub fn bltu(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| a < b)
    }

    /// > BGE and BGEU take the branch if rs1 is greater than or equal to
    /// > rs2, using signed and unsigned comparison respectively.
    pub fn bge(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| (a as i32) >= (b as i32))
    }

    /// See [`Self::bge`].
    pub fn bgeu(&mut self, src1: Specifier, src2: Specifier, offset: i32) {
        self.cond_branch(src1, src2, offset, |a, b| a >= b)
    }

    /// > LB and LBU load an 8-bit value from memory, then sign-extend or
    /// > zero-extend it to 32 bits before storing in rd.
    pub fn lb(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        self.load_op(dest, base, offset, |bus, address| {
            bus.read8(address) as i8 as u32
        })
    }

    /// > LH loads a 16-bit value from memory, then sign-extends to 32 bits
    /// > before storing in rd.
    pub fn lh(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        self.load_op(dest, base, offset, |bus, address| {
            bus.read16(address) as i16 as u32
        })
    }

    /// > LW loads a 32-bit value from memory into rd.
    pub fn lw(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        self.load_op(dest, base, offset, Bus::read32)
    }

    /// See [`Self::lb`].
    pub fn lbu(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        self.load_op(dest, base, offset, |bus, address| u32::from(bus.read8(address)))
    }

    /// > LHU loads a 16-bit value from memory but then zero extends to
    /// > 32 bits before storing in rd.
    pub fn lhu(&mut self, dest: Specifier, base: Specifier, offset: i32) {
        self.load_op(dest, base, offset, |bus, address| {
            u32::from(bus.read16(address))
        })
    }

    /// > The SB, SH, and SW instructions store 8-bit, 16-bit, and 32-bit
    /// > values from the low bits of register rs2 to memory.
    pub fn sb(&mut self, src: Specifier, base: Specifier, offset: i32) {
        self.store_op(src, base, offset, |bus, address, value| {
            bus.write8(address, value as u8)
        })
    }

    /// See [`Self::sb`].
    pub fn sh(&mut self, src: Specifier, base: Specifier, offset: i32) {
        self.store_op(src, base, offset, |bus, address, value| {
            bus.write16(address, value as u16)
        })
    }

    /// See [`Self::sb`].
    pub fn sw(&mut self, src: Specifier, base: Specifier, offset: i32) {
        self.store_op(src, base, offset, Bus::write32)
    }

    /// > LR.W loads a word from the address in rs1, places the
    /// > sign-extended value in rd, and registers a reservation set.
    ///
    /// With a single hart there is nothing to reserve against, so this is
    /// an ordinary word load.
    pub fn lr_w(&mut self, dest: Specifier, addr: Specifier, _src: Specifier) {
        let address = self.core.registers.x(addr);
        let loaded = self.core.bus.read32(address);
        self.core.registers.set_x(dest, loaded);
        self.advance_pc();
    }

    /// > SC.W conditionally writes a word in rs2 to the address in rs1.
    /// > SC.W writes zero to rd on success or a nonzero code on failure.
    ///
    /// With a single hart no other agent can break a reservation, so the
    /// store always succeeds and rd always receives zero.
    pub fn sc_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        let address = self.core.registers.x(addr);
        let value = self.core.registers.x(src);
        self.core.bus.write32(address, value);
        self.core.registers.set_x(dest, 0);
        self.advance_pc();
    }

    /// > These AMO instructions atomically load a data value from the
    /// > address in rs1, place the value into register rd, apply a binary
    /// > operator to the loaded value and the original value in rs2, then
    /// > store the result back to the original address in rs1.
    pub fn amoswap_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |_, src| src)
    }

    /// See [`Self::amoswap_w`].
    pub fn amoadd_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, u32::wrapping_add)
    }

    /// See [`Self::amoswap_w`].
    pub fn amoxor_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |a, b| a ^ b)
    }

    /// See [`Self::amoswap_w`].
    pub fn amoand_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |a, b| a & b)
    }

    /// See [`Self::amoswap_w`].
    pub fn amoor_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |a, b| a | b)
    }

    /// See [`Self::amoswap_w`]. MIN/MAX compare as signed values.
    pub fn amomin_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |a, b| (a as i32).min(b as i32) as u32)
    }

    /// See [`Self::amomin_w`].
    pub fn amomax_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, |a, b| (a as i32).max(b as i32) as u32)
    }

    /// See [`Self::amoswap_w`]. MINU/MAXU compare as unsigned values.
    pub fn amominu_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, u32::min)
    }

    /// See [`Self::amominu_w`].
    pub fn amomaxu_w(&mut self, dest: Specifier, addr: Specifier, src: Specifier) {
        self.amo_op(dest, addr, src, u32::max)
    }

    /// A single in-order hart with no caches already observes all of its
    /// own accesses in program order, so FENCE retires without effect.
    pub fn fence(&mut self) {
        self.advance_pc();
    }

    fn reg_imm_op(
        &mut self,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
        op: impl FnOnce(u32, u32) -> u32,
    ) {
        let value = op(self.core.registers.x(src), immediate as u32);
        self.core.registers.set_x(dest, value);
        self.advance_pc();
    }

    fn reg_reg_op(
        &mut self,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
        op: impl FnOnce(u32, u32) -> u32,
    ) {
        let value = op(self.core.registers.x(src1), self.core.registers.x(src2));
        self.core.registers.set_x(dest, value);
        self.advance_pc();
    }

    fn cond_branch(
        &mut self,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
        condition: impl FnOnce(u32, u32) -> bool,
    ) {
        if condition(self.core.registers.x(src1), self.core.registers.x(src2)) {
            let pc = self.core.registers.pc_mut();
            *pc = pc.wrapping_add(offset as u32);
        } else {
            self.advance_pc();
        }
    }

    fn load_op(
        &mut self,
        dest: Specifier,
        base: Specifier,
        offset: i32,
        read: impl FnOnce(&mut B, u32) -> u32,
    ) {
        let address = self.core.registers.x(base).wrapping_add(offset as u32);
        let value = read(&mut self.core.bus, address);
        self.core.registers.set_x(dest, value);
        self.advance_pc();
    }

    fn store_op(
        &mut self,
        src: Specifier,
        base: Specifier,
        offset: i32,
        write: impl FnOnce(&mut B, u32, u32),
    ) {
        let address = self.core.registers.x(base).wrapping_add(offset as u32);
        write(&mut self.core.bus, address, self.core.registers.x(src));
        self.advance_pc();
    }

    fn amo_op(
        &mut self,
        dest: Specifier,
        addr: Specifier,
        src: Specifier,
        op: impl FnOnce(u32, u32) -> u32,
    ) {
        let address = self.core.registers.x(addr);
        let loaded = self.core.bus.read32(address);
        let value = op(loaded, self.core.registers.x(src));
        self.core.bus.write32(address, value);
        // rd receives the loaded value even when rd == rs2.
        self.core.registers.set_x(dest, loaded);
        self.advance_pc();
    }

    fn advance_pc(&mut self) {
        let pc = self.core.registers.pc_mut();
        *pc = pc.wrapping_add(self.width.advance());
    }
}
