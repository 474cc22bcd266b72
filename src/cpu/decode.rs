/*!
decode: the two parallel 256-entry opcode tables and their tag types.

`MODES[op]` gives the addressing-mode class and `OPERS[op]` gives the
operation performed; together the pair determines the exact cycle
sequence the executor runs for that opcode. There is no runtime decoding
cost beyond two array lookups — the tables are total, so every opcode byte
(including reserved/undocumented ones) produces a valid pair; the W65C02S
turns every unused slot into a deterministic NOP of one or more cycles.

Both tables are transcribed from the W65C02S opcode map; the addressing
mode a tag pairs with is what disambiguates operation tags that are
intentionally reused for unrelated opcodes (`BitMod`/`BitBranch` carry a
raw 0-15 value whose low 3 bits are a bit index and whose bit 3 selects
set-vs-reset / branch-on-set-vs-reset, exactly mirroring how the bit index
is encoded in the opcode's high nibble).
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    ImpliedX,
    ImpliedY,
    Implied1C,
    Immediate,
    Relative,
    RelativeBit,
    Zeropage,
    ZeropageX,
    ZeropageY,
    ZeropageBit,
    ZeropageIndirect,
    ZeropageIndirectX,
    ZeropageIndirectY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteJump,
    AbsoluteIndirect,
    AbsoluteIndirectX,
    RmwZeropage,
    RmwZeropageX,
    RmwAbsolute,
    RmwAbsoluteX,
    Subroutine,
    ReturnSub,
    StackPush,
    StackPull,
    StackBrk,
    StackRti,
    IntWaitStop,
    Nop5c,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oper {
    Brk,
    Ora,
    Nop,
    Tsb,
    Asl,
    Php,
    Bpl,
    Trb,
    Clc,
    Inc,
    Jsr,
    And,
    Bit,
    Rol,
    Plp,
    Bmi,
    Sec,
    Dec,
    Rti,
    Eor,
    Lsr,
    Pha,
    Jmp,
    Bvc,
    Cli,
    Phy,
    Rts,
    Adc,
    Stz,
    Ror,
    Pla,
    Bvs,
    Sei,
    Ply,
    Bra,
    Sta,
    Sty,
    Stx,
    Txa,
    Bcc,
    Tya,
    Txs,
    Ldy,
    Lda,
    Ldx,
    Tay,
    Tax,
    Bcs,
    Clv,
    Tsx,
    Cpy,
    Cmp,
    Wai,
    Bne,
    Cld,
    Phx,
    Stp,
    Cpx,
    Sbc,
    Beq,
    Sed,
    Plx,
    /// SMB/RMB: bits 0-2 are the bit index, bit 3 selects set (1) vs
    /// reset (0). Pairs only with `Mode::ZeropageBit`.
    BitMod(u8),
    /// BBS/BBR: same encoding as `BitMod`. Pairs only with
    /// `Mode::RelativeBit`.
    BitBranch(u8),
}

impl Oper {
    #[inline]
    pub fn bit_index(code: u8) -> u8 {
        code & 0x7
    }

    #[inline]
    pub fn bit_set(code: u8) -> bool {
        code & 0x8 != 0
    }
}

use Mode::*;
use Oper::*;

pub static MODES: [Mode; 256] = [
    StackBrk, ZeropageIndirectX, Immediate, Implied1C, RmwZeropage, Zeropage, RmwZeropage,
    ZeropageBit, StackPush, Immediate, Implied, Implied1C, RmwAbsolute, Absolute, RmwAbsolute,
    RelativeBit, Relative, ZeropageIndirectY, ZeropageIndirect, Implied1C, RmwZeropage,
    ZeropageX, RmwZeropageX, ZeropageBit, Implied, AbsoluteY, Implied, Implied1C, RmwAbsolute,
    AbsoluteX, RmwAbsoluteX, RelativeBit, Subroutine, ZeropageIndirectX, Immediate, Implied1C,
    Zeropage, Zeropage, RmwZeropage, ZeropageBit, StackPull, Immediate, Implied, Implied1C,
    Absolute, Absolute, RmwAbsolute, RelativeBit, Relative, ZeropageIndirectY, ZeropageIndirect,
    Implied1C, ZeropageX, ZeropageX, RmwZeropageX, ZeropageBit, Implied, AbsoluteY, Implied,
    Implied1C, AbsoluteX, AbsoluteX, RmwAbsoluteX, RelativeBit, StackRti, ZeropageIndirectX,
    Immediate, Implied1C, Zeropage, Zeropage, RmwZeropage, ZeropageBit, StackPush, Immediate,
    Implied, Implied1C, AbsoluteJump, Absolute, RmwAbsolute, RelativeBit, Relative,
    ZeropageIndirectY, ZeropageIndirect, Implied1C, ZeropageX, ZeropageX, RmwZeropageX,
    ZeropageBit, Implied, AbsoluteY, StackPush, Implied1C, Nop5c, AbsoluteX, RmwAbsoluteX,
    RelativeBit, ReturnSub, ZeropageIndirectX, Immediate, Implied1C, Zeropage, Zeropage,
    RmwZeropage, ZeropageBit, StackPull, Immediate, Implied, Implied1C, AbsoluteIndirect,
    Absolute, RmwAbsolute, RelativeBit, Relative, ZeropageIndirectY, ZeropageIndirect,
    Implied1C, ZeropageX, ZeropageX, RmwZeropageX, ZeropageBit, Implied, AbsoluteY, StackPull,
    Implied1C, AbsoluteIndirectX, AbsoluteX, RmwAbsoluteX, RelativeBit, Relative,
    ZeropageIndirectX, Immediate, Implied1C, Zeropage, Zeropage, Zeropage, ZeropageBit,
    ImpliedY, Immediate, Implied, Implied1C, Absolute, Absolute, Absolute, RelativeBit,
    Relative, ZeropageIndirectY, ZeropageIndirect, Implied1C, ZeropageX, ZeropageX, ZeropageY,
    ZeropageBit, Implied, AbsoluteY, Implied, Implied1C, Absolute, AbsoluteX, AbsoluteX,
    RelativeBit, Immediate, ZeropageIndirectX, Immediate, Implied1C, Zeropage, Zeropage,
    Zeropage, ZeropageBit, Implied, Immediate, Implied, Implied1C, Absolute, Absolute,
    Absolute, RelativeBit, Relative, ZeropageIndirectY, ZeropageIndirect, Implied1C, ZeropageX,
    ZeropageX, ZeropageY, ZeropageBit, Implied, AbsoluteY, Implied, Implied1C, AbsoluteX,
    AbsoluteX, AbsoluteY, RelativeBit, Immediate, ZeropageIndirectX, Immediate, Implied1C,
    Zeropage, Zeropage, RmwZeropage, ZeropageBit, ImpliedY, Immediate, ImpliedX, IntWaitStop,
    Absolute, Absolute, RmwAbsolute, RelativeBit, Relative, ZeropageIndirectY,
    ZeropageIndirect, Implied1C, ZeropageX, ZeropageX, RmwZeropageX, ZeropageBit, Implied,
    AbsoluteY, StackPush, IntWaitStop, Absolute, AbsoluteX, RmwAbsoluteX, RelativeBit,
    Immediate, ZeropageIndirectX, Immediate, Implied1C, Zeropage, Zeropage, RmwZeropage,
    ZeropageBit, ImpliedX, Immediate, Implied, Implied1C, Absolute, Absolute, RmwAbsolute,
    RelativeBit, Relative, ZeropageIndirectY, ZeropageIndirect, Implied1C, ZeropageX,
    ZeropageX, RmwZeropageX, ZeropageBit, Implied, AbsoluteY, StackPull, Implied1C, Absolute,
    AbsoluteX, RmwAbsoluteX, RelativeBit,
];

pub static OPERS: [Oper; 256] = [
    Brk, Ora, Nop, Nop, Tsb, Ora, Asl, BitMod(0), Php, Ora, Asl, Nop, Tsb, Ora, Asl,
    BitBranch(0), Bpl, Ora, Ora, Nop, Trb, Ora, Asl, BitMod(1), Clc, Ora, Inc, Nop, Trb, Ora,
    Asl, BitBranch(1), Jsr, And, Nop, Nop, Bit, And, Rol, BitMod(2), Plp, And, Rol, Nop, Bit,
    And, Rol, BitBranch(2), Bmi, And, And, Nop, Bit, And, Rol, BitMod(3), Sec, And, Dec, Nop,
    Bit, And, Rol, BitBranch(3), Rti, Eor, Nop, Nop, Nop, Eor, Lsr, BitMod(4), Pha, Eor, Lsr,
    Nop, Jmp, Eor, Lsr, BitBranch(4), Bvc, Eor, Eor, Nop, Nop, Eor, Lsr, BitMod(5), Cli, Eor,
    Phy, Nop, Nop, Eor, Lsr, BitBranch(5), Rts, Adc, Nop, Nop, Stz, Adc, Ror, BitMod(6), Pla,
    Adc, Ror, Nop, Jmp, Adc, Ror, BitBranch(6), Bvs, Adc, Adc, Nop, Stz, Adc, Ror, BitMod(7),
    Sei, Adc, Ply, Nop, Jmp, Adc, Ror, BitBranch(7), Bra, Sta, Nop, Nop, Sty, Sta, Stx,
    BitMod(8), Dec, Bit, Txa, Nop, Sty, Sta, Stx, BitBranch(8), Bcc, Sta, Sta, Nop, Sty, Sta,
    Stx, BitMod(9), Tya, Sta, Txs, Nop, Stz, Sta, Stz, BitBranch(9), Ldy, Lda, Ldx, Nop, Ldy,
    Lda, Ldx, BitMod(10), Tay, Lda, Tax, Nop, Ldy, Lda, Ldx, BitBranch(10), Bcs, Lda, Lda, Nop,
    Ldy, Lda, Ldx, BitMod(11), Clv, Lda, Tsx, Nop, Ldy, Lda, Ldx, BitBranch(11), Cpy, Cmp, Nop,
    Nop, Cpy, Cmp, Dec, BitMod(12), Inc, Cmp, Dec, Wai, Cpy, Cmp, Dec, BitBranch(12), Bne, Cmp,
    Cmp, Nop, Nop, Cmp, Dec, BitMod(13), Cld, Cmp, Phx, Stp, Nop, Cmp, Dec, BitBranch(13), Cpx,
    Sbc, Nop, Nop, Cpx, Sbc, Inc, BitMod(14), Inc, Sbc, Nop, Nop, Cpx, Sbc, Inc, BitBranch(14),
    Beq, Sbc, Sbc, Nop, Nop, Sbc, Inc, BitMod(15), Sed, Sbc, Plx, Nop, Nop, Sbc, Inc,
    BitBranch(15),
];

/// Decode opcode byte `ir` into its (mode, operation) pair.
#[inline]
pub fn decode(ir: u8) -> (Mode, Oper) {
    (MODES[ir as usize], OPERS[ir as usize])
}

/// Modes that sample (latch) pending interrupts *before* cycle 1 of the
/// instruction dispatches, rather than at their usual canonical cycle
/// later in the sequence. Resolved from the original source's
/// `w65c02s_prerun_mode`, which is the authoritative answer to the
/// "which modes latch on cycle 0" open question.
#[inline]
pub fn latches_before_cycle_one(mode: Mode) -> bool {
    matches!(
        mode,
        Mode::Implied | Mode::ImpliedX | Mode::ImpliedY | Mode::Immediate | Mode::Relative
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brk_is_opcode_zero() {
        assert_eq!(decode(0x00), (Mode::StackBrk, Oper::Brk));
    }

    #[test]
    fn lda_immediate_is_a9() {
        assert_eq!(decode(0xA9), (Mode::Immediate, Oper::Lda));
    }

    #[test]
    fn jmp_indirect_is_6c() {
        assert_eq!(decode(0x6C), (Mode::AbsoluteIndirect, Oper::Jmp));
    }

    #[test]
    fn wai_and_stp() {
        assert_eq!(decode(0xCB), (Mode::IntWaitStop, Oper::Wai));
        assert_eq!(decode(0xDB), (Mode::IntWaitStop, Oper::Stp));
    }

    #[test]
    fn rmb0_and_bbr0_share_bit_index_zero() {
        let (mode, oper) = decode(0x07);
        assert_eq!(mode, Mode::ZeropageBit);
        match oper {
            Oper::BitMod(v) => {
                assert_eq!(Oper::bit_index(v), 0);
                assert!(!Oper::bit_set(v));
            }
            _ => panic!("expected BitMod"),
        }
        let (mode, oper) = decode(0x0F);
        assert_eq!(mode, Mode::RelativeBit);
        match oper {
            Oper::BitBranch(v) => {
                assert_eq!(Oper::bit_index(v), 0);
                assert!(!Oper::bit_set(v));
            }
            _ => panic!("expected BitBranch"),
        }
    }

    #[test]
    fn smb7_and_bbs7_have_bit_index_seven_and_set_flag() {
        let (_, oper) = decode(0xF7);
        match oper {
            Oper::BitMod(v) => {
                assert_eq!(Oper::bit_index(v), 7);
                assert!(Oper::bit_set(v));
            }
            _ => panic!("expected BitMod"),
        }
        let (_, oper) = decode(0xFF);
        match oper {
            Oper::BitBranch(v) => {
                assert_eq!(Oper::bit_index(v), 7);
                assert!(Oper::bit_set(v));
            }
            _ => panic!("expected BitBranch"),
        }
    }

    #[test]
    fn every_opcode_decodes_to_something() {
        for op in 0..=255u8 {
            let _ = decode(op);
        }
    }

    #[test]
    fn implied_and_relative_latch_before_cycle_one_but_zeropage_does_not() {
        assert!(latches_before_cycle_one(Mode::Implied));
        assert!(latches_before_cycle_one(Mode::Immediate));
        assert!(latches_before_cycle_one(Mode::Relative));
        assert!(!latches_before_cycle_one(Mode::Zeropage));
        assert!(!latches_before_cycle_one(Mode::RmwZeropageX));
    }
}
