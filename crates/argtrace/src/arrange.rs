//! Argument placement: give every parsed argspec a definite register or
//! stack location according to the target calling convention.
//!
//! The pass is a single left-to-right walk over the arguments in
//! declaration order. Order is load-bearing: register banks are consumed
//! exactly as the ABI consumes them, so when registers run short, the
//! first-declared arguments win. Explicit user placements are honored
//! as-is and only advance the cursor past what they occupy.

use smallvec::SmallVec;

use crate::Settings;
use crate::arch::Bank;
use crate::spec::{ArgSpec, Format, Placement};

/// Allocation state threaded through one arrangement pass.
///
/// The register fields count consumed bank positions; `next_stack_ofs` is
/// in machine words past the first stack argument slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub next_int_reg: usize,
    pub next_fp_reg: usize,
    pub next_stack_ofs: usize,
}

/// Resolve every auto-placed argument to a register or stack slot.
///
/// Never fails: once a register bank is exhausted, arguments fall back to
/// the stack, which the ABI always provides. Returns the final cursor so
/// callers can inspect what the pass consumed.
pub fn arrange(args: &mut [ArgSpec], settings: &Settings) -> Cursor {
    let mut cur = Cursor::default();

    for arg in args.iter_mut() {
        let placement = arg.placement.clone();
        match placement {
            Placement::Register(reg) => {
                // user-specified register: mark it (and everything before
                // it in its bank) as consumed
                let pos = settings.arch.bank_position(reg);
                if arg.format == Format::Float {
                    cur.next_fp_reg = pos + 1;
                } else {
                    cur.next_int_reg = pos + 1;
                }
            }
            Placement::Stack(ofs) => {
                // user-specified stack slot rebases the stack cursor
                cur.next_stack_ofs = ofs + words(arg.size, settings);
            }
            Placement::AutoInt if arg.format == Format::Struct => {
                arrange_struct(arg, &mut cur, settings);
            }
            Placement::AutoInt => take_register(arg, &mut cur, Bank::Int, settings),
            Placement::AutoFloat => take_register(arg, &mut cur, Bank::Float, settings),
            Placement::StructRegs(_) => {}
        }
    }

    cur
}

fn take_register(arg: &mut ArgSpec, cur: &mut Cursor, bank: Bank, settings: &Settings) {
    let pos = bump(cur, bank);
    // The bank cursor stays advanced past exhaustion; every later argument
    // in this bank falls through to the stack without re-probing.
    arg.placement = match settings.arch.register_at(bank, pos) {
        Some(reg) => Placement::Register(reg),
        None => spill(arg.size, cur, settings),
    };
}

/// All-or-nothing register assignment for a struct passed by value.
///
/// Attempts run on a copy of the cursor, so a failed attempt leaves both
/// register banks exactly as they were and the whole struct moves to the
/// stack. Splitting a struct between registers and stack is not
/// supported.
fn arrange_struct(arg: &mut ArgSpec, cur: &mut Cursor, settings: &Settings) {
    let mut attempt = *cur;
    let mut regs = SmallVec::new();

    let kinds = arg.field_kinds.clone();
    for kind in kinds {
        match settings.arch.register_at(kind, bump(&mut attempt, kind)) {
            Some(reg) => regs.push(reg),
            None => {
                tracing::debug!("struct register allocation failure");
                arg.placement = spill(arg.size, cur, settings);
                return;
            }
        }
    }

    arg.placement = Placement::StructRegs(regs);
    *cur = attempt;
}

fn bump(cur: &mut Cursor, bank: Bank) -> usize {
    let slot = match bank {
        Bank::Int => &mut cur.next_int_reg,
        Bank::Float => &mut cur.next_fp_reg,
    };
    let pos = *slot;
    *slot += 1;
    pos
}

fn spill(size: usize, cur: &mut Cursor, settings: &Settings) -> Placement {
    let ofs = cur.next_stack_ofs;
    cur.next_stack_ofs += words(size, settings);
    Placement::Stack(ofs)
}

/// Bytes rounded up to whole machine words.
fn words(bytes: usize, settings: &Settings) -> usize {
    let word = if settings.lp64 { 8 } else { 4 };
    bytes.div_ceil(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::spec::parse_list;

    fn arrange_spec(list: &str, settings: &Settings) -> (Vec<ArgSpec>, Cursor) {
        let mut args = parse_list(list, settings).unwrap();
        let cur = arrange(&mut args, settings);
        (args, cur)
    }

    #[test]
    fn first_declared_wins_registers() {
        // arm has four integer argument registers
        let settings = Settings::new(Arch::Arm);
        let (args, cur) = arrange_spec("arg1,arg2,arg3,arg4,arg5,arg6", &settings);

        for (i, arg) in args.iter().take(4).enumerate() {
            assert_eq!(arg.placement, Placement::Register(i as u16));
        }
        assert_eq!(args[4].placement, Placement::Stack(0));
        assert_eq!(args[5].placement, Placement::Stack(1));
        assert_eq!(cur.next_int_reg, 6);
        assert_eq!(cur.next_stack_ofs, 2);
    }

    #[test]
    fn explicit_register_consumes_earlier_slots() {
        let settings = Settings::new(Arch::Arm);
        // r2 claimed explicitly: the next auto argument gets r3, the one
        // after that spills
        let (args, _) = arrange_spec("arg1%r2,arg2,arg3", &settings);

        assert_eq!(args[0].placement, Placement::Register(2));
        assert_eq!(args[1].placement, Placement::Register(3));
        assert_eq!(args[2].placement, Placement::Stack(0));
    }

    #[test]
    fn explicit_stack_rebases_the_cursor() {
        let settings = Settings::new(Arch::X86);
        let (args, cur) = arrange_spec("arg1/x64%stack2,arg2", &settings);

        assert_eq!(args[0].placement, Placement::Stack(2));
        // 8 bytes on a 4-byte-word target is two words
        assert_eq!(args[1].placement, Placement::Stack(4));
        assert_eq!(cur.next_stack_ofs, 5);
    }

    #[test]
    fn x86_places_everything_on_the_stack() {
        let settings = Settings::new(Arch::X86);
        let (args, cur) = arrange_spec("arg1,arg2/x64", &settings);

        assert_eq!(args[0].placement, Placement::Stack(0));
        assert_eq!(args[1].placement, Placement::Stack(1));
        assert_eq!(cur.next_stack_ofs, 3);
    }

    #[test]
    fn banks_do_not_steal_from_each_other() {
        let settings = Settings::new(Arch::X86_64);
        let (args, cur) = arrange_spec("arg1,fparg2,arg3,fparg4", &settings);

        assert_eq!(args[0].placement, Placement::Register(0)); // rdi
        assert_eq!(args[1].placement, Placement::Register(6)); // xmm0
        assert_eq!(args[2].placement, Placement::Register(1)); // rsi
        assert_eq!(args[3].placement, Placement::Register(7)); // xmm1
        assert_eq!(cur.next_int_reg, 2);
        assert_eq!(cur.next_fp_reg, 2);
    }

    #[test]
    fn struct_fields_take_registers_from_both_banks() {
        let settings = Settings::new(Arch::X86_64);
        let (args, cur) = arrange_spec("arg1/t16:if,arg2", &settings);

        assert_eq!(
            args[0].placement,
            Placement::StructRegs(SmallVec::from_slice(&[0, 6])) // rdi, xmm0
        );
        assert_eq!(args[1].placement, Placement::Register(1)); // rsi
        assert_eq!(cur.next_int_reg, 2);
        assert_eq!(cur.next_fp_reg, 1);
    }

    #[test]
    fn struct_rollback_restores_register_cursors() {
        let settings = Settings::new(Arch::Arm);
        // r2 consumed explicitly leaves one free integer register; the
        // two-field struct cannot fit and must fall back whole
        let (args, cur) = arrange_spec("arg1%r2,arg2/t16:ii,arg3", &settings);

        assert_eq!(args[1].placement, Placement::Stack(0));
        assert!(matches!(args[1].format, Format::Struct));
        // 16 bytes -> 4 words on arm
        assert_eq!(cur.next_stack_ofs, 4);
        // the slot the struct probed is still free for the next argument
        assert_eq!(args[2].placement, Placement::Register(3));
    }

    #[test]
    fn struct_without_hints_keeps_empty_register_set() {
        let settings = Settings::new(Arch::X86_64);
        let (args, cur) = arrange_spec("arg1/t16", &settings);

        assert_eq!(args[0].placement, Placement::StructRegs(SmallVec::new()));
        assert_eq!(cur, Cursor::default());
    }

    #[test]
    fn explicit_placements_survive_and_rearrange_idempotently() {
        let settings = Settings::new(Arch::X86_64);
        let mut args = parse_list("arg1/i32%rdx,arg2/f%xmm1,arg3/x%stack1", &settings).unwrap();

        let before = args.clone();
        let first = arrange(&mut args, &settings);
        assert_eq!(args, before);

        let second = arrange(&mut args, &settings);
        assert_eq!(first, second);
        assert_eq!(first.next_int_reg, 3);
        assert_eq!(first.next_fp_reg, 2);
        assert_eq!(first.next_stack_ofs, 2);
    }

    #[test]
    fn resolved_structs_pass_through_unmodified() {
        let settings = Settings::new(Arch::X86_64);
        let mut args = parse_list("arg1/t8:i", &settings).unwrap();

        arrange(&mut args, &settings);
        let resolved = args.clone();
        arrange(&mut args, &settings);
        assert_eq!(args, resolved);
    }
}
