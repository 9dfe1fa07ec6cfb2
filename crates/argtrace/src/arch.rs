//! Per-architecture argument register tables.
//!
//! Registers are identified by a per-architecture slot index (`RegId`):
//! the integer bank occupies slots `0..N`, the float bank `N..N+M`, both
//! in the order the calling convention consumes them.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Architecture-local register slot index.
pub type RegId = u16;

/// Argument register bank, as consumed by the calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    /// 32-bit x86 cdecl: no argument registers, everything on the stack.
    X86,
    Arm,
    Aarch64,
}

struct RegisterFile {
    int_args: &'static [&'static str],
    float_args: &'static [&'static str],
}

/// System V AMD64.
static X86_64_REGS: RegisterFile = RegisterFile {
    int_args: &["rdi", "rsi", "rdx", "rcx", "r8", "r9"],
    float_args: &[
        "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7",
    ],
};

static X86_REGS: RegisterFile = RegisterFile {
    int_args: &[],
    float_args: &[],
};

/// AAPCS with VFP argument passing.
static ARM_REGS: RegisterFile = RegisterFile {
    int_args: &["r0", "r1", "r2", "r3"],
    float_args: &["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7"],
};

/// AAPCS64.
static AARCH64_REGS: RegisterFile = RegisterFile {
    int_args: &["x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7"],
    float_args: &["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7"],
};

impl Arch {
    fn regs(self) -> &'static RegisterFile {
        match self {
            Self::X86_64 => &X86_64_REGS,
            Self::X86 => &X86_REGS,
            Self::Arm => &ARM_REGS,
            Self::Aarch64 => &AARCH64_REGS,
        }
    }

    /// Look up a register by its ABI name, searching both banks.
    #[must_use]
    pub fn register_by_name(self, name: &str) -> Option<RegId> {
        let rf = self.regs();
        if let Some(pos) = rf.int_args.iter().position(|&r| r == name) {
            return Some(pos as RegId);
        }
        rf.float_args
            .iter()
            .position(|&r| r == name)
            .map(|pos| (rf.int_args.len() + pos) as RegId)
    }

    /// The register at `position` within a bank, or `None` once the bank
    /// is exhausted.
    #[must_use]
    pub fn register_at(self, bank: Bank, position: usize) -> Option<RegId> {
        let rf = self.regs();
        match bank {
            Bank::Int => (position < rf.int_args.len()).then_some(position as RegId),
            Bank::Float => (position < rf.float_args.len())
                .then_some((rf.int_args.len() + position) as RegId),
        }
    }

    /// Position of `reg` within its own bank (inverse of [`Self::register_at`]).
    #[must_use]
    pub fn bank_position(self, reg: RegId) -> usize {
        let int_count = self.regs().int_args.len();
        let reg = reg as usize;
        if reg < int_count { reg } else { reg - int_count }
    }

    #[must_use]
    pub fn register_name(self, reg: RegId) -> Option<&'static str> {
        let rf = self.regs();
        let reg = reg as usize;
        if reg < rf.int_args.len() {
            Some(rf.int_args[reg])
        } else {
            rf.float_args.get(reg - rf.int_args.len()).copied()
        }
    }

    /// The argument registers of one bank, in ABI order.
    #[must_use]
    pub fn bank_names(self, bank: Bank) -> &'static [&'static str] {
        let rf = self.regs();
        match bank {
            Bank::Int => rf.int_args,
            Bank::Float => rf.float_args,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::Aarch64 => "aarch64",
        };
        f.write_str(name)
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "x86_64" => Ok(Self::X86_64),
            "x86" | "i386" => Ok(Self::X86),
            "arm" => Ok(Self::Arm),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            _ => Err(Error::UnknownArch(s.to_owned())),
        }
    }
}
