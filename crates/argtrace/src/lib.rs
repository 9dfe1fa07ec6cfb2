#![allow(
    clippy::cast_possible_truncation // register tables are tiny; bank positions always fit in a RegId
)]

//! Parse trace argument specifications ("argspec") and compute where each
//! argument lives according to the target calling convention.
//!
//! The pipeline has two stages: [`spec::parse`] turns one argspec token
//! into an [`spec::ArgSpec`] descriptor, and [`arrange::arrange`] walks an
//! ordered descriptor list once, assigning every auto-placed argument a
//! register or stack slot while honoring explicit placements.

pub mod arch;
pub mod arrange;
pub mod error;
pub mod probe;
pub mod spec;

pub use arch::{Arch, Bank, RegId};
pub use arrange::{Cursor, arrange};
pub use error::{Error, Result};
pub use spec::{ArgIndex, ArgSpec, Format, MAX_STRUCT_REG_FIELDS, Placement, parse, parse_list};

/// Global settings for one parse/arrange pass, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub arch: Arch,
    /// 64-bit target: 8-byte default argument size and 8-byte stack words.
    pub lp64: bool,
}

impl Settings {
    /// Settings with the natural pointer width for `arch`.
    #[must_use]
    pub const fn new(arch: Arch) -> Self {
        Self {
            arch,
            lp64: matches!(arch, Arch::X86_64 | Arch::Aarch64),
        }
    }
}
