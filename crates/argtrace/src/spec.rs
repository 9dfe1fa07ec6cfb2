//! Argspec token parsing.
//!
//! An argspec describes one traced argument or return value:
//!
//! ```text
//! argument_spec = arg1/i32,arg2/x64,retval/e:Color,...
//! token         = ("arg" N | "retval" | "fparg" N) suffix?
//! suffix        = "/" fmtchar [bits] ["%" location] | "%" location
//! ```
//!
//! Parsing is strict: anything the grammar does not cover is an error and
//! no partial descriptor escapes. Placement of auto arguments happens
//! later, in [`crate::arrange`].

use std::fmt;
use std::sync::Once;

use smallvec::SmallVec;

use crate::Settings;
use crate::arch::{Arch, Bank, RegId};
use crate::error::{Error, Result};
use crate::probe::has_shared_object;

/// Base name of the LLVM C++ runtime. `S` specs are refused when it is
/// loaded since its `std::string` layout is not supported.
const LIBCXX_SONAME: &str = "libc++.so";

/// At most this many leading struct fields can carry register-bank hints.
/// Further `i`/`f` characters are consumed but not recorded.
pub const MAX_STRUCT_REG_FIELDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgIndex {
    /// Positional argument, 1-based as written in the spec.
    Arg(u32),
    /// The function's return value.
    Retval,
}

/// How the captured bytes should be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Auto,
    Sint,
    Uint,
    Hex,
    Str,
    Char,
    Float,
    StdString,
    Ptr,
    Enum(String),
    Struct,
}

/// Where an argument lives, before and after arrangement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Not yet placed; competes for the integer bank.
    AutoInt,
    /// Not yet placed; competes for the float bank.
    AutoFloat,
    Register(RegId),
    /// Offset in machine words from the first stack argument slot.
    Stack(usize),
    /// Struct fields spread over registers, one per recorded field kind.
    StructRegs(SmallVec<[RegId; MAX_STRUCT_REG_FIELDS]>),
}

/// One parsed argspec token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub index: ArgIndex,
    pub format: Format,
    /// Size in bytes; total aggregate size for structs.
    pub size: usize,
    pub placement: Placement,
    /// Register-bank hints for a struct's leading fields.
    pub field_kinds: SmallVec<[Bank; MAX_STRUCT_REG_FIELDS]>,
}

/// Parse one argspec token.
pub fn parse(token: &str, settings: &Settings) -> Result<ArgSpec> {
    let mut format = Format::Auto;
    let mut size = if settings.lp64 { 8 } else { 4 };
    let mut placement = Placement::AutoInt;

    let (index, rest) = if let Some(digits) = token.strip_prefix("arg") {
        let (idx, rest) =
            split_number(digits).ok_or_else(|| Error::BadToken(token.to_owned()))?;
        (ArgIndex::Arg(idx), rest)
    } else if let Some(rest) = token.strip_prefix("retval") {
        (ArgIndex::Retval, rest)
    } else if let Some(digits) = token.strip_prefix("fparg") {
        let (idx, rest) =
            split_number(digits).ok_or_else(|| Error::BadToken(token.to_owned()))?;
        format = Format::Float;
        placement = Placement::AutoFloat;
        size = 8;
        (ArgIndex::Arg(idx), rest)
    } else {
        tracing::debug!(token, "invalid argspec");
        return Err(Error::BadToken(token.to_owned()));
    };

    let tail = if rest.is_empty() || rest.starts_with('%') {
        rest
    } else if let Some(body) = rest.strip_prefix('/') {
        let Some(c) = body.chars().next() else {
            return Err(Error::BadFormat(token.to_owned()));
        };
        let after = &body[c.len_utf8()..];
        let sized = match c {
            'd' => {
                format = Format::Auto;
                after
            }
            'i' => {
                format = Format::Sint;
                after
            }
            'u' => {
                format = Format::Uint;
                after
            }
            'x' => {
                format = Format::Hex;
                after
            }
            's' => {
                format = Format::Str;
                after
            }
            'p' => {
                format = Format::Ptr;
                after
            }
            'c' => {
                format = Format::Char;
                size = 1;
                after
            }
            'f' => {
                format = Format::Float;
                placement = Placement::AutoFloat;
                size = 8;
                after
            }
            'S' => {
                reject_if_libcxx()?;
                format = Format::StdString;
                after
            }
            'e' => return parse_enum(after, index, size, token, settings),
            't' => return parse_struct(after, index, token),
            // a bare width like "fparg1/80" keeps the float format
            '0'..='9' if format == Format::Float => body,
            _ => return Err(Error::BadFormat(token.to_owned())),
        };

        if sized.is_empty() || sized.starts_with('%') {
            sized
        } else {
            let (bits, loc) =
                split_number(sized).ok_or_else(|| Error::BadSize(token.to_owned()))?;
            size = size_from_bits(bits, &format, token)?;
            loc
        }
    } else {
        return Err(Error::BadToken(token.to_owned()));
    };

    if let Some(loc) = tail.strip_prefix('%') {
        placement = parse_location(loc, token, settings)?;
    } else if !tail.is_empty() {
        return Err(Error::BadToken(token.to_owned()));
    }

    // ARM's C runtime silently narrows long double to double.
    if format == Format::Float && size == 10 && settings.arch == Arch::Arm {
        size = 8;
    }

    Ok(ArgSpec {
        index,
        format,
        size,
        placement,
        field_kinds: SmallVec::new(),
    })
}

/// Parse a comma-separated argspec list; any bad token rejects the whole
/// list.
pub fn parse_list(list: &str, settings: &Settings) -> Result<Vec<ArgSpec>> {
    list.split(',').map(|token| parse(token, settings)).collect()
}

/// `e:NAME` suffix. The name runs to the first `%` or the end of the
/// token; a register/stack suffix after the name is still honored.
fn parse_enum(
    rest: &str,
    index: ArgIndex,
    size: usize,
    token: &str,
    settings: &Settings,
) -> Result<ArgSpec> {
    let Some(name_part) = rest.strip_prefix(':') else {
        return Err(Error::BadEnum(token.to_owned()));
    };
    let starts_ident = name_part
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ident {
        return Err(Error::BadEnum(token.to_owned()));
    }

    let (name, tail) = match name_part.find('%') {
        Some(pos) => name_part.split_at(pos),
        None => (name_part, ""),
    };
    tracing::debug!(name, "parsing argspec for enum");

    let placement = match tail.strip_prefix('%') {
        Some(loc) => parse_location(loc, token, settings)?,
        None => Placement::AutoInt,
    };

    Ok(ArgSpec {
        index,
        format: Format::Enum(name.to_owned()),
        size,
        placement,
        field_kinds: SmallVec::new(),
    })
}

/// `t<bytes>[:<i|f>...]` suffix for an aggregate passed by value.
fn parse_struct(rest: &str, index: ArgIndex, token: &str) -> Result<ArgSpec> {
    let (bytes, mut tail) =
        split_number(rest).ok_or_else(|| Error::BadStruct(token.to_owned()))?;

    let mut field_kinds = SmallVec::new();
    if let Some(kinds) = tail.strip_prefix(':') {
        let run_len = kinds
            .find(|c| c != 'i' && c != 'f')
            .unwrap_or(kinds.len());
        for c in kinds[..run_len].chars() {
            if field_kinds.len() == MAX_STRUCT_REG_FIELDS {
                break;
            }
            field_kinds.push(if c == 'i' { Bank::Int } else { Bank::Float });
        }
        tail = &kinds[run_len..];
    }
    if !tail.is_empty() {
        return Err(Error::BadStruct(token.to_owned()));
    }

    Ok(ArgSpec {
        index,
        format: Format::Struct,
        size: bytes as usize,
        placement: Placement::AutoInt,
        field_kinds,
    })
}

/// `%stackN` or `%<register>` after the format/size suffix.
fn parse_location(loc: &str, token: &str, settings: &Settings) -> Result<Placement> {
    if let Some(digits) = loc.strip_prefix("stack") {
        let (ofs, tail) =
            split_number(digits).ok_or_else(|| Error::BadToken(token.to_owned()))?;
        if !tail.is_empty() {
            return Err(Error::BadToken(token.to_owned()));
        }
        return Ok(Placement::Stack(ofs as usize));
    }
    settings
        .arch
        .register_by_name(loc)
        .map(Placement::Register)
        .ok_or_else(|| Error::UnknownRegister(token.to_owned()))
}

fn size_from_bits(bits: u32, format: &Format, token: &str) -> Result<usize> {
    match bits {
        32 | 64 => Ok(bits as usize / 8),
        8 | 16 if *format != Format::Float => Ok(bits as usize / 8),
        80 if *format == Format::Float => Ok(10),
        _ => Err(Error::BadSize(token.to_owned())),
    }
}

/// Split a leading decimal number off `s`; `None` when there is none.
fn split_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, rest) = s.split_at(end);
    digits.parse().ok().map(|n| (n, rest))
}

fn reject_if_libcxx() -> Result<()> {
    if has_shared_object(LIBCXX_SONAME) {
        static WARNED: Once = Once::new();
        WARNED.call_once(|| {
            tracing::warn!("std::string display for {LIBCXX_SONAME} is not supported");
        });
        return Err(Error::StdStringUnsupported);
    }
    Ok(())
}

impl fmt::Display for ArgIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arg(n) => write!(f, "arg{n}"),
            Self::Retval => f.write_str("retval"),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Sint => f.write_str("sint"),
            Self::Uint => f.write_str("uint"),
            Self::Hex => f.write_str("hex"),
            Self::Str => f.write_str("str"),
            Self::Char => f.write_str("char"),
            Self::Float => f.write_str("float"),
            Self::StdString => f.write_str("std::string"),
            Self::Ptr => f.write_str("ptr"),
            Self::Enum(name) => write!(f, "enum:{name}"),
            Self::Struct => f.write_str("struct"),
        }
    }
}
