//! Line patterns for every backtrace dialect.
//!
//! Each function recognises exactly one kind of line and returns its
//! fields. Ordering between patterns and which ones are armed is decided by
//! the dialect state machine, not here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Address, DsoRecord};

//
// arch: x86_64
//
static ARCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*?\barch: ([A-Za-z0-9_-]+)\s*$").unwrap());

//
// dso: id=9b3a2c... base=0x7e5c9b2000 name=libc.so
//
static DSO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*?\bdso: id=([0-9a-fA-F]+) base=(0x[0-9a-fA-F]+) name=(.+?)\s*$").unwrap());

//
// bt#01: pc 0x7e5c9b2a1c sp 0x2bf3e7a9f0 (libc.so,0x2a1c)
//
static PLAIN_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*?\bbt#(\d+): pc (0x[0-9a-fA-F]+) sp (0x[0-9a-fA-F]+) \((\S+),(0x[0-9a-fA-F]+)\)").unwrap()
});

//
// bt#09: end
//
static END_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*?\bbt#(\d+): end\b").unwrap());

static ZIRCON_PANIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"ZIRCON KERNEL PANIC").unwrap());

//
// RIP: 0xffffffff8010b2c4  /  elr 0xffffffff00104a10  /  pc 0xffffffff00104a10
//
static ZIRCON_REGISTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bRIP: (0x[0-9a-fA-F]+)|\belr (0x[0-9a-fA-F]+)|(?:^|\s)pc (0x[0-9a-fA-F]+))").unwrap()
});

//
// bt#00: 0xffffffff8010b2c4
//
static ZIRCON_FRAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*?\bbt#(\d+): (0x[0-9a-fA-F]+)\s*$").unwrap());

static ANY_FRAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bbt#\d+:").unwrap());

//
// {{{bt:3:0x7e5c9b2a1c}}}
//
static ASAN_FRAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\{bt:(\d+):(0x[0-9a-fA-F]+)\}\}\}").unwrap());

//
// blank line, possibly behind a kernel log prefix: [00012.345] 01234.01256>
//
static ASAN_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\[[0-9.]+\] [0-9]+[.:][0-9]+> ?)?\s*$").unwrap());

/// Fields of a plain frame line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainFrameLine
{
    /// Frame number.
    pub number: u32,
    /// Program counter.
    pub pc: Address,
    /// Stack pointer.
    pub sp: Address,
    /// Declared DSO name.
    pub dso: String,
    /// Offset inside the DSO.
    pub offset: Address,
}

/// Declared architecture token.
pub fn parse_arch(line: &str) -> Option<&str>
{
    ARCH.captures(line).and_then(|captures| captures.get(1)).map(|m| m.as_str())
}

/// DSO declaration.
pub fn parse_dso(line: &str) -> Option<DsoRecord>
{
    let captures = DSO.captures(line)?;
    Some(DsoRecord {
        name: captures[3].to_string(),
        build_id: captures[1].to_ascii_lowercase(),
        load_bias: Address::from_hex(&captures[2]).ok()?,
    })
}

/// Plain frame.
pub fn parse_plain_frame(line: &str) -> Option<PlainFrameLine>
{
    let captures = PLAIN_FRAME.captures(line)?;
    Some(PlainFrameLine {
        number: captures[1].parse().ok()?,
        pc: Address::from_hex(&captures[2]).ok()?,
        sp: Address::from_hex(&captures[3]).ok()?,
        dso: captures[4].to_string(),
        offset: Address::from_hex(&captures[5]).ok()?,
    })
}

/// `bt#NN: end`.
pub fn is_end_marker(line: &str) -> bool
{
    END_MARKER.is_match(line)
}

/// Kernel panic signature.
pub fn is_zircon_panic(line: &str) -> bool
{
    ZIRCON_PANIC.is_match(line)
}

/// Faulting program counter from a kernel register dump.
///
/// Frame lines never count as register lines, even though a plain frame
/// contains `pc 0x...`.
pub fn parse_zircon_register(line: &str) -> Option<Address>
{
    if ANY_FRAME.is_match(line) {
        return None;
    }
    let captures = ZIRCON_REGISTER.captures(line)?;
    let token = captures.get(1).or_else(|| captures.get(2)).or_else(|| captures.get(3))?;
    Address::from_hex(token.as_str()).ok()
}

/// Kernel frame: `(number, address)`.
pub fn parse_zircon_frame(line: &str) -> Option<(u32, Address)>
{
    let captures = ZIRCON_FRAME.captures(line)?;
    Some((captures[1].parse().ok()?, Address::from_hex(&captures[2]).ok()?))
}

/// Sanitizer frame: `(number, address)`.
pub fn parse_asan_frame(line: &str) -> Option<(u32, Address)>
{
    let captures = ASAN_FRAME.captures(line)?;
    Some((captures[1].parse().ok()?, Address::from_hex(&captures[2]).ok()?))
}

/// Line that terminates a sanitizer backtrace.
pub fn is_asan_end(line: &str) -> bool
{
    ASAN_END.is_match(line)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_arch()
    {
        assert_eq!(parse_arch("[00001.000] 00000.00000> arch: aarch64"), Some("aarch64"));
        assert_eq!(parse_arch("arch: x86_64"), Some("x86_64"));
        assert_eq!(parse_arch("search: x86_64"), None);
    }

    #[test]
    fn test_dso()
    {
        let record = parse_dso("[00002.100] 01102.01116> dso: id=ABCDEF0123 base=0x7e5c9b2000 name=libc.so").unwrap();
        assert_eq!(record.name, "libc.so");
        assert_eq!(record.build_id, "abcdef0123");
        assert_eq!(record.load_bias, Address::new(0x7e5c_9b20_00));
        assert!(parse_dso("dso: id= base=0x1 name=x").is_none());
    }

    #[test]
    fn test_plain_frame()
    {
        let frame = parse_plain_frame("devmgr: bt#01: pc 0x7e5c9b2a1c sp 0x2bf3e7a9f0 (libc.so,0x2a1c)").unwrap();
        assert_eq!(frame.number, 1);
        assert_eq!(frame.pc, Address::new(0x7e5c_9b2a_1c));
        assert_eq!(frame.sp, Address::new(0x2b_f3e7_a9f0));
        assert_eq!(frame.dso, "libc.so");
        assert_eq!(frame.offset, Address::new(0x2a1c));
        assert!(parse_plain_frame("bt#01: 0xffffffff8010b2c4").is_none());
    }

    #[test]
    fn test_end_marker()
    {
        assert!(is_end_marker("[00003.000] 01102.01116> bt#10: end"));
        assert!(!is_end_marker("bt#10: endless"));
        assert!(!is_end_marker("bt#10: 0x1000"));
    }

    #[test]
    fn test_zircon_lines()
    {
        assert!(is_zircon_panic("ZIRCON KERNEL PANIC"));
        assert_eq!(parse_zircon_register(" RIP: 0xffffffff8010b2c4"), Some(Address::new(0xffff_ffff_8010_b2c4)));
        assert_eq!(parse_zircon_register("elr 0xffffffff00104a10"), Some(Address::new(0xffff_ffff_0010_4a10)));
        assert_eq!(parse_zircon_register("bt#01: pc 0x1 sp 0x2 (libc.so,0x1)"), None);
        assert_eq!(parse_zircon_frame("bt#02: 0xffffffff8010b2c4"), Some((2, Address::new(0xffff_ffff_8010_b2c4))));
        assert_eq!(parse_zircon_frame("bt#02: pc 0x1 sp 0x2 (libc.so,0x1)"), None);
    }

    #[test]
    fn test_asan_lines()
    {
        assert_eq!(parse_asan_frame("{{{bt:3:0x2050}}}"), Some((3, Address::new(0x2050))));
        assert_eq!(parse_asan_frame("   #3 {{{bt:12:0x7e5c9b2a1c}}}"), Some((12, Address::new(0x7e5c_9b2a_1c))));
        assert!(is_asan_end(""));
        assert!(is_asan_end("   "));
        assert!(is_asan_end("[00012.345] 01234.01256> "));
        assert!(!is_asan_end("{{{bt:3:0x2050}}}"));
    }
}
