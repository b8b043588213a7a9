//! Catalog of intercepted functions.
//!
//! Every cataloged function (a *leaf*) owns exactly one bit of a `u64`. The
//! numbering is fixed across platforms: a leaf that only exists on one
//! operating system keeps its bit everywhere, it simply has no constant and is
//! never part of a composite on the other.
//!
//! Composite categories ([`CheckFlags::MEMORY`], [`CheckFlags::THREADS`], ...)
//! are computed from [`CATALOG`] at compile time, so the grouping is data and a
//! composite can never carry a bit that is not a leaf of the current platform.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::str::FromStr;

/// Function family a leaf belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Memory,
    Threads,
    Sleeping,
    Files,
    System,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Memory,
        Self::Threads,
        Self::Sleeping,
        Self::Files,
        Self::System,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Threads => "threads",
            Self::Sleeping => "sleeping",
            Self::Files => "files",
            Self::System => "sys",
        }
    }

    /// Union of every leaf of this category available on the current platform.
    #[must_use]
    pub const fn flags(self) -> CheckFlags {
        let mut bits = 0u64;
        let mut i = 0;
        while i < CATALOG.len() {
            let leaf = &CATALOG[i];
            if leaf.category as u8 == self as u8 && leaf.platform.is_current() {
                bits |= 1u64 << leaf.bit;
            }
            i += 1;
        }
        CheckFlags(bits)
    }
}

/// Operating system family a leaf is intercepted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Any,
    Linux,
    Apple,
}

impl Platform {
    #[must_use]
    pub const fn is_current(self) -> bool {
        match self {
            Self::Any => true,
            Self::Linux => cfg!(target_os = "linux"),
            Self::Apple => cfg!(target_vendor = "apple"),
        }
    }
}

/// One cataloged function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub name: &'static str,
    pub bit: u8,
    pub category: Category,
    pub platform: Platform,
}

const fn leaf(name: &'static str, bit: u8, category: Category, platform: Platform) -> Leaf {
    Leaf {
        name,
        bit,
        category,
        platform,
    }
}

/// Every leaf on every platform, in bit order.
pub const CATALOG: &[Leaf] = &[
    leaf("malloc", 0, Category::Memory, Platform::Any),
    leaf("calloc", 1, Category::Memory, Platform::Any),
    leaf("realloc", 2, Category::Memory, Platform::Any),
    leaf("reallocf", 3, Category::Memory, Platform::Apple),
    leaf("valloc", 4, Category::Memory, Platform::Any),
    leaf("free", 5, Category::Memory, Platform::Any),
    leaf("posix_memalign", 6, Category::Memory, Platform::Any),
    leaf("mmap", 7, Category::Memory, Platform::Any),
    leaf("munmap", 8, Category::Memory, Platform::Any),
    leaf("pthread_create", 9, Category::Threads, Platform::Any),
    leaf("pthread_mutex_lock", 10, Category::Threads, Platform::Any),
    leaf("pthread_mutex_unlock", 11, Category::Threads, Platform::Any),
    leaf("pthread_join", 12, Category::Threads, Platform::Any),
    leaf("pthread_cond_signal", 13, Category::Threads, Platform::Any),
    leaf("pthread_cond_broadcast", 14, Category::Threads, Platform::Any),
    leaf("pthread_cond_wait", 15, Category::Threads, Platform::Any),
    leaf("pthread_rwlock_init", 16, Category::Threads, Platform::Any),
    leaf("pthread_rwlock_destroy", 17, Category::Threads, Platform::Any),
    leaf("pthread_cond_timedwait", 18, Category::Threads, Platform::Any),
    leaf("pthread_rwlock_rdlock", 19, Category::Threads, Platform::Any),
    leaf("pthread_rwlock_unlock", 20, Category::Threads, Platform::Any),
    leaf("pthread_rwlock_wrlock", 21, Category::Threads, Platform::Any),
    leaf("pthread_spin_lock", 22, Category::Threads, Platform::Linux),
    leaf("futex", 23, Category::Threads, Platform::Linux),
    leaf("sleep", 24, Category::Sleeping, Platform::Any),
    leaf("usleep", 25, Category::Sleeping, Platform::Any),
    leaf("nanosleep", 26, Category::Sleeping, Platform::Any),
    leaf("stat", 27, Category::Files, Platform::Any),
    leaf("fstat", 28, Category::Files, Platform::Any),
    leaf("open", 29, Category::Files, Platform::Any),
    leaf("fopen", 30, Category::Files, Platform::Any),
    leaf("openat", 31, Category::Files, Platform::Any),
    leaf("schedule", 32, Category::System, Platform::Linux),
    leaf("context_switch", 33, Category::System, Platform::Linux),
    leaf("syscall", 34, Category::System, Platform::Any),
    leaf("OSSpinLockLock", 35, Category::Threads, Platform::Apple),
    leaf("os_unfair_lock_lock", 36, Category::Threads, Platform::Apple),
    leaf("fcntl", 37, Category::Files, Platform::Any),
];

// Leaves never share a bit and never leave the 64-bit space.
const _: () = {
    let mut seen = 0u64;
    let mut i = 0;
    while i < CATALOG.len() {
        assert!(CATALOG[i].bit < 64, "check flag bit out of range");
        let bit = 1u64 << CATALOG[i].bit;
        assert!(seen & bit == 0, "check flag bits overlap");
        seen |= bit;
        i += 1;
    }
};

/// Set of check flags: a single leaf, a category, or any mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CheckFlags(u64);

impl CheckFlags {
    pub const NONE: Self = Self(0);

    // memory
    pub const MALLOC: Self = Self::bit(0);
    pub const CALLOC: Self = Self::bit(1);
    pub const REALLOC: Self = Self::bit(2);
    #[cfg(target_vendor = "apple")]
    pub const REALLOCF: Self = Self::bit(3);
    pub const VALLOC: Self = Self::bit(4);
    pub const FREE: Self = Self::bit(5);
    pub const POSIX_MEMALIGN: Self = Self::bit(6);
    pub const MMAP: Self = Self::bit(7);
    pub const MUNMAP: Self = Self::bit(8);

    // threads
    pub const PTHREAD_CREATE: Self = Self::bit(9);
    pub const PTHREAD_MUTEX_LOCK: Self = Self::bit(10);
    pub const PTHREAD_MUTEX_UNLOCK: Self = Self::bit(11);
    pub const PTHREAD_JOIN: Self = Self::bit(12);
    pub const PTHREAD_COND_SIGNAL: Self = Self::bit(13);
    pub const PTHREAD_COND_BROADCAST: Self = Self::bit(14);
    pub const PTHREAD_COND_WAIT: Self = Self::bit(15);
    pub const PTHREAD_RWLOCK_INIT: Self = Self::bit(16);
    pub const PTHREAD_RWLOCK_DESTROY: Self = Self::bit(17);
    pub const PTHREAD_COND_TIMEDWAIT: Self = Self::bit(18);
    pub const PTHREAD_RWLOCK_RDLOCK: Self = Self::bit(19);
    pub const PTHREAD_RWLOCK_UNLOCK: Self = Self::bit(20);
    pub const PTHREAD_RWLOCK_WRLOCK: Self = Self::bit(21);
    #[cfg(target_os = "linux")]
    pub const PTHREAD_SPIN_LOCK: Self = Self::bit(22);
    #[cfg(target_os = "linux")]
    pub const FUTEX: Self = Self::bit(23);
    #[cfg(target_vendor = "apple")]
    pub const OS_SPIN_LOCK_LOCK: Self = Self::bit(35);
    #[cfg(target_vendor = "apple")]
    pub const OS_UNFAIR_LOCK_LOCK: Self = Self::bit(36);

    // sleeping
    pub const SLEEP: Self = Self::bit(24);
    pub const USLEEP: Self = Self::bit(25);
    pub const NANOSLEEP: Self = Self::bit(26);

    // files
    pub const STAT: Self = Self::bit(27);
    pub const FSTAT: Self = Self::bit(28);
    pub const OPEN: Self = Self::bit(29);
    pub const FOPEN: Self = Self::bit(30);
    pub const OPENAT: Self = Self::bit(31);
    pub const FCNTL: Self = Self::bit(37);

    // system
    #[cfg(target_os = "linux")]
    pub const SCHEDULE: Self = Self::bit(32);
    #[cfg(target_os = "linux")]
    pub const CONTEXT_SWITCH: Self = Self::bit(33);
    pub const SYSCALL: Self = Self::bit(34);

    pub const MEMORY: Self = Category::Memory.flags();
    pub const THREADS: Self = Category::Threads.flags();
    pub const SLEEPING: Self = Category::Sleeping.flags();
    pub const FILES: Self = Category::Files.flags();
    pub const SYS: Self = Category::System.flags();

    /// Every leaf of the current platform.
    pub const ALL: Self = Self(
        Self::MEMORY.0 | Self::THREADS.0 | Self::SLEEPING.0 | Self::FILES.0 | Self::SYS.0,
    );

    const fn bit(index: u8) -> Self {
        Self(1u64 << index)
    }

    /// Wrap a raw mask. Bits outside the catalog are kept as-is.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when exactly one bit is set.
    #[must_use]
    pub const fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether this check is still active under the `disabled` mask.
    ///
    /// A set counts as disabled only when all of its bits are disabled, so a
    /// partially silenced category still reports its remaining leaves.
    #[must_use]
    pub const fn is_enabled_under(self, disabled: Self) -> bool {
        !disabled.contains(self)
    }

    /// Catalog entry for a single-bit set.
    #[must_use]
    pub fn leaf(self) -> Option<&'static Leaf> {
        if !self.is_single() {
            return None;
        }
        let index = self.0.trailing_zeros() as u8;
        CATALOG.iter().find(|leaf| leaf.bit == index)
    }

    /// Leaves of the current platform contained in this set.
    pub fn leaves(self) -> impl Iterator<Item = &'static Leaf> {
        CATALOG
            .iter()
            .filter(move |leaf| leaf.platform.is_current() && self.0 & (1u64 << leaf.bit) != 0)
    }

    /// Look up a leaf or category by its name (`"malloc"`, `"memory"`, `"all"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("all") {
            return Some(Self::ALL);
        }
        if let Some(category) = Category::ALL
            .iter()
            .find(|category| category.name().eq_ignore_ascii_case(name))
        {
            return Some(category.flags());
        }
        CATALOG
            .iter()
            .find(|leaf| leaf.platform.is_current() && leaf.name == name)
            .map(|leaf| Self::bit(leaf.bit))
    }
}

impl BitOr for CheckFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CheckFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CheckFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for CheckFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl From<CheckFlags> for u64 {
    fn from(flags: CheckFlags) -> Self {
        flags.0
    }
}

impl fmt::Debug for CheckFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CheckFlags({:#x}: {self})", self.0)
    }
}

impl fmt::Display for CheckFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for leaf in self.leaves() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(leaf.name)?;
            first = false;
        }
        let known = self.leaves().fold(0u64, |acc, leaf| acc | (1u64 << leaf.bit));
        let unknown = self.0 & !known;
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}

/// Error returned when parsing an unknown flag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCheckFlag(pub String);

impl fmt::Display for UnknownCheckFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown check flag `{}`", self.0)
    }
}

impl std::error::Error for UnknownCheckFlag {}

impl FromStr for CheckFlags {
    type Err = UnknownCheckFlag;

    /// Parses `|`- or `,`-separated leaf and category names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Self::NONE;
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("none") {
                continue;
            }
            flags |= Self::from_name(part).ok_or_else(|| UnknownCheckFlag(part.to_string()))?;
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_platform_leaves_are_single_bits() {
        for leaf in CheckFlags::ALL.leaves() {
            let flag = CheckFlags::from_name(leaf.name).unwrap();
            assert!(flag.is_single(), "{} is not a single bit", leaf.name);
            assert_eq!(flag.leaf().unwrap().name, leaf.name);
        }
    }

    #[test]
    fn leaf_names_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn categories_partition_all() {
        let mut union = CheckFlags::NONE;
        for category in Category::ALL {
            assert!(!union.intersects(category.flags()), "{:?} overlaps", category);
            union |= category.flags();
        }
        assert_eq!(union, CheckFlags::ALL);
    }

    #[test]
    fn memory_is_union_of_its_leaves() {
        let expected = CheckFlags::MALLOC
            | CheckFlags::CALLOC
            | CheckFlags::REALLOC
            | CheckFlags::VALLOC
            | CheckFlags::FREE
            | CheckFlags::POSIX_MEMALIGN
            | CheckFlags::MMAP
            | CheckFlags::MUNMAP;
        #[cfg(target_vendor = "apple")]
        let expected = expected | CheckFlags::REALLOCF;
        assert_eq!(CheckFlags::MEMORY, expected);
    }

    #[test]
    fn sleeping_and_files_composites() {
        assert_eq!(
            CheckFlags::SLEEPING,
            CheckFlags::SLEEP | CheckFlags::USLEEP | CheckFlags::NANOSLEEP
        );
        assert_eq!(
            CheckFlags::FILES,
            CheckFlags::STAT
                | CheckFlags::FSTAT
                | CheckFlags::OPEN
                | CheckFlags::FOPEN
                | CheckFlags::OPENAT
                | CheckFlags::FCNTL
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_only_leaves_are_in_their_categories() {
        assert!(CheckFlags::THREADS.contains(CheckFlags::PTHREAD_SPIN_LOCK));
        assert!(CheckFlags::THREADS.contains(CheckFlags::FUTEX));
        assert!(CheckFlags::SYS.contains(CheckFlags::SCHEDULE | CheckFlags::CONTEXT_SWITCH));
        assert_eq!(CheckFlags::from_name("reallocf"), None);
        assert!(!CheckFlags::MEMORY.intersects(CheckFlags::from_bits(1 << 3)));
    }

    #[test]
    fn bit_numbering_is_stable() {
        assert_eq!(CheckFlags::MALLOC.bits(), 1);
        assert_eq!(CheckFlags::FREE.bits(), 1 << 5);
        assert_eq!(CheckFlags::OPENAT.bits(), 1 << 31);
        assert_eq!(CheckFlags::SYSCALL.bits(), 1 << 34);
        assert_eq!(CheckFlags::FCNTL.bits(), 1 << 37);
    }

    #[test]
    fn enabled_only_when_not_every_bit_is_disabled() {
        let disabled = CheckFlags::MALLOC | CheckFlags::REALLOC;
        assert!(!CheckFlags::MALLOC.is_enabled_under(disabled));
        assert!(CheckFlags::CALLOC.is_enabled_under(disabled));
        assert!(!(CheckFlags::MALLOC | CheckFlags::REALLOC).is_enabled_under(disabled));
        assert!((CheckFlags::MALLOC | CheckFlags::CALLOC).is_enabled_under(disabled));
        assert!(CheckFlags::MEMORY.is_enabled_under(disabled));
        assert!(!CheckFlags::MEMORY.is_enabled_under(CheckFlags::MEMORY));
        assert!(CheckFlags::OPENAT.is_enabled_under(CheckFlags::NONE));
    }

    #[test]
    fn parse_names_and_categories() {
        assert_eq!("memory".parse::<CheckFlags>(), Ok(CheckFlags::MEMORY));
        assert_eq!(
            "malloc | sleeping".parse::<CheckFlags>(),
            Ok(CheckFlags::MALLOC | CheckFlags::SLEEPING)
        );
        assert_eq!("open,fcntl".parse::<CheckFlags>(), Ok(CheckFlags::OPEN | CheckFlags::FCNTL));
        assert_eq!("".parse::<CheckFlags>(), Ok(CheckFlags::NONE));
        assert_eq!("ALL".parse::<CheckFlags>(), Ok(CheckFlags::ALL));
        assert_eq!(
            "malloc|bogus".parse::<CheckFlags>(),
            Err(UnknownCheckFlag("bogus".to_string()))
        );
    }

    #[test]
    fn display_lists_leaf_names() {
        assert_eq!(CheckFlags::NONE.to_string(), "none");
        assert_eq!(
            (CheckFlags::MALLOC | CheckFlags::FREE).to_string(),
            "malloc|free"
        );
        assert_eq!(CheckFlags::from_bits(1 << 63).to_string(), "0x8000000000000000");
    }
}
