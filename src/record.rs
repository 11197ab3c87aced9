use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::ptr::NonNull;
use std::time::{Duration, Instant};

/// Opaque identity of an allocation.
///
/// The address is only ever used as a map key: the tracker never reads, writes or frees
/// the memory it points to. The zero value is the null address and is ignored by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(usize);

impl Address {
    /// The null address.
    pub const NULL: Address = Address(0);

    /// Creates an [`Address`] from a raw integer value.
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Creates an [`Address`] from the location of a value.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self::from(value as *const T)
    }

    /// Returns `true` if this is the null address.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw integer value of the address.
    pub const fn get(&self) -> usize {
        self.0
    }
}

impl From<usize> for Address {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl<T: ?Sized> From<*const T> for Address {
    fn from(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }
}

impl<T: ?Sized> From<*mut T> for Address {
    fn from(ptr: *mut T) -> Self {
        Self::from(ptr.cast_const())
    }
}

impl<T: ?Sized> From<NonNull<T>> for Address {
    fn from(ptr: NonNull<T>) -> Self {
        Self::from(ptr.as_ptr())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Source location which reported an allocation (e.g. `src/cache.rs:42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    file: Cow<'static, str>,
    line: u32,
}

impl Origin {
    /// Creates a new [`Origin`] from a file name and a line number.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Returns the [`Origin`] of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl From<&'static Location<'static>> for Origin {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl From<(&'static str, u32)> for Origin {
    fn from((file, line): (&'static str, u32)) -> Self {
        Self::new(file, line)
    }
}

impl From<(String, u32)> for Origin {
    fn from((file, line): (String, u32)) -> Self {
        Self::new(file, line)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A live allocation in the tracker registry.
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    address: Address,
    size: usize,
    origin: Origin,
    timestamp: Instant,
}

impl AllocationRecord {
    pub(crate) fn new(address: Address, size: usize, origin: Origin) -> Self {
        Self {
            address,
            size,
            origin,
            timestamp: Instant::now(),
        }
    }

    /// Returns the address of the allocation.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the size of the allocation in bytes, as reported by the caller.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns where the allocation was reported from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns when the allocation was recorded.
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns how long the allocation has been alive.
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}
