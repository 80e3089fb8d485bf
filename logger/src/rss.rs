//! Resident memory sampling for log line headers.
use std::fmt;
#[cfg(target_os = "linux")]
use std::{
    cell::RefCell,
    fs::File,
    io::{Read, Seek},
};

/// A byte count printed with a binary unit suffix in a fixed width column.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Bytes(pub usize);

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(usize, char); 3] = [(10, 'K'), (20, 'M'), (30, 'G')];
        if self.0 < 1000 {
            return write!(f, "{:5}B", self.0);
        }
        let (shift, unit) = UNITS
            .into_iter()
            .find(|&(shift, _)| self.0 < 1000 << shift || shift == 30)
            .unwrap_or((30, 'G'));
        write!(f, "{:5.1}{unit}", self.0 as f64 / (1u64 << shift) as f64)
    }
}

/// Current and peak resident set size of this process.
#[derive(Clone, Copy, Default, Debug)]
pub struct Rss {
    /// Resident memory right now.
    pub current: Bytes,
    /// Highest resident memory so far.
    pub peak: Bytes,
}

#[cfg(target_os = "linux")]
struct Statm {
    file: File,
    buf: String,
    page_size: usize,
}

#[cfg(target_os = "linux")]
thread_local! {
    static STATM: RefCell<Option<Statm>> = const { RefCell::new(None) };
}

fn peak_rss() -> Option<usize> {
    // SAFETY: rusage is plain old data so all zeros is valid
    let mut rusage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: getrusage only writes to the passed pointer, which is valid for a `rusage`
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut rusage) } < 0 {
        return None;
    }
    let max = rusage.ru_maxrss as usize;
    // Linux reports kilobytes, macOS bytes.
    Some(if cfg!(target_os = "macos") { max } else { max * 1024 })
}

#[cfg(target_os = "linux")]
fn current_rss() -> Option<usize> {
    STATM.with_borrow_mut(|statm| {
        if statm.is_none() {
            *statm = Some(Statm {
                file: File::open("/proc/self/statm").ok()?,
                buf: String::new(),
                // SAFETY: sysconf has no memory safety preconditions
                page_size: unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize,
            });
        }
        let statm = statm.as_mut()?;
        statm.file.rewind().ok()?;
        statm.buf.clear();
        statm.file.read_to_string(&mut statm.buf).ok()?;
        let pages: usize = statm.buf.split_ascii_whitespace().nth(1)?.parse().ok()?;
        Some(pages * statm.page_size)
    })
}

#[cfg(not(target_os = "linux"))]
fn current_rss() -> Option<usize> {
    None
}

impl Rss {
    /// Samples the memory usage, reporting zero for anything the platform does not provide.
    pub fn now() -> Self {
        if cfg!(miri) {
            return Self::default();
        }
        let peak = peak_rss().unwrap_or(0);
        Rss {
            current: Bytes(current_rss().unwrap_or(peak)),
            peak: Bytes(peak),
        }
    }
}
