//! `%` specifier expansion backed by a lazily populated identity cache.
use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::io;

use crate::error::SpecifierError;

/// Upper bound on the length of an expanded path, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";
const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Source of the host identity values that specifiers expand to.
pub trait SystemIdentity {
    /// Current boot ID (`%b`).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    fn boot_id(&self) -> io::Result<String>;

    /// Machine ID (`%m`).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    fn machine_id(&self) -> io::Result<String>;

    /// Host name (`%H`).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    fn hostname(&self) -> io::Result<String>;

    /// Kernel release (`%v`).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be read.
    fn kernel_release(&self) -> io::Result<String>;
}

/// Identity of the running host, read from procfs, `/etc` and `uname(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostIdentity;

fn read_id_file(path: &str, min_len: usize) -> io::Result<String> {
    let raw = fs::read_to_string(path)?;
    let id = raw.trim().to_string();
    if id.len() < min_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{path}: value too short"),
        ));
    }
    Ok(id)
}

impl SystemIdentity for HostIdentity {
    fn boot_id(&self) -> io::Result<String> {
        read_id_file(BOOT_ID_PATH, 36)
    }

    fn machine_id(&self) -> io::Result<String> {
        read_id_file(MACHINE_ID_PATH, 32)
    }

    fn hostname(&self) -> io::Result<String> {
        let name = nix::unistd::gethostname()?;
        name.into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not UTF-8"))
    }

    fn kernel_release(&self) -> io::Result<String> {
        let uts = nix::sys::utsname::uname()?;
        Ok(uts.release().to_string_lossy().into_owned())
    }
}

/// A recognised specifier letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Specifier {
    BootId,
    MachineId,
    Hostname,
    KernelRelease,
}

impl Specifier {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            'b' => Some(Self::BootId),
            'm' => Some(Self::MachineId),
            'H' => Some(Self::Hostname),
            'v' => Some(Self::KernelRelease),
            _ => None,
        }
    }
}

/// Per-process cache of identity values.
///
/// Each value is looked up at most once; a failed lookup is cached as
/// `None` so the warning is logged only the first time.
pub struct IdentityCache {
    provider: Box<dyn SystemIdentity>,
    boot_id: OnceCell<Option<String>>,
    machine_id: OnceCell<Option<String>>,
    hostname: OnceCell<Option<String>>,
    kernel_release: OnceCell<Option<String>>,
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("boot_id", &self.boot_id.get())
            .field("machine_id", &self.machine_id.get())
            .field("hostname", &self.hostname.get())
            .field("kernel_release", &self.kernel_release.get())
            .finish_non_exhaustive()
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new(Box::new(HostIdentity))
    }
}

impl IdentityCache {
    /// Create an empty cache over `provider`.
    #[must_use]
    pub fn new(provider: Box<dyn SystemIdentity>) -> Self {
        Self {
            provider,
            boot_id: OnceCell::new(),
            machine_id: OnceCell::new(),
            hostname: OnceCell::new(),
            kernel_release: OnceCell::new(),
        }
    }

    fn lookup(&self, spec: Specifier) -> Option<&str> {
        let (cell, name) = match spec {
            Specifier::BootId => (&self.boot_id, "boot ID"),
            Specifier::MachineId => (&self.machine_id, "machine ID"),
            Specifier::Hostname => (&self.hostname, "hostname"),
            Specifier::KernelRelease => (&self.kernel_release, "kernel release"),
        };
        cell.get_or_init(|| {
            let result = match spec {
                Specifier::BootId => self.provider.boot_id(),
                Specifier::MachineId => self.provider.machine_id(),
                Specifier::Hostname => self.provider.hostname(),
                Specifier::KernelRelease => self.provider.kernel_release(),
            };
            result
                .map_err(|e| tracing::warn!("cannot determine {name}: {e}"))
                .ok()
        })
        .as_deref()
    }
}

fn push_checked(out: &mut String, s: &str) -> Result<(), SpecifierError> {
    if out.len() + s.len() > MAX_PATH_LEN {
        return Err(SpecifierError::TooLong {
            limit: MAX_PATH_LEN,
        });
    }
    out.push_str(s);
    Ok(())
}

/// Expand `%b`, `%m`, `%H`, `%v` and `%%` in `input`.
///
/// A specifier whose value cannot be determined is left in place. An
/// unknown specifier, or a lone `%` at the end of the input, is dropped
/// with a warning.
///
/// # Errors
///
/// Returns [`SpecifierError::TooLong`] if the result would exceed
/// [`MAX_PATH_LEN`] bytes.
pub fn expand(input: &str, cache: &IdentityCache) -> Result<String, SpecifierError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        if c != '%' {
            push_checked(&mut out, c.encode_utf8(&mut buf))?;
            continue;
        }
        match chars.next() {
            None => tracing::warn!("trailing '%' dropped in {input}"),
            Some('%') => push_checked(&mut out, "%")?,
            Some(letter) => match Specifier::from_char(letter) {
                Some(spec) => match cache.lookup(spec) {
                    Some(value) => push_checked(&mut out, value)?,
                    None => {
                        push_checked(&mut out, "%")?;
                        push_checked(&mut out, letter.encode_utf8(&mut buf))?;
                    }
                },
                None => tracing::warn!("unhandled specifier '%{letter}' in {input}"),
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Identity with fixed values; `None` simulates a failed lookup.
    struct FakeIdentity {
        hostname: Option<&'static str>,
        boot_id: Option<&'static str>,
        calls: Rc<Cell<u32>>,
    }

    fn unavailable() -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, "missing")
    }

    impl SystemIdentity for FakeIdentity {
        fn boot_id(&self) -> io::Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.boot_id.map(String::from).ok_or_else(unavailable)
        }
        fn machine_id(&self) -> io::Result<String> {
            Ok("0123456789abcdef0123456789abcdef".to_string())
        }
        fn hostname(&self) -> io::Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.hostname.map(String::from).ok_or_else(unavailable)
        }
        fn kernel_release(&self) -> io::Result<String> {
            Ok("6.1.0-test".to_string())
        }
    }

    fn cache(hostname: Option<&'static str>, boot_id: Option<&'static str>) -> (IdentityCache, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let provider = FakeIdentity {
            hostname,
            boot_id,
            calls: Rc::clone(&calls),
        };
        (IdentityCache::new(Box::new(provider)), calls)
    }

    #[test]
    fn percent_escape_then_hostname() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("%%%H", &c).unwrap(), "%box1");
    }

    #[test]
    fn plain_path_unchanged() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("/var/tmp/x", &c).unwrap(), "/var/tmp/x");
    }

    #[test]
    fn all_specifiers_expand() {
        let (c, _) = cache(Some("h"), Some("b"));
        assert_eq!(
            expand("/%b/%m/%H/%v", &c).unwrap(),
            "/b/0123456789abcdef0123456789abcdef/h/6.1.0-test"
        );
    }

    #[test]
    fn unresolvable_specifier_left_in_place() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("/run/%b/x", &c).unwrap(), "/run/%b/x");
    }

    #[test]
    fn unknown_specifier_dropped() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("/a%zb", &c).unwrap(), "/ab");
    }

    #[test]
    fn trailing_percent_dropped() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("/a%", &c).unwrap(), "/a");
    }

    #[test]
    fn lookups_are_cached() {
        let (c, calls) = cache(Some("box1"), None);
        expand("/%H/%H", &c).unwrap();
        expand("/%H", &c).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_lookups_are_cached() {
        let (c, calls) = cache(Some("h"), None);
        expand("/%b", &c).unwrap();
        expand("/%b", &c).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn overlong_expansion_fails() {
        let (c, _) = cache(Some("box1"), None);
        let input = "/x".repeat(MAX_PATH_LEN);
        assert_eq!(
            expand(&input, &c),
            Err(SpecifierError::TooLong {
                limit: MAX_PATH_LEN
            })
        );
    }

    #[test]
    fn non_ascii_passes_through() {
        let (c, _) = cache(Some("box1"), None);
        assert_eq!(expand("/tmp/ünï", &c).unwrap(), "/tmp/ünï");
    }
}
