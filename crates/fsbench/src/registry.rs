//! Catalog of the filesystems the harness knows how to launch.
//!
//! Each entry names the executable to start, the arguments it mounts with,
//! and a representative file inside the mount that the workload targets.
//! The fixture files are expected to exist already; nothing here creates them.

use crate::error::{BenchError, Result};
use std::path::Path;

/// How a filesystem is exposed to the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// A FUSE server that must be mounted and later unmounted.
    Fuse,
    /// The host filesystem, used as a baseline. Nothing is launched.
    Native,
}

/// Runtime the filesystem executable was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// Ordinary native executable.
    Plain,
    /// GHC-compiled executable; accepts `+RTS ... -RTS` tuning flags.
    Ghc,
}

/// A benchmarkable filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filesystem {
    /// Short identifier used on the command line.
    pub ident: &'static str,
    /// Executable name, resolved through `PATH`.
    pub binary: &'static str,
    /// File the workload operates on.
    pub filename: &'static str,
    /// Arguments passed before any mount options.
    pub args: &'static [&'static str],
    pub kind: MountKind,
    pub runtime: Runtime,
    /// Directory to unmount when it isn't the parent of `filename`.
    mount_dir_override: Option<&'static str>,
}

const FSCQ_ARGS: &[&str] = &["disk.img", "/tmp/fscq"];
const HELLO_ARGS: &[&str] = &["/tmp/hellofs"];

static FILESYSTEMS: &[Filesystem] = &[
    Filesystem {
        ident: "fscq",
        binary: "fscq",
        filename: "/tmp/fscq/small-4k",
        args: FSCQ_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Ghc,
        mount_dir_override: None,
    },
    Filesystem {
        ident: "cfscq",
        binary: "cfscq",
        filename: "/tmp/fscq/small-4k",
        args: FSCQ_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Ghc,
        mount_dir_override: None,
    },
    Filesystem {
        ident: "hfuse",
        binary: "HelloFS",
        filename: "/tmp/hellofs/hello",
        args: HELLO_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Ghc,
        mount_dir_override: None,
    },
    Filesystem {
        ident: "cfuse",
        binary: "c-hellofs",
        filename: "/tmp/hellofs/hello",
        args: HELLO_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Plain,
        mount_dir_override: None,
    },
    Filesystem {
        ident: "hello",
        binary: "hello",
        filename: "/tmp/hellofs/hello",
        args: HELLO_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Plain,
        mount_dir_override: None,
    },
    // Passthrough mirrors `/`, so the fixture sits one level deeper.
    Filesystem {
        ident: "fusexmp",
        binary: "passthrough",
        filename: "/tmp/hellofs/etc/passwd",
        args: HELLO_ARGS,
        kind: MountKind::Fuse,
        runtime: Runtime::Plain,
        mount_dir_override: Some("/tmp/hellofs"),
    },
    Filesystem {
        ident: "native",
        binary: "true",
        filename: "/etc/passwd",
        args: &[],
        kind: MountKind::Native,
        runtime: Runtime::Plain,
        mount_dir_override: None,
    },
];

impl Filesystem {
    /// Whether benchmarking needs a mount/unmount cycle.
    pub fn requires_mount(&self) -> bool {
        self.kind == MountKind::Fuse
    }

    /// Whether the executable takes GHC runtime flags.
    pub fn uses_ghc_runtime(&self) -> bool {
        self.runtime == Runtime::Ghc
    }

    /// Directory passed to the unmount utility.
    pub fn mount_dir(&self) -> &Path {
        match self.mount_dir_override {
            Some(dir) => Path::new(dir),
            None => Path::new(self.filename)
                .parent()
                .unwrap_or(Path::new("/")),
        }
    }
}

impl std::fmt::Display for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ident)
    }
}

/// All registered filesystems, in table order.
pub fn all() -> &'static [Filesystem] {
    FILESYSTEMS
}

/// Identifiers of all registered filesystems.
pub fn identifiers() -> impl Iterator<Item = &'static str> {
    FILESYSTEMS.iter().map(|fs| fs.ident)
}

/// Look up a filesystem by identifier.
pub fn lookup(ident: &str) -> Result<&'static Filesystem> {
    FILESYSTEMS
        .iter()
        .find(|fs| fs.ident == ident)
        .ok_or_else(|| BenchError::UnknownFilesystem {
            ident: ident.to_string(),
            known: identifiers().collect::<Vec<_>>().join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_native_skips_mount() {
        for fs in all() {
            assert_eq!(fs.requires_mount(), fs.ident != "native", "{fs}");
        }
    }

    #[test]
    fn test_ghc_subset() {
        let ghc: Vec<_> = all()
            .iter()
            .filter(|fs| fs.uses_ghc_runtime())
            .map(|fs| fs.ident)
            .collect();
        assert_eq!(ghc, ["fscq", "cfscq", "hfuse"]);
    }

    #[test]
    fn test_lookup_known() {
        let fs = lookup("hello").unwrap();
        assert_eq!(fs.binary, "hello");
        assert_eq!(fs.filename, "/tmp/hellofs/hello");
        assert_eq!(fs.args, ["/tmp/hellofs"]);
    }

    #[test]
    fn test_lookup_unknown() {
        let err = lookup("ext4").unwrap_err();
        assert!(matches!(err, BenchError::UnknownFilesystem { ref ident, .. } if ident == "ext4"));
        assert!(err.to_string().contains("fusexmp"));
    }

    #[test]
    fn test_identifiers_unique() {
        let mut ids: Vec<_> = identifiers().collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_mount_dir_is_parent() {
        assert_eq!(lookup("fscq").unwrap().mount_dir(), Path::new("/tmp/fscq"));
        assert_eq!(lookup("cfuse").unwrap().mount_dir(), Path::new("/tmp/hellofs"));
    }

    #[test]
    fn test_passthrough_mount_dir() {
        let fs = lookup("fusexmp").unwrap();
        assert_eq!(fs.mount_dir(), Path::new("/tmp/hellofs"));
        assert_ne!(fs.mount_dir(), Path::new(fs.filename).parent().unwrap());
    }
}
