//! Version information for the pminmax binary.
//!
//! Includes the git revision when the build environment sets `PMM_GIT_REV`.

use std::sync::LazyLock;

/// The package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git revision captured at build time (empty string if not set).
pub const GIT_REV: &str = match option_env!("PMM_GIT_REV") {
    Some(rev) => rev,
    None => "",
};

static FULL_VERSION: LazyLock<String> = LazyLock::new(|| {
    if GIT_REV.is_empty() {
        PKG_VERSION.to_string()
    } else {
        format!("{} ({})", PKG_VERSION, GIT_REV)
    }
});

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    let mut version = full_version();
    version.push_str(&format!(
        "\nTarget: {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    ));
    version
});

/// Returns `"X.Y.Z (abcdef0)"` when built with a git revision, else `"X.Y.Z"`.
///
/// ```
/// use pminmax::version::full_version;
///
/// assert!(full_version().starts_with(env!("CARGO_PKG_VERSION")));
/// ```
pub fn full_version() -> String {
    FULL_VERSION.clone()
}

/// Version string for clap's `-V` flag.
pub fn clap_version() -> &'static str {
    PKG_VERSION
}

/// Version string for clap's `--version` flag.
pub fn long_version() -> &'static str {
    LONG_VERSION.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_version_format() {
        let version = full_version();
        if GIT_REV.is_empty() {
            assert_eq!(version, PKG_VERSION);
        } else {
            assert!(version.contains(GIT_REV));
        }
    }

    #[test]
    fn test_clap_version_is_static() {
        let version: &'static str = clap_version();
        assert_eq!(version, PKG_VERSION);
    }

    #[test]
    fn test_long_version_contains_target() {
        let long = long_version();
        assert!(long.starts_with(&full_version()));
        assert!(long.contains(std::env::consts::OS));
    }
}
