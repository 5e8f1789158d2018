//! Build metadata and the server version string.
//! This includes the generated version.rs from the build script into a core module,
//! providing a single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Server version reported by the `version` command and the `version` stat
pub fn server_version() -> String {
    format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Long version line printed by `--version`
pub fn long_version() -> String {
    format!(
        "{} (built {}, commit {})",
        server_version(),
        build_time(),
        git_hash()
    )
}
