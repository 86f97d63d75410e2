//! Build information baked in by `build.rs`.
//!
//! Version header format:
//! - Prod: `stable:{version}`
//! - Test/Local: `main:{commit}`

/// Runtime environment as seen by the version header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Local,
    Test,
    Prod,
}

/// Get the build date in RFC3339 format
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Get the git commit hash (short)
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

pub fn build_branch() -> &'static str {
    env!("BUILD_BRANCH")
}

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format version string for a runtime-determined environment.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Test | RuntimeEnv::Local => format!("main:{}", build_commit()),
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_not_empty() {
        assert!(!build_date().is_empty());
        assert!(!build_commit().is_empty());
        assert!(!build_branch().is_empty());
        assert!(!build_version().is_empty());
    }

    #[test]
    fn test_format_version_for_runtime_env_local() {
        let version = format_version_for_runtime_env(RuntimeEnv::Local);
        assert!(version.starts_with("main:"));
    }

    #[test]
    fn test_format_version_for_runtime_env_test() {
        let version = format_version_for_runtime_env(RuntimeEnv::Test);
        assert!(version.starts_with("main:"));
    }

    #[test]
    fn test_format_version_for_runtime_env_prod() {
        let version = format_version_for_runtime_env(RuntimeEnv::Prod);
        assert_eq!(version, format!("stable:{}", env!("CARGO_PKG_VERSION")));
    }
}
