use std::{path::{Path, PathBuf}, process::Stdio, sync::Arc, time::Duration};

/// How long `java -version` may take before the runtime is considered broken.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum JavaError {
    #[error("No usable Java runtime was found")]
    NotFound,
    #[error("Unable to run {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path:?} did not answer -version within {timeout:?}")]
    Timeout {
        path: PathBuf,
        timeout: Duration,
    },
    #[error("{path:?} is not a working Java runtime (exit code {code:?})")]
    InvalidRuntime {
        path: PathBuf,
        code: Option<i32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaSource {
    Configured,
    Bundled,
    JavaHome,
    SystemPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaCandidate {
    pub path: PathBuf,
    pub source: JavaSource,
}

#[derive(Debug, Clone)]
pub struct ResolvedJava {
    pub path: PathBuf,
    pub source: JavaSource,
    pub version: Arc<str>,
}

/// `<exe dir>/assets/core/jre`, where release builds ship their runtime.
pub fn default_bundled_base() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("assets").join("core").join("jre"))
}

pub fn bundled_runtime_paths(base: &Path) -> Vec<PathBuf> {
    if cfg!(windows) {
        let bin = base.join("win").join("bin");
        vec![bin.join("java.exe"), bin.join("javaw.exe")]
    } else if cfg!(target_os = "macos") {
        vec![base.join("mac").join("Contents").join("Home").join("bin").join("java")]
    } else {
        vec![base.join("linux").join("bin").join("java")]
    }
}

fn java_executable_name() -> &'static str {
    if cfg!(windows) { "java.exe" } else { "java" }
}

/// Candidates in resolution order. Only existing files are listed, except for the bare `java` fallback.
pub fn java_candidates(configured: Option<&Path>, bundled_base: Option<&Path>, java_home: Option<&Path>) -> Vec<JavaCandidate> {
    let mut candidates = Vec::new();
    let mut push = |path: PathBuf, source: JavaSource| {
        if path.is_file() && !candidates.iter().any(|candidate: &JavaCandidate| candidate.path == path) {
            candidates.push(JavaCandidate { path, source });
        }
    };

    if let Some(configured) = configured {
        push(configured.to_path_buf(), JavaSource::Configured);
    }
    if let Some(base) = bundled_base {
        for path in bundled_runtime_paths(base) {
            push(path, JavaSource::Bundled);
        }
    }
    if let Some(home) = java_home {
        push(home.join("bin").join(java_executable_name()), JavaSource::JavaHome);
    }

    candidates.push(JavaCandidate {
        path: PathBuf::from("java"),
        source: JavaSource::SystemPath,
    });
    candidates
}

/// Picks the first candidate that answers `-version`.
pub async fn resolve_java(configured: Option<&Path>, bundled_base: Option<&Path>) -> Result<ResolvedJava, JavaError> {
    let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
    let mut last_error = None;

    for candidate in java_candidates(configured, bundled_base, java_home.as_deref()) {
        match validate_java(&candidate.path, VALIDATION_TIMEOUT).await {
            Ok(version) => {
                log::info!("Using Java {:?} ({version})", candidate.path);
                return Ok(ResolvedJava {
                    path: candidate.path,
                    source: candidate.source,
                    version,
                });
            },
            Err(error) => {
                log::warn!("Skipping Java candidate: {error}");
                last_error = Some(error);
            },
        }
    }

    if configured.is_some_and(|path| !path.is_file()) {
        log::warn!("Configured Java path {configured:?} does not exist");
    }
    Err(last_error.unwrap_or(JavaError::NotFound))
}

/// Runs `path -version`. The runtime is accepted when it exits successfully or prints a version banner.
pub async fn validate_java(path: &Path, timeout: Duration) -> Result<Arc<str>, JavaError> {
    let child = tokio::process::Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| JavaError::Spawn { path: path.to_path_buf(), source })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|source| JavaError::Spawn { path: path.to_path_buf(), source })?,
        Err(_) => return Err(JavaError::Timeout { path: path.to_path_buf(), timeout }),
    };

    // The version banner goes to stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let banner = if stderr.trim().is_empty() { stdout } else { stderr };

    if !output.status.success() && !banner.contains("version") {
        return Err(JavaError::InvalidRuntime {
            path: path.to_path_buf(),
            code: output.status.code(),
        });
    }

    Ok(banner.lines().next().unwrap_or_default().trim().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TempDir;

    #[test]
    fn candidates_follow_resolution_order() {
        let temp = TempDir::new("java-candidates");
        let configured = temp.join("custom-java");
        std::fs::write(&configured, b"").unwrap();

        let base = temp.join("jre");
        let bundled = bundled_runtime_paths(&base).remove(0);
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, b"").unwrap();

        let candidates = java_candidates(Some(&configured), Some(&base), Some(&temp.join("missing-home")));
        let sources: Vec<_> = candidates.iter().map(|candidate| candidate.source).collect();
        assert_eq!(sources, [JavaSource::Configured, JavaSource::Bundled, JavaSource::SystemPath]);
        assert_eq!(candidates[1].path, bundled);

        let fallback = java_candidates(Some(&temp.join("nope")), None, None);
        assert_eq!(fallback, [JavaCandidate { path: "java".into(), source: JavaSource::SystemPath }]);
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let temp = TempDir::new("java-missing");
        let result = validate_java(&temp.join("java"), VALIDATION_TIMEOUT).await;
        assert!(matches!(result, Err(JavaError::Spawn { .. })));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn validation_reads_banner_and_times_out() {
        let temp = TempDir::new("java-scripts");

        let good = script(&temp, "good", "echo 'openjdk version \"17.0.8\" 2023-07-18' >&2");
        let version = validate_java(&good, VALIDATION_TIMEOUT).await.unwrap();
        assert_eq!(&*version, "openjdk version \"17.0.8\" 2023-07-18");

        let broken = script(&temp, "broken", "echo 'segfault' >&2\nexit 3");
        let result = validate_java(&broken, VALIDATION_TIMEOUT).await;
        assert!(matches!(result, Err(JavaError::InvalidRuntime { code: Some(3), .. })));

        let hung = script(&temp, "hung", "sleep 5");
        let result = validate_java(&hung, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(JavaError::Timeout { .. })));
    }
}
