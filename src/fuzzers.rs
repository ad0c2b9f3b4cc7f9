//! Fuzzer family registry: where each family leaves its crash/hang samples
//! and how the target consumes them.
//!
//! A plain static table keyed by the family string used in campaign
//! configuration. Masks are `subdir/pattern` strings relative to one fuzzer
//! instance dir, with a trailing `*` meaning prefix match (`crashes/id*`
//! also keeps AFL's `README.txt` out of the sample set).

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the target binary consumes a sample file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Sample path appended to the argv
    FileArg,
    /// Sample piped to stdin
    Stdin,
}

/// Static description of one fuzzer family.
#[derive(Debug)]
pub struct FuzzerInfo {
    pub key: &'static str,
    pub name: &'static str,
    /// Masks for crash samples, relative to an instance dir
    pub crash_masks: &'static [&'static str],
    /// Masks for hang samples, relative to an instance dir
    pub hang_masks: &'static [&'static str],
    pub input_mode: InputMode,
    /// Environment the reproduce command needs
    pub env: &'static [(&'static str, &'static str)],
}

static REGISTRY: &[FuzzerInfo] = &[
    FuzzerInfo {
        key: "afl",
        name: "AFL++",
        crash_masks: &["crashes/id*"],
        hang_masks: &["hangs/id*"],
        input_mode: InputMode::Stdin,
        env: &[("ASAN_OPTIONS", "abort_on_error=1:symbolize=1")],
    },
    FuzzerInfo {
        key: "libfuzzer",
        name: "libFuzzer",
        crash_masks: &["crash-*", "leak-*", "oom-*"],
        hang_masks: &["timeout-*"],
        input_mode: InputMode::FileArg,
        env: &[],
    },
    FuzzerInfo {
        key: "go-fuzz",
        name: "go-fuzz",
        crash_masks: &["crashers/*"],
        hang_masks: &[],
        input_mode: InputMode::FileArg,
        env: &[("GOTRACEBACK", "all")],
    },
    FuzzerInfo {
        key: "sharpfuzz",
        name: "SharpFuzz",
        crash_masks: &["crashes/id*"],
        hang_masks: &["hangs/id*"],
        input_mode: InputMode::Stdin,
        env: &[],
    },
    FuzzerInfo {
        key: "atheris",
        name: "Atheris",
        crash_masks: &["crash-*"],
        hang_masks: &["timeout-*"],
        input_mode: InputMode::FileArg,
        env: &[("PYTHONUNBUFFERED", "1")],
    },
];

/// Look up a family by its configuration key.
pub fn fuzzer_info(key: &str) -> Option<&'static FuzzerInfo> {
    REGISTRY.iter().find(|info| info.key == key)
}

/// All registered family keys, for error messages.
pub fn known_fuzzers() -> Vec<&'static str> {
    REGISTRY.iter().map(|info| info.key).collect()
}

impl FuzzerInfo {
    /// Reproduce argv for one sample.
    pub fn reproduce_argv(&self, binary: &Path, sample: &Path) -> Vec<String> {
        match self.input_mode {
            InputMode::FileArg => vec![
                binary.display().to_string(),
                sample.display().to_string(),
            ],
            InputMode::Stdin => vec![binary.display().to_string()],
        }
    }

    /// Shell-style rendering of the reproduce command for the issue card.
    pub fn reproduce_cmd_string(&self, binary: &Path, sample: &Path) -> String {
        match self.input_mode {
            InputMode::FileArg => format!("{} {}", binary.display(), sample.display()),
            InputMode::Stdin => format!("{} < {}", binary.display(), sample.display()),
        }
    }

    /// Environment as owned pairs for the runner.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// `K=V`-joined environment string for the issue card.
    pub fn env_string(&self) -> String {
        self.env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Collect crash samples in one instance dir.
    pub fn crash_samples(&self, instance_dir: &Path) -> Vec<PathBuf> {
        collect_by_masks(instance_dir, self.crash_masks)
    }

    /// Collect hang samples in one instance dir.
    pub fn hang_samples(&self, instance_dir: &Path) -> Vec<PathBuf> {
        collect_by_masks(instance_dir, self.hang_masks)
    }
}

fn collect_by_masks(instance_dir: &Path, masks: &[&str]) -> Vec<PathBuf> {
    let mut samples = Vec::new();
    for mask in masks {
        let (subdir, pattern) = match mask.rsplit_once('/') {
            Some((dir, pat)) => (instance_dir.join(dir), pat),
            None => (instance_dir.to_path_buf(), *mask),
        };
        let entries = match fs::read_dir(&subdir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if matches_mask(name, pattern) {
                samples.push(path);
            }
        }
    }
    samples.sort();
    debug!(
        instance_dir = %instance_dir.display(),
        count = samples.len(),
        "collected samples"
    );
    samples
}

/// Trailing-`*` prefix masks; a bare `*` matches everything, no `*` means
/// exact match.
fn matches_mask(name: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_registry_lookup() {
        assert_eq!(fuzzer_info("afl").unwrap().name, "AFL++");
        assert_eq!(fuzzer_info("libfuzzer").unwrap().input_mode, InputMode::FileArg);
        assert!(fuzzer_info("hodor").is_none());
        assert!(known_fuzzers().contains(&"go-fuzz"));
    }

    #[test]
    fn test_mask_semantics() {
        assert!(matches_mask("id:000001,sig:11", "id*"));
        assert!(!matches_mask("README.txt", "id*"));
        assert!(matches_mask("crash-abc123", "crash-*"));
        assert!(matches_mask("anything", "*"));
        assert!(matches_mask("exact", "exact"));
        assert!(!matches_mask("exact2", "exact"));
    }

    #[test]
    fn test_crash_sample_collection() {
        let dir = tempfile::tempdir().unwrap();
        let crashes = dir.path().join("crashes");
        std::fs::create_dir(&crashes).unwrap();
        for name in ["id:000000,sig:06", "id:000001,sig:11", "README.txt"] {
            File::create(crashes.join(name))
                .unwrap()
                .write_all(b"x")
                .unwrap();
        }
        let afl = fuzzer_info("afl").unwrap();
        let samples = afl.crash_samples(dir.path());
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|p| p
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("id:")));
    }

    #[test]
    fn test_missing_subdir_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let afl = fuzzer_info("afl").unwrap();
        assert!(afl.crash_samples(dir.path()).is_empty());
        assert!(afl.hang_samples(dir.path()).is_empty());
    }

    #[test]
    fn test_reproduce_command_rendering() {
        let afl = fuzzer_info("afl").unwrap();
        let cmd = afl.reproduce_cmd_string(Path::new("/bin/t"), Path::new("/s/crashes/id:1"));
        assert_eq!(cmd, "/bin/t < /s/crashes/id:1");
        let lf = fuzzer_info("libfuzzer").unwrap();
        let cmd = lf.reproduce_cmd_string(Path::new("/bin/t"), Path::new("/s/crash-1"));
        assert_eq!(cmd, "/bin/t /s/crash-1");
        assert_eq!(afl.env_string(), "ASAN_OPTIONS=abort_on_error=1:symbolize=1");
    }
}
