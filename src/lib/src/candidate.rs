//! Candidate selection
//!
//! Lists the files directly inside a build output directory and decides, per
//! file, whether it should be sent to the signing service. A file is signed
//! only if its extension matches the configured signable type and the
//! [`EligibilityPolicy`] accepts it.

use crate::error::WSError;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// A file considered for signing during one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl Candidate {
    /// Inspect `path` and build a candidate for it
    ///
    /// Returns the reason the entry can never be a candidate when it is not a
    /// regular file or cannot be opened for reading.
    pub fn inspect(path: &Path) -> Result<Candidate, SkipReason> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => return Err(SkipReason::Unreadable),
        };
        if !metadata.is_file() {
            return Err(SkipReason::NotAFile);
        }
        if File::open(path).is_err() {
            return Err(SkipReason::Unreadable);
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Candidate {
            path: path.to_path_buf(),
            file_name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the unsigned file when it was inspected
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Literal suffix after the last `.` of the file name
    ///
    /// `None` when the name has no `.` at all. A trailing dot yields
    /// `Some("")`, and a leading-dot name such as `.exe` yields `Some("exe")`.
    pub fn extension(&self) -> Option<&str> {
        file_extension(&self.file_name)
    }

    /// Case-sensitive comparison of the extension with `accepted`
    pub fn has_extension(&self, accepted: &str) -> bool {
        self.extension() == Some(accepted)
    }
}

/// Suffix after the last `.` of `file_name`, if there is a dot
pub fn file_extension(file_name: &str) -> Option<&str> {
    file_name.rfind('.').map(|idx| &file_name[idx + 1..])
}

/// Why an entry of the working directory was not signed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Directory, socket or any other non-regular entry
    NotAFile,
    /// Metadata could not be read or the file could not be opened
    Unreadable,
    /// Extension differs from the signable type
    WrongExtension,
    /// Rejected by the eligibility policy
    Excluded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotAFile => "not a regular file",
            SkipReason::Unreadable => "unreadable",
            SkipReason::WrongExtension => "wrong extension",
            SkipReason::Excluded => "excluded by policy",
        };
        f.write_str(s)
    }
}

/// Decides whether an otherwise signable file should be signed
///
/// This is where artifact-embedded exclusion markers are honored. Any
/// `Fn(&Candidate) -> bool` closure can be used as a policy.
pub trait EligibilityPolicy: Send + Sync {
    fn is_eligible(&self, candidate: &Candidate) -> bool;
}

impl<F> EligibilityPolicy for F
where
    F: Fn(&Candidate) -> bool + Send + Sync,
{
    fn is_eligible(&self, candidate: &Candidate) -> bool {
        self(candidate)
    }
}

/// Default policy: every file with the right extension is signed
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEligible;

impl EligibilityPolicy for AlwaysEligible {
    fn is_eligible(&self, _candidate: &Candidate) -> bool {
        true
    }
}

/// Outcome of evaluating a single directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Should be sent to the signer
    Sign(Candidate),
    /// Left untouched
    Skip(PathBuf, SkipReason),
}

/// Evaluate one path against the extension filter and the policy
pub fn select(path: &Path, accepted_extension: &str, policy: &dyn EligibilityPolicy) -> Selection {
    let candidate = match Candidate::inspect(path) {
        Ok(candidate) => candidate,
        Err(reason) => return Selection::Skip(path.to_path_buf(), reason),
    };
    if !candidate.has_extension(accepted_extension) {
        return Selection::Skip(candidate.path, SkipReason::WrongExtension);
    }
    if !policy.is_eligible(&candidate) {
        return Selection::Skip(candidate.path, SkipReason::Excluded);
    }
    Selection::Sign(candidate)
}

/// Paths of the entries directly contained in `dir`, sorted by file name
///
/// The listing is taken once, up front, so temporary files created while
/// signing never show up as entries.
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>, WSError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("app.exe"), Some("exe"));
        assert_eq!(file_extension("app.tar.gz"), Some("gz"));
        assert_eq!(file_extension("APP.EXE"), Some("EXE"));
        assert_eq!(file_extension("trailing."), Some(""));
        assert_eq!(file_extension(".exe"), Some("exe"));
        assert_eq!(file_extension("exe"), None);
        assert_eq!(file_extension(""), None);
    }

    #[test]
    fn test_inspect_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.exe");
        fs::write(&path, b"MZ\x90\x00").unwrap();

        let candidate = Candidate::inspect(&path).unwrap();
        assert_eq!(candidate.file_name(), "app.exe");
        assert_eq!(candidate.size(), 4);
        assert_eq!(candidate.extension(), Some("exe"));
        assert!(candidate.has_extension("exe"));
        assert!(!candidate.has_extension("EXE"));
    }

    #[test]
    fn test_inspect_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("bin.exe");
        fs::create_dir(&sub).unwrap();
        assert_eq!(Candidate::inspect(&sub), Err(SkipReason::NotAFile));
    }

    #[test]
    fn test_inspect_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.exe");
        assert_eq!(Candidate::inspect(&path), Err(SkipReason::Unreadable));
    }

    #[test]
    fn test_select_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("app.exe");
        let txt = dir.path().join("readme.txt");
        let bare = dir.path().join("exe");
        let upper = dir.path().join("SETUP.EXE");
        for p in [&exe, &txt, &bare, &upper] {
            fs::write(p, b"data").unwrap();
        }

        assert!(matches!(select(&exe, "exe", &AlwaysEligible), Selection::Sign(_)));
        assert_eq!(
            select(&txt, "exe", &AlwaysEligible),
            Selection::Skip(txt.clone(), SkipReason::WrongExtension)
        );
        assert_eq!(
            select(&bare, "exe", &AlwaysEligible),
            Selection::Skip(bare.clone(), SkipReason::WrongExtension)
        );
        assert_eq!(
            select(&upper, "exe", &AlwaysEligible),
            Selection::Skip(upper.clone(), SkipReason::WrongExtension)
        );
    }

    #[test]
    fn test_select_honors_policy() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.exe");
        let skip = dir.path().join("unsigned-installer.exe");
        fs::write(&keep, b"data").unwrap();
        fs::write(&skip, b"data").unwrap();

        let policy = |c: &Candidate| !c.file_name().starts_with("unsigned-");
        assert!(matches!(select(&keep, "exe", &policy), Selection::Sign(_)));
        assert_eq!(
            select(&skip, "exe", &policy),
            Selection::Skip(skip.clone(), SkipReason::Excluded)
        );
    }

    #[test]
    fn test_policy_not_consulted_for_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"data").unwrap();

        let policy = |_: &Candidate| -> bool { panic!("policy must not run") };
        assert_eq!(
            select(&txt, "exe", &policy),
            Selection::Skip(txt.clone(), SkipReason::WrongExtension)
        );
    }

    #[test]
    fn test_list_entries_sorted_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.exe"), b"b").unwrap();
        fs::write(dir.path().join("a.exe"), b"a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.exe"), b"c").unwrap();

        let names: Vec<String> = list_entries(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.exe", "b.exe", "nested"]);
    }

    #[test]
    fn test_list_entries_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_entries(&dir.path().join("missing")).is_err());
    }
}
