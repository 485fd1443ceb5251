use pipemon_common::constants::LOG_FILE_SUFFIX;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A job log file named `<node_name>.<pid>.err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileRecord {
    pub node_name: String,
    pub process_id: u32,
}

impl LogFileRecord {
    /// Parses a bare file name. The node name may itself contain dots; the pid is the last
    /// component before the suffix.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(LOG_FILE_SUFFIX)?
            .strip_suffix('.')?;
        let (node_name, pid) = stem.rsplit_once('.')?;

        if node_name.is_empty() || pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            node_name: node_name.to_string(),
            process_id: pid.parse().ok()?,
        })
    }
}

/// Lists the job log files in `dir`, ordered by file name. Files that do not follow the naming
/// grammar are skipped. Only failing to open `dir` itself is an error.
pub fn scan_log_directory(dir: &Path) -> io::Result<Vec<LogFileRecord>> {
    let entries = fs::read_dir(dir)?.map(|entry| entry.map(|entry| entry.path()));
    Ok(collect_records(entries))
}

fn collect_records(entries: impl IntoIterator<Item = io::Result<PathBuf>>) -> Vec<LogFileRecord> {
    let mut matches = Vec::new();

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!("Skipping unreadable log directory entry: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if let Some(record) = LogFileRecord::parse(file_name) {
            matches.push((file_name.to_string(), record));
        }
    }

    matches.sort_by(|(a, _), (b, _)| a.cmp(b));
    matches.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;

    #[rstest]
    #[case::simple("build.111.err", Some(("build", 111)))]
    #[case::dotted_name("align.sample.1.4242.err", Some(("align.sample.1", 4242)))]
    #[case::max_pid("x.4294967295.err", Some(("x", u32::MAX)))]
    #[case::empty_pid("build..err", None)]
    #[case::missing_pid("build.err", None)]
    #[case::empty_name(".111.err", None)]
    #[case::non_numeric_pid("build.abc.err", None)]
    #[case::signed_pid("build.-1.err", None)]
    #[case::pid_overflow("build.99999999999.err", None)]
    #[case::other_suffix("build.111.out", None)]
    #[case::suffix_glued("build.111err", None)]
    #[case::trailing_text("build.111.err.bak", None)]
    fn test_parse_log_file_name(#[case] file_name: &str, #[case] expected: Option<(&str, u32)>) {
        let expected = expected.map(|(node_name, process_id)| LogFileRecord {
            node_name: node_name.to_string(),
            process_id,
        });
        assert_eq!(LogFileRecord::parse(file_name), expected);
    }

    #[test]
    fn test_scan_skips_non_matching_entries() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in ["test.222.err", "build.111.err", "notes.txt", "build.111.out"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested.333.err")).unwrap();

        let records = scan_log_directory(dir.path()).unwrap();

        assert_eq!(
            records,
            vec![
                LogFileRecord {
                    node_name: "build".to_string(),
                    process_id: 111
                },
                LogFileRecord {
                    node_name: "test".to_string(),
                    process_id: 222
                },
            ]
        );
    }

    #[test]
    fn test_unreadable_entry_does_not_hide_the_rest() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log_file = dir.path().join("build.111.err");
        File::create(&log_file).unwrap();

        let entries = vec![
            Err(io::Error::new(io::ErrorKind::NotFound, "entry vanished")),
            Ok(dir.path().join("removed.222.err")),
            Ok(log_file),
        ];

        assert_eq!(
            collect_records(entries),
            vec![LogFileRecord {
                node_name: "build".to_string(),
                process_id: 111
            }]
        );
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        assert!(scan_log_directory(&dir.path().join("gone")).is_err());
    }
}
