use repoai_core::contract::{EntryKind, FileEntry};
use repoai_core::filter::{FileFilter, DEFAULT_EXCLUDE_DIRS};

fn blobs(paths: &[&str]) -> Vec<FileEntry> {
    paths.iter().map(|p| FileEntry::blob(*p)).collect()
}

#[test]
fn test_single_extension_with_excluded_dir() {
    let filter = FileFilter::default()
        .with_extensions([".py"])
        .with_exclude_dirs(["node_modules"]);
    let out = filter.apply(&blobs(&["a.py", "b.txt", "node_modules/c.py"]));
    assert_eq!(out, vec!["a.py"]);
}

#[test]
fn test_filter_cases() {
    struct Case {
        name: &'static str,
        extensions: Vec<&'static str>,
        max_files: Option<usize>,
        input: Vec<&'static str>,
        expected: Vec<&'static str>,
    }

    let cases = vec![
        Case {
            name: "defaults keep source and docs, drop build output",
            extensions: vec![],
            max_files: None,
            input: vec!["src/main.rs", "target/debug/x.rs", "README.md", "logo.png"],
            expected: vec!["src/main.rs", "README.md"],
        },
        Case {
            name: "order is preserved and cap takes the first survivors",
            extensions: vec![],
            max_files: Some(2),
            input: vec!["z.go", "skip.bin", "a.go", "m.go"],
            expected: vec!["z.go", "a.go"],
        },
        Case {
            name: "zero cap means unlimited",
            extensions: vec![".go"],
            max_files: Some(0),
            input: vec!["a.go", "b.go", "c.go"],
            expected: vec!["a.go", "b.go", "c.go"],
        },
        Case {
            name: "extensions are case-insensitive and dot-optional",
            extensions: vec!["TS", " .Tsx "],
            max_files: None,
            input: vec!["app.ts", "App.TSX", "main.js"],
            expected: vec!["app.ts", "App.TSX"],
        },
        Case {
            name: "excluded names only match directory segments",
            extensions: vec![".rs", ".py"],
            max_files: None,
            input: vec!["src/build.rs", "build/gen.rs", "pkg/vendor/lib.py", "vendor.py"],
            expected: vec!["src/build.rs", "vendor.py"],
        },
        Case {
            name: "dotfiles and extensionless files never match",
            extensions: vec![],
            max_files: None,
            input: vec![".gitignore", "Makefile", "docs/.md"],
            expected: vec![],
        },
    ];

    for case in cases {
        let filter = FileFilter::default()
            .with_extensions(case.extensions.clone())
            .with_max_files(case.max_files);
        assert_eq!(
            filter.apply(&blobs(&case.input)),
            case.expected,
            "case: {}",
            case.name
        );
    }
}

#[test]
fn test_tree_entries_are_ignored() {
    let entries = vec![
        FileEntry {
            path: "src.rs".into(),
            kind: EntryKind::Tree,
            size: None,
            sha: None,
        },
        FileEntry::blob("lib.rs"),
    ];
    assert_eq!(FileFilter::default().apply(&entries), vec!["lib.rs"]);
}

/// Survivors are an ordered subsequence of the input and never sit under an
/// excluded directory.
#[test]
fn test_output_is_ordered_subsequence_without_excluded_dirs() {
    let dirs = [
        "",
        "src/",
        "lib/deep/",
        "node_modules/",
        ".git/",
        "a/dist/",
        "coverage/",
    ];
    let mut paths = Vec::new();
    for dir in dirs {
        for file in ["a.py", "b.rs", "c.txt", "d.json", "e"] {
            paths.push(format!("{dir}{file}"));
        }
    }
    let entries: Vec<FileEntry> = paths.iter().map(FileEntry::blob).collect();

    let out = FileFilter::default().apply(&entries);

    let mut cursor = paths.iter();
    for survivor in &out {
        assert!(
            cursor.any(|p| p == survivor),
            "{survivor} out of order or not in input"
        );
        let dirs: Vec<&str> = survivor.split('/').collect();
        for segment in &dirs[..dirs.len() - 1] {
            assert!(
                !DEFAULT_EXCLUDE_DIRS.contains(segment),
                "{survivor} is under an excluded directory"
            );
        }
        assert!(!survivor.ends_with(".txt") && !survivor.ends_with("/e") && survivor != "e");
    }
    assert_eq!(out.len(), 9);
}
