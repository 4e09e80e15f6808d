// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use newsdigest::{HeadingTree, NodeId, Volume};

/// A small digest volume exercising page breaks, all heading levels,
/// the three cross-reference forms and one unclassifiable line
pub const SAMPLE_TRANSCRIPT: &str = "\
Cleveland Newspaper Digest, 1864
#START_ABSTRACTS
CLEVELAND NEWSPAPER DIGEST
Abstracts 1-40
1
ADVERTISING &amp; ADVERTISERS -
1 - L Mar. 5:4/4 - George Miller was arrested on a charge of entering
the shop of Humbert Droz, a watchmaker, and running off
with a watch. (3)
2 - H Mar. 7:2/1 - Advertising rates for the Herald were raised. (2)
Book Stores
3 - L May 28; ed: 1/1,2 - Wallandigham occupies a suite of rooms at the
Weddell House. (4)
(Religious Books)
3-1/2 - H June 3:3/1-3, 4/5 - Bibles were distributed to the soldiers
2
CLEVELAND NEWSPAPER DIGEST
at Camp Cleveland. (6)
ABANDONED CHILDREN. See Children
CHILDREN
5 - H Feb. 28:3/3 - A foundling was left at the door of the orphan asylum. (1)
H Feb. 28:3/3 - See Children
See also Advertising &amp; Advertisers - Book Stores

STREETS
6 - L Mav 17:2/1 - The paving of Superior st. was completed. (2)
McKinley, William 1843
";

/// Same volume with nothing an editor would need to fix
pub fn clean_sample() -> String {
    SAMPLE_TRANSCRIPT.replace("McKinley, William 1843\n", "")
}

/// Test fixture helper for creating temporary transcript layouts
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self { temp_dir, root_path }
    }

    /// Create a transcript file with given content
    pub fn create_transcript<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        // Create parent directories if needed
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Lay the sample out as `source/1864/1864-corrected.txt`
    pub fn create_sample_volume(&self) -> PathBuf {
        self.create_transcript("source/1864/1864-corrected.txt", SAMPLE_TRANSCRIPT)
    }

    pub fn path(&self, relative_path: &str) -> PathBuf {
        self.root_path.join(relative_path)
    }
}

/// Indented outline of the heading tree: slug, extent and member ids
pub fn outline(volume: &Volume) -> String {
    fn walk(tree: &HeadingTree, id: NodeId, out: &mut String) {
        let node = tree.node(id);
        let end = node.end_line.map(|e| e.to_string()).unwrap_or_default();
        let ids: Vec<String> = node.abstracts.iter().map(|a| a.to_string()).collect();
        out.push_str(&format!(
            "{}{} [{}..{}) {}\n",
            "  ".repeat(node.depth),
            node.slug,
            node.start_line,
            end,
            ids.join(",")
        ));
        for &child in &node.children {
            walk(tree, child, out);
        }
    }

    let mut out = String::new();
    for &root in volume.headings.roots() {
        walk(&volume.headings, root, &mut out);
    }
    out
}

/// Compare two strings line by line, providing detailed diff on mismatch
pub fn assert_golden_file(actual: &str, expected: &str, context: &str) {
    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();

    if actual_lines.len() != expected_lines.len() {
        panic!(
            "{}: Line count mismatch. Expected {} lines, got {} lines\n{}",
            context,
            expected_lines.len(),
            actual_lines.len(),
            actual
        );
    }

    for (i, (actual_line, expected_line)) in actual_lines.iter().zip(expected_lines.iter()).enumerate() {
        if actual_line != expected_line {
            panic!(
                "{}: Line {} mismatch\nExpected: {}\nActual:   {}",
                context,
                i + 1,
                expected_line,
                actual_line
            );
        }
    }
}
