//! Taskboard E2E test suite
//!
//! Drives the built binary against a temporary vault.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

// ============== Harness ==============

/// Taskboard CLI invocation wrapper
pub struct TaskboardCli {
    bin: PathBuf,
    vault: PathBuf,
}

/// Captured process output
#[derive(Debug)]
pub struct CliResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TaskboardCli {
    pub fn new(vault: &Path) -> Self {
        Self {
            bin: PathBuf::from(env!("CARGO_BIN_EXE_taskboard")),
            vault: vault.to_path_buf(),
        }
    }

    pub fn run(&self, args: &[&str]) -> CliResult {
        let output = Command::new(&self.bin)
            .arg("--vault")
            .arg(&self.vault)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .expect("taskboard binary should start");

        CliResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Board as JSON
    pub fn board(&self) -> Value {
        let result = self.run(&["--output", "json", "board"]);
        assert!(result.success, "board failed: {}", result.stderr);
        serde_json::from_str(&result.stdout).expect("board output should be JSON")
    }

    /// Id of the task whose description is `description`
    pub fn task_id(&self, description: &str) -> String {
        let board = self.board();
        board
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|column| column["tasks"].as_array().cloned().unwrap_or_default())
            .find(|task| task["description"] == description)
            .and_then(|task| task["id"].as_str().map(str::to_string))
            .unwrap_or_else(|| panic!("task '{}' not on the board", description))
    }
}

fn vault_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }
    dir
}

fn read(dir: &TempDir, path: &str) -> String {
    std::fs::read_to_string(dir.path().join(path)).unwrap()
}

// ============== Tests ==============

#[test]
fn test_board_lists_columns() {
    let vault = vault_with(&[("today.md", "- [ ] Water plants\n- [/] Write report\n- [x] Pay rent\n")]);
    let cli = TaskboardCli::new(vault.path());

    let board = cli.board();
    let names: Vec<&str> = board
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Todo", "Doing", "Done"]);
    assert_eq!(board[0]["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(board[1]["tasks"][0]["description"], "Write report");
    assert!(board[2]["tasks"].as_array().unwrap().is_empty());

    let pretty = cli.run(&["board"]);
    assert!(pretty.success);
    assert!(pretty.stdout.contains("Water plants"));
    assert!(pretty.stdout.contains("today.md:1"));
}

#[test]
fn test_clock_in_and_out_edits_document() {
    let vault = vault_with(&[("today.md", "# Today\n- [ ] Water plants\n")]);
    let cli = TaskboardCli::new(vault.path());
    let id = cli.task_id("Water plants");

    let result = cli.run(&["clock-in", &id]);
    assert!(result.success, "clock-in failed: {}", result.stderr);
    assert!(result.stdout.contains("interval opened"));

    let content = read(&vault, "today.md");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[1], "- [/] Water plants");
    assert!(lines[2].starts_with("    [clock::"));
    assert!(!lines[2].contains("--"));

    let result = cli.run(&["clock-out", &id, "--to", "Done"]);
    assert!(result.success, "clock-out failed: {}", result.stderr);

    let content = read(&vault, "today.md");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[1], "- [x] Water plants");
    assert!(lines[2].contains("--"));

    // Done tasks are hidden by default, so tracked time is no longer reachable by id
    let result = cli.run(&["tracked", &id]);
    assert!(!result.success);
    assert!(result.stderr.contains("Task not found"));
}

#[test]
fn test_move_rejects_unknown_column() {
    let vault = vault_with(&[("today.md", "- [ ] Water plants\n")]);
    let cli = TaskboardCli::new(vault.path());
    let id = cli.task_id("Water plants");

    let result = cli.run(&["move", &id, "Someday"]);
    assert!(!result.success);
    assert!(result.stderr.contains("Unknown column: Someday"));
    assert_eq!(read(&vault, "today.md"), "- [ ] Water plants\n");
}

#[test]
fn test_move_json_report() {
    let vault = vault_with(&[("notes/work.md", "Intro\n\n* [ ] Draft plan\n")]);
    let cli = TaskboardCli::new(vault.path());
    let id = cli.task_id("Draft plan");

    let result = cli.run(&["--output", "json", "move", &id, "Done"]);
    assert!(result.success, "move failed: {}", result.stderr);
    let report: Value = serde_json::from_str(&result.stdout).unwrap();
    assert_eq!(report["moved"], true);
    assert_eq!(report["actions"][0]["outcome"], "applied");
    assert_eq!(read(&vault, "notes/work.md"), "Intro\n\n* [x] Draft plan\n");
}

#[test]
fn test_tracked_reports_existing_intervals() {
    let vault = vault_with(&[(
        "today.md",
        "- [ ] Review PR\n    [clock::2024-03-01T09:00:00--2024-03-01T10:15:00]\n",
    )]);
    let cli = TaskboardCli::new(vault.path());
    let id = cli.task_id("Review PR");

    let result = cli.run(&["tracked", &id]);
    assert!(result.success, "tracked failed: {}", result.stderr);
    assert!(result.stdout.contains("Total: 1h 15m"));
}

#[test]
fn test_init_config_and_custom_columns() {
    let vault = vault_with(&[("today.md", "- [?] Someday idea\n")]);
    let cli = TaskboardCli::new(vault.path());

    let result = cli.run(&["init-config"]);
    assert!(result.success, "init-config failed: {}", result.stderr);
    assert!(vault.path().join(".taskboard.yaml").is_file());

    let again = cli.run(&["init-config"]);
    assert!(!again.success);
    assert!(again.stderr.contains("--force"));

    std::fs::write(
        vault.path().join(".taskboard.yaml"),
        "columns:\n  - name: Inbox\n    symbol: ' '\n  - name: Maybe\n    symbol: '?'\nclock_column: null\n",
    )
    .unwrap();
    let board = cli.board();
    assert_eq!(board[1]["name"], "Maybe");
    assert_eq!(board[1]["tasks"][0]["description"], "Someday idea");
}

#[test]
fn test_missing_vault_fails() {
    let cli = TaskboardCli::new(Path::new("/nonexistent/taskboard-vault"));
    let result = cli.run(&["board"]);
    assert!(!result.success);
    assert!(result.stderr.contains("Vault directory not found"));
}

#[test]
fn test_board_defaults_to_current_directory() {
    let vault = vault_with(&[("today.md", "- [ ] Buy milk\n"), ("notes/more.md", "- [/] Call home\n")]);

    let output = Command::new(env!("CARGO_BIN_EXE_taskboard"))
        .args(["--output", "json", "board"])
        .current_dir(vault.path())
        .output()
        .expect("taskboard binary should start");
    assert!(output.status.success());

    let board: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(board[0]["tasks"][0]["description"], "Buy milk");
    assert_eq!(board[0]["tasks"][0]["source_path"], "today.md");
    assert_eq!(board[1]["tasks"][0]["source_path"], "notes/more.md");
}
