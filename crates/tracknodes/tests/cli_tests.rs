//! CLI integration tests for tracknodes
//!
//! Drives the built binary against fake `pbsnodes` / `sinfo` scripts:
//! - report-only mode on a fresh database
//! - Torque, PBS Pro and Slurm update runs
//! - recovery on a later run
//! - detection failures leave the database untouched

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn tracknodes_bin() -> &'static str {
    env!("CARGO_BIN_EXE_tracknodes")
}

/// Scratch area with an empty config, a database path and a bin dir.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn db(&self) -> PathBuf {
        self.path("state/tracknodes.db")
    }

    /// Install an executable script under bin/
    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\nPATH=/usr/bin:/bin\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Fake Torque pbsnodes that lists the contents of nodes.txt
    fn torque(&self) -> PathBuf {
        self.set_nodes("");
        self.script(
            "pbsnodes",
            &format!(
                r#"case "$1" in
  --version) echo "Version: 6.1.2"; echo "Commit: 0000" ;;
  -nl) cat "{}" ;;
  *) echo "unexpected args: $*" >&2; exit 2 ;;
esac"#,
                self.path("nodes.txt").display()
            ),
        )
    }

    fn set_nodes(&self, content: &str) {
        fs::write(self.path("nodes.txt"), content).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_with_path(args, "/nonexistent")
    }

    fn run_with_path(&self, args: &[&str], path_var: &str) -> Output {
        let config = self.path("config.toml");
        let db = self.db();
        Command::new(tracknodes_bin())
            .arg("--config")
            .arg(&config)
            .arg("--dbfile")
            .arg(&db)
            .args(args)
            .env("PATH", path_var)
            .env("HOME", self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_report_only_on_fresh_database() {
    let sb = Sandbox::new();
    let out = sb.run(&[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "-- History of Node Failures--\n-- --\n    \n"
    );
    assert!(sb.db().exists());
}

#[test]
fn test_torque_update_records_failure() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n001 down maintenance window\nn002 offline\n");

    let out = sb.run(&["--update", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    assert!(text.contains(" | down | 'maintenance window'"), "{}", text);
    assert!(text.contains("n002 | "), "{}", text);
    assert!(text.contains(" | offline | ''"), "{}", text);
}

#[test]
fn test_recovery_on_later_run() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n005 offline offline for repair\n");
    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    sb.set_nodes("");
    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("n005 | ")).collect();
    assert_eq!(lines.len(), 2, "{}", text);
    assert!(lines.iter().any(|l| l.ends_with("| online | ''")));
    assert!(lines.iter().any(|l| l.ends_with("| offline | 'offline for repair'")));

    let out = sb.run(&["--current"]);
    assert_eq!(
        stdout(&out),
        "-- Current Node Failures--\n-- --\n    \n"
    );
}

#[test]
fn test_repeated_update_is_idempotent() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n001 down disk\n");

    for _ in 0..3 {
        let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
        assert!(out.status.success(), "stderr: {}", stderr(&out));
    }

    let out = sb.run(&[]);
    let events = stdout(&out).lines().filter(|l| l.starts_with("n001 | ")).count();
    assert_eq!(events, 1);
}

#[test]
fn test_pbspro_uses_short_list_flag() {
    let sb = Sandbox::new();
    let cmd = sb.script(
        "pbsnodes",
        r#"case "$1" in
  --version) echo "pbs_version = 19.1.3" ;;
  -l) echo "pbs-n01 offline,down bad fan" ;;
  *) echo "unexpected args: $*" >&2; exit 2 ;;
esac"#,
    );

    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains(" | offline,down | 'bad fan'"));
}

#[test]
fn test_slurm_found_on_path() {
    let sb = Sandbox::new();
    sb.script(
        "sinfo",
        r#"if [ "$1" = "-dR" ]; then
  echo "REASON USER TIMESTAMP NODELIST"
  echo "broken ram root 2017-01-02T09:09:82 n010"
else
  exit 2
fi"#,
    );

    let bin_dir = sb.path("bin");
    let out = sb.run_with_path(&["-u"], path_str(&bin_dir));
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("n010 | "), "{}", text);
    assert!(text.contains(" | down | 'broken ram'"), "{}", text);
}

#[test]
fn test_unsupported_command_fails_before_database() {
    let sb = Sandbox::new();
    let cmd = sb.script("qstat", "echo nothing");

    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert_eq!(out.status.code(), Some(64));
    assert!(stderr(&out).contains("Unsupported resource manager"));
    assert!(!sb.db().exists());
}

#[test]
fn test_missing_explicit_command() {
    let sb = Sandbox::new();
    let out = sb.run(&["-u", "--nodes-cmd", "/nonexistent/sinfo"]);
    assert_eq!(out.status.code(), Some(64));
    assert!(stderr(&out).contains("/nonexistent/sinfo"));
    assert!(!sb.db().exists());
}

#[test]
fn test_bad_config_file() {
    let sb = Sandbox::new();
    fs::write(sb.path("config.toml"), "this is not toml = = =").unwrap();
    let out = sb.run(&[]);
    assert_eq!(out.status.code(), Some(78));
}

#[test]
fn test_malformed_lines_reported_only_when_verbose() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n001 down disk\nlonely\n");

    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success());
    assert!(!stderr(&out).contains("Skipping"));
    assert!(stdout(&out).contains(" | down | 'disk'"));

    let out = sb.run(&["-u", "-v", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("Skipping"), "{}", err);
    assert!(err.contains("tracknodes database:"), "{}", err);
    assert!(
        err.contains("recorded 0 history event(s), 1 output line(s) skipped"),
        "{}",
        err
    );
}

#[test]
fn test_json_and_node_filter() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n001 down disk\nn002 offline psu\n");
    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = sb.run(&["--json", "--node", "n002"]);
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let events = value.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["name"], "n002");
    assert_eq!(events[0]["state"], 1);
    assert_eq!(events[0]["state_text"], "offline");
    assert_eq!(events[0]["comment"], "psu");
}

#[test]
fn test_current_lists_failed_nodes() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n002 offline psu\nn001 down disk\n");
    sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);

    let out = sb.run(&["--current"]);
    assert_eq!(
        stdout(&out),
        "-- Current Node Failures--\n\
         n001 | down | 'disk'\n\
         n002 | offline | 'psu'\n\
         -- --\n    \n"
    );
}

#[test]
fn test_verbose_names_config_file() {
    let sb = Sandbox::new();
    fs::write(sb.path("config.toml"), "command_timeout_secs = 30\n").unwrap();

    let out = sb.run(&["-v"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("Loaded config from"), "{}", err);
    assert!(err.contains("config.toml"), "{}", err);

    let out = sb.run(&[]);
    assert!(!stderr(&out).contains("Loaded config from"));
}

#[test]
fn test_limit_keeps_newest_events() {
    let sb = Sandbox::new();
    let cmd = sb.torque();
    sb.set_nodes("n001 down disk\nn002 offline psu\n");
    let out = sb.run(&["-u", "--nodes-cmd", path_str(&cmd)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = sb.run(&["--limit", "1"]);
    assert!(out.status.success());
    let text = stdout(&out);
    let events: Vec<&str> = text.lines().filter(|l| l.starts_with('n')).collect();
    assert_eq!(events.len(), 1, "{}", text);
    assert!(events[0].starts_with("n002 | "), "{}", text);
}
