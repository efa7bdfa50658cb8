//! Shared helpers for specs: scratch workspaces and output assertions.

use std::path::Path;
use std::process::{Command as StdCommand, Output};

use assert_cmd::Command;
use tempfile::TempDir;

/// `bilt` run outside any workspace.
pub fn cli() -> BiltCommand {
    BiltCommand::new(None)
}

pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `bilt` run with `--dir` pointing at this project.
    pub fn bilt(&self) -> BiltCommand {
        BiltCommand::new(Some(self.path()))
    }

    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    /// Turn the project into a git repository. False when git is missing.
    pub fn git_init(&self) -> bool {
        let git_version = StdCommand::new("git").arg("--version").output();
        if !git_version.is_ok_and(|o| o.status.success()) {
            eprintln!("git not available, skipping");
            return false;
        }
        self.git(&["init", "-q"]);
        true
    }

    pub fn git(&self, args: &[&str]) {
        let output = StdCommand::new("git")
            .arg("-C")
            .arg(self.path())
            .args(["-c", "user.name=bilt", "-c", "user.email=bilt@example.com", "-c", "commit.gpgsign=false"])
            .args(args)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
    }
}

pub struct BiltCommand {
    cmd: Command,
}

impl BiltCommand {
    fn new(dir: Option<&Path>) -> Self {
        let mut cmd = Command::cargo_bin("bilt").unwrap();
        cmd.env_remove("BILT_STATE_DIR").env_remove("BILT_GIT_TIMEOUT_MS").env("BILT_LOG", "warn");
        if let Some(dir) = dir {
            cmd.arg("--dir").arg(dir);
            // Keep git from finding a repository above the scratch dir
            if let Some(parent) = dir.parent() {
                cmd.env("GIT_CEILING_DIRECTORIES", parent);
            }
        }
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and require a zero exit status.
    pub fn passes(self) -> RunAssert {
        self.exits(0)
    }

    /// Run and require exit status `code`.
    pub fn exits(mut self, code: i32) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert { output };
        assert_eq!(
            run.output.status.code(),
            Some(code),
            "unexpected exit status\nstdout:\n{}\nstderr:\n{}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(needle), "stdout unexpectedly has {needle:?}:\n{stdout}");
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }

    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).unwrap()
    }
}
