use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn state(&self) -> PathBuf { self.dir.path().join("session.ron") }

    fn config(&self) -> PathBuf { self.dir.path().join("config.toml") }

    fn command(&self) -> Command {
        let mut cmd = test_bin::get_test_bin("pengwm");
        cmd.arg("--state").arg(self.state()).arg("--config").arg(self.config());
        cmd.env("PENGWM_LOG", "off");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output { self.command().args(args).output().unwrap() }

    /// Runs a command that must succeed and returns its stdout.
    fn ok(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "pengwm {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }
}

fn exists(path: &Path) -> bool { path.try_exists().unwrap() }

#[test]
fn commands_require_a_session() {
    let sandbox = Sandbox::new();
    let out = sandbox.run(&["list"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("pengwm init"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let sandbox = Sandbox::new();
    assert_eq!(
        sandbox.ok(&["init", "--display", "0,0,800,600", "--display", "800,0,800,600"]),
        "Initialized 2 workspace(s)\n"
    );
    assert!(exists(&sandbox.state()));

    assert!(!sandbox.run(&["init"]).status.success());
    assert_eq!(sandbox.ok(&["init", "--force"]), "Initialized 1 workspace(s)\n");
}

#[test]
fn tiles_focuses_and_releases_windows() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["init", "--display", "0,0,800,600"]);

    assert_eq!(sandbox.ok(&["open", "--pid", "100", "--app", "Terminal"]), "Opened window 1\n");
    assert_eq!(sandbox.ok(&["open", "--pid", "200", "--app", "Safari"]), "Opened window 2\n");
    assert_eq!(sandbox.ok(&["add", "300"]), "No new windows found for PID 300\n");
    assert_eq!(sandbox.ok(&["add", "100"]), "Added 1 window(s) from PID 100\n");
    assert_eq!(sandbox.ok(&["add", "200"]), "Added 1 window(s) from PID 200\n");
    assert_eq!(sandbox.ok(&["tile"]), "Tiled 2 window(s)\n");

    let status: serde_json::Value =
        serde_json::from_str(&sandbox.ok(&["status", "--json"])).unwrap();
    assert_eq!(status["focused"], 2);
    assert_eq!(status["workspaces"][0]["windows"], serde_json::json!([1, 2]));
    assert_eq!(status["managed"].as_array().unwrap().len(), 2);

    assert_eq!(sandbox.ok(&["focus", "left"]), "Focused window 1 (Terminal)\n");
    assert_eq!(sandbox.ok(&["focus", "left"]), "No window found in direction 'left'\n");
    assert_eq!(sandbox.ok(&["focus", "right"]), "Focused window 2 (Safari)\n");

    let tree = sandbox.ok(&["tree"]);
    assert!(tree.starts_with("display 1:\n"), "{tree}");
    assert!(tree.contains("vertical"), "{tree}");

    assert_eq!(sandbox.ok(&["remove", "200"]), "Removed 1 window(s) from PID 200\n");
    assert_eq!(sandbox.ok(&["remove", "200"]), "No windows found for PID 200\n");
    assert!(sandbox.ok(&["list"]).starts_with("Managed Windows (1 total):\n"));
}

#[test]
fn closing_a_window_forgets_it() {
    let sandbox = Sandbox::new();
    sandbox.ok(&["init", "--display", "0,0,800,600"]);
    sandbox.ok(&["open", "--pid", "1", "--app", "Terminal"]);
    sandbox.ok(&["open", "--pid", "2", "--app", "Safari"]);
    sandbox.ok(&["tile"]);

    assert_eq!(sandbox.ok(&["close", "1"]), "Closed window 1\n");
    assert!(!sandbox.run(&["close", "1"]).status.success());
    assert!(sandbox.ok(&["list"]).starts_with("Managed Windows (1 total):\n"));
}

#[test]
fn shell_runs_commands_from_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let sandbox = Sandbox::new();
    sandbox.ok(&["init", "--display", "0,0,800,600"]);

    let mut child = sandbox
        .command()
        .arg("shell")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"open --pid 7 --app Terminal\n\ntile\nbogus\nquit\nlist\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Opened window 1\n"), "{stdout}");
    assert!(stdout.contains("Tiled 1 window(s)\n"), "{stdout}");
    assert!(!stdout.contains("Managed Windows"), "{stdout}");

    // The session is saved when the shell exits.
    assert!(sandbox.ok(&["list"]).starts_with("Managed Windows (1 total):\n"));
}

#[test]
fn config_write_default_and_show() {
    let sandbox = Sandbox::new();
    let written = sandbox.ok(&["config", "write-default"]);
    assert!(written.starts_with("Wrote "));
    assert!(exists(&sandbox.config()));
    assert!(!sandbox.run(&["config", "write-default"]).status.success());
    sandbox.ok(&["config", "write-default", "--force"]);

    let shown = sandbox.ok(&["config", "show"]);
    assert!(shown.contains("split_ratio = 0.5"), "{shown}");
    assert!(shown.contains("\"cmd + alt + h\""), "{shown}");
}

#[test]
fn invalid_config_values_are_repaired() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config(), "[settings.layout]\nsplit_ratio = 3.0\n").unwrap();

    let shown = sandbox.ok(&["config"]);
    assert!(shown.contains("split_ratio = 0.5"), "{shown}");
}
