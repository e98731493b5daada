use std::time::{Duration, Instant};

use repoai_core::config::TerminalSettings;
use repoai_core::executor::CommandExecutor;
use tempfile::TempDir;

fn executor(dir: &TempDir, timeout_secs: u64) -> CommandExecutor {
    CommandExecutor::new(
        dir.path(),
        &TerminalSettings {
            timeout_secs,
            max_concurrent: 2,
        },
    )
}

#[tokio::test]
async fn test_captures_stdout_stderr_and_exit_code() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir, 5);

    let ok = exec.run("echo hello", None).await;
    assert_eq!(ok.stdout, "hello\n");
    assert_eq!(ok.stderr, "");
    assert!(ok.is_success());

    let failed = exec.run("echo oops >&2; exit 3", None).await;
    assert_eq!(failed.stdout, "");
    assert_eq!(failed.stderr, "oops\n");
    assert_eq!(failed.returncode, 3);
}

#[tokio::test]
async fn test_runs_in_default_or_given_cwd() {
    let root = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    std::fs::write(root.path().join("in-root.txt"), "").unwrap();
    std::fs::write(other.path().join("in-other.txt"), "").unwrap();
    let exec = executor(&root, 5);

    let listed = exec.run("ls", None).await;
    assert_eq!(listed.stdout.trim(), "in-root.txt");

    let listed = exec.run("ls", Some(other.path())).await;
    assert_eq!(listed.stdout.trim(), "in-other.txt");
}

#[tokio::test]
async fn test_blocked_command_never_reaches_the_shell() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir, 5);
    let marker = dir.path().join("marker");

    let out = exec.run("touch marker; mkfs.ext4 /dev/null", None).await;
    assert_eq!(out.returncode, 1);
    assert_eq!(out.stdout, "");
    assert_eq!(out.stderr, "Blocked: `mkfs`");
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_timeout_returns_synthetic_failure() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir, 1);

    let started = Instant::now();
    let out = exec.run("sleep 10", None).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(out.returncode, 1);
    assert_eq!(out.stdout, "");
    assert_eq!(out.stderr, "Timed out after 1s");
}

#[tokio::test]
async fn test_missing_cwd_is_a_failure_result() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir, 5);
    let gone = dir.path().join("does-not-exist");

    let out = exec.run("echo unreachable", Some(&gone)).await;
    assert_eq!(out.returncode, 1);
    assert_eq!(out.stdout, "");
    assert!(!out.stderr.is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_all_complete_under_the_bound() {
    let dir = TempDir::new().unwrap();
    let exec = CommandExecutor::new(
        dir.path(),
        &TerminalSettings {
            timeout_secs: 5,
            max_concurrent: 1,
        },
    );

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let exec = exec.clone();
            tokio::spawn(async move { exec.run(&format!("echo {i}"), None).await })
        })
        .collect();

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().stdout);
    }
    assert_eq!(outputs, vec!["0\n", "1\n", "2\n"]);
}
