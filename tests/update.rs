use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::rstest;

const SOURCE: &str = "A\n[D]\n```\nold\n```\n[D]\nB";

fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn readme_with(temp: &assert_fs::TempDir, content: &str) -> assert_fs::fixture::ChildPath {
    let readme = temp.child("README.md");
    readme.write_str(content).unwrap();
    readme
}

fn sync(readme: &assert_fs::fixture::ChildPath) -> Command {
    let mut cmd = cmd();
    cmd.arg("--file").arg(readme.path()).args(["--delimiter", "[D]"]);
    cmd
}

#[test]
fn substitutes_the_usage_block_in_place() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme).args(["--", "echo", "new"]).assert().success();

    readme.assert("A\n[D]\n```\nnew\n```\n[D]\nB");
    temp.child("README.md.lock")
        .assert(predicate::path::missing());
}

#[test]
fn second_run_is_byte_identical() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme).args(["--", "echo", "new"]).assert().success();
    let first = std::fs::read(readme.path()).unwrap();
    sync(&readme).args(["--", "echo", "new"]).assert().success();

    assert_eq!(std::fs::read(readme.path()).unwrap(), first);
}

#[test]
fn missing_document_fails_without_creating_it() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = temp.child("README.md");

    sync(&readme)
        .args(["--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read document"));

    readme.assert(predicate::path::missing());
    temp.child("README.md.lock")
        .assert(predicate::path::missing());
}

#[rstest]
#[case::no_delimiter("A\nB\n", "found 0")]
#[case::one_delimiter("A\n[D]\nB\n", "found 1")]
#[case::three_delimiters("A\n[D]\nx\n[D]\ny\n[D]\nB\n", "found 3")]
fn wrong_delimiter_count_leaves_the_document_unchanged(
    #[case] content: &str,
    #[case] message: &str,
) {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, content);

    sync(&readme)
        .args(["--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly twice"))
        .stderr(predicate::str::contains(message));

    readme.assert(content);
}

#[test]
fn failing_command_leaves_the_document_unchanged() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--", "sh", "-c", "echo partial; echo 'build broke' >&2; exit 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exited with"))
        .stderr(predicate::str::contains("build broke"));

    readme.assert(SOURCE);
}

#[test]
fn failing_build_step_stops_the_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--build", "false", "--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`false` exited with"));

    readme.assert(SOURCE);
}

#[test]
fn unknown_program_is_an_execution_error() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--", "usage-sync-no-such-program", "--help"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start"));

    readme.assert(SOURCE);
}

#[test]
fn slow_command_times_out() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--timeout", "1", "--", "sleep", "30"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not finish within 1s"));

    readme.assert(SOURCE);
}

#[test]
fn background_process_left_by_the_command_does_not_stall_the_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--timeout", "1", "--", "sh", "-c", "sleep 8 & echo hi"])
        .timeout(std::time::Duration::from_secs(5))
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not finish within 1s"));

    readme.assert(SOURCE);
}

#[test]
fn zero_timeout_is_rejected() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--timeout", "0", "--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one second"));

    readme.assert(SOURCE);
}

#[test]
fn largest_timeout_does_not_overflow() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--timeout", &u64::MAX.to_string(), "--", "echo", "new"])
        .assert()
        .success();

    readme.assert("A\n[D]\n```\nnew\n```\n[D]\nB");
}

#[test]
fn empty_output_renders_an_empty_block() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme).args(["--", "true"]).assert().success();

    readme.assert("A\n[D]\n```\n\n```\n[D]\nB");
}

#[test]
fn build_step_runs_before_the_command() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--build", "touch built", "--", "ls", "built"])
        .assert()
        .success();

    readme.assert("A\n[D]\n```\nbuilt\n```\n[D]\nB");
}

#[test]
fn dry_run_prints_without_writing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let source = "# Tool\n\nIntro.\n\n[D]\n```\nold\n```\n[D]\n\n## License\n\nMIT\n";
    let readme = readme_with(&temp, source);

    let output = sync(&readme)
        .args(["--dry-run", "--", "echo", "Usage: tool [OPTIONS]"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    insta::assert_snapshot!(stdout, @r"
# Tool

Intro.
[D]
```
Usage: tool [OPTIONS]
```
[D]

## License

MIT
");
    readme.assert(source);
}

#[test]
fn diff_prints_the_pending_change() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--diff", "--", "echo", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- original\n+++ updated\n"))
        .stdout(predicate::str::contains("-old\n+new\n"));

    readme.assert(SOURCE);
}

#[test]
fn check_fails_on_a_stale_document() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--check", "--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is out of date"));

    readme.assert(SOURCE);
}

#[test]
fn check_passes_on_a_fresh_document() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);

    sync(&readme)
        .args(["--check", "--", "echo", "old"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn held_lock_blocks_the_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);
    let lock = temp.child("README.md.lock");
    let holder = std::fs::File::create(lock.path()).unwrap();
    holder.try_lock().unwrap();

    sync(&readme)
        .args(["--", "echo", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is locked by another run"));

    readme.assert(SOURCE);
    lock.assert(predicate::path::exists());
}

#[test]
fn leftover_lock_file_from_a_killed_run_is_ignored() {
    let temp = assert_fs::TempDir::new().unwrap();
    let readme = readme_with(&temp, SOURCE);
    let lock = temp.child("README.md.lock");
    lock.write_str("12345\n").unwrap();

    sync(&readme).args(["--", "echo", "new"]).assert().success();

    readme.assert("A\n[D]\n```\nnew\n```\n[D]\nB");
    lock.assert(predicate::path::missing());
}
