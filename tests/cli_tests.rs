use assert_cmd::Command;
use predicates::prelude::*;

fn gitea_link() -> Command {
    let mut cmd = Command::cargo_bin("gitea-link").unwrap();
    cmd.env_remove("GITEA_LINK_ACCOUNT");
    cmd
}

#[test]
fn help_lists_commands() {
    gitea_link()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn upload_requires_local_file() {
    gitea_link()
        .args(["upload", "docs/a.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--file"));
}

#[test]
fn config_rejects_unknown_key() {
    gitea_link()
        .args(["config", "get", "not-a-key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn whois_rejects_malformed_account_id() {
    gitea_link()
        .args(["account", "whois", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an account id"));
}
