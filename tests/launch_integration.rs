//! Integration tests for launch orchestration
//!
//! These drive the public API with the embedded artifact set.

use scoperun::artifacts::{deploy_all, DeployOutcome};
use scoperun::config::types::ENV_METRIC_DEST;
use scoperun::session::history;
use scoperun::{ArtifactKind, ArtifactStore, Environment, LaunchMode, Launcher, ScopeSettings};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn caller_env() -> Environment {
    Environment::from_pairs([
        ("PATH", "/usr/bin:/bin"),
        ("LANG", "C"),
        ("SCOPE_CONF_PATH", "/somewhere/else/scope.yml"),
    ])
}

fn launcher(home: &Path) -> Launcher {
    let settings = ScopeSettings::with_home(home).unwrap().test_mode(true);
    Launcher::new(settings, ArtifactStore::embedded())
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn dir_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_managed_echo_end_to_end() {
    let home = tempfile::tempdir().unwrap();
    let plan = launcher(home.path())
        .prepare(&argv(&["/bin/echo", "true"]), LaunchMode::Managed, &caller_env())
        .unwrap();

    let output = plan.command().output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "true\n");

    let history_dir = home.path().join("history");
    let sessions = dir_names(&history_dir);
    assert_eq!(sessions.len(), 1);

    let prefix = format!("echo_1_{}_", std::process::id());
    let nonce = sessions[0].strip_prefix(&prefix).unwrap();
    assert!(nonce.parse::<u128>().is_ok(), "nonce {:?} is not numeric", nonce);

    let root = history_dir.join(&sessions[0]);
    assert_eq!(dir_names(&root), vec!["args.json", "cmd", "payloads", "scope.yml"]);
    assert_eq!(
        fs::read_to_string(root.join("args.json")).unwrap(),
        r#"["/bin/echo","true"]"#
    );
    assert!(dir_names(&root.join("cmd")).is_empty());
    assert!(dir_names(&root.join("payloads")).is_empty());

    let config = fs::read_to_string(root.join("scope.yml")).unwrap();
    assert!(config
        .starts_with("metric:\n  enable: true\n  format:\n    type: ndjson\n    verbosity: 4\n"));
    assert!(config.contains(&format!("path: {}\n", root.join("metrics.json").display())));
    assert!(config.contains(&format!("commanddir: {}\n", root.join("cmd").display())));
}

#[test]
fn test_managed_run_reports_exit_and_session() {
    let home = tempfile::tempdir().unwrap();
    let outcome = launcher(home.path())
        .run(&argv(&["/bin/sh", "-c", "exit 5"]), LaunchMode::Managed, &caller_env())
        .unwrap();

    assert_eq!(outcome.exit_code, 5);
    let root = outcome.session_root.unwrap();
    assert!(root.starts_with(home.path().join("history")));

    let listed = history::list_sessions(&home.path().join("history")).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name.command, "sh");
    assert_eq!(listed[0].path, root);
}

#[test]
fn test_child_sees_only_session_scope_variables() {
    let home = tempfile::tempdir().unwrap();
    let plan = launcher(home.path())
        .prepare(&argv(&["/usr/bin/env"]), LaunchMode::Managed, &caller_env())
        .unwrap();
    let output = plan.command().output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let session = plan.session.unwrap();

    assert!(!stdout.contains("/somewhere/else/scope.yml"));
    assert!(stdout.contains(&format!("SCOPE_CONF_PATH={}\n", session.config_path().display())));
    assert!(stdout.contains(&format!("SCOPE_CMD_DIR={}\n", session.cmd_dir().display())));
    assert!(stdout.contains("LANG=C\n"));
}

#[test]
fn test_passthrough_isolation() {
    let home = tempfile::tempdir().unwrap();
    let inherited = caller_env();
    let plan = launcher(home.path())
        .prepare(&argv(&["/bin/echo", "true"]), LaunchMode::Passthrough, &inherited)
        .unwrap();

    assert!(plan.session.is_none());
    assert!(!home.path().join("history").exists());

    assert_eq!(plan.env().len(), inherited.len() + 1);
    let added: Vec<_> = plan
        .env()
        .iter()
        .filter(|(k, _)| *k == ENV_METRIC_DEST)
        .collect();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].1, "file://stderr");
    for ((k, v), (ik, iv)) in plan.env().iter().zip(inherited.iter()) {
        assert_eq!((k, v), (ik, iv));
    }

    let output = plan.command().output().unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "true\n");
}

#[test]
fn test_embedded_set_deploys_idempotently() {
    let home = tempfile::tempdir().unwrap();
    let store = ArtifactStore::embedded();

    let first = deploy_all(&store, home.path()).unwrap();
    assert_eq!(first.written(), ArtifactKind::ALL.len());

    let stamps: Vec<_> = ArtifactKind::ALL
        .iter()
        .map(|k| fs::metadata(home.path().join(k.file_name())).unwrap().modified().unwrap())
        .collect();

    let second = deploy_all(&store, home.path()).unwrap();
    assert!(second
        .entries
        .iter()
        .all(|(_, _, outcome)| *outcome == DeployOutcome::Cached));

    for (kind, stamp) in ArtifactKind::ALL.iter().zip(stamps) {
        let meta = fs::metadata(home.path().join(kind.file_name())).unwrap();
        assert_eq!(meta.modified().unwrap(), stamp);
        assert_eq!(meta.permissions().mode() & 0o777, kind.mode());
    }
}

#[test]
fn test_sequential_sessions_never_collide() {
    let home = tempfile::tempdir().unwrap();
    let launcher = launcher(home.path());
    let mut counters = Vec::new();
    for _ in 0..5 {
        let plan = launcher
            .prepare(&argv(&["/bin/true"]), LaunchMode::Managed, &caller_env())
            .unwrap();
        counters.push(plan.session.unwrap().name().counter);
    }
    assert_eq!(counters, vec![1, 2, 3, 4, 5]);
    assert_eq!(dir_names(&home.path().join("history")).len(), 5);
}
