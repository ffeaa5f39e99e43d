use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use kubecnf::ops::{self, AddOutcome};
use kubecnf::{codec, Document, Entry, Error, Snapshot};

const PROD: &str = "\
apiVersion: v1
kind: Config
preferences:
  colors: true
clusters:
- name: prod
  cluster:
    server: https://prod.example.com
    certificate-authority-data: LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0t
contexts:
- name: prod
  context:
    cluster: prod
    user: prod
    namespace: web
users:
- name: prod
  user:
    client-certificate-data: Y2VydA==
    client-key-data: a2V5
current-context: prod
";

const STAGING: &str = "\
apiVersion: v1
kind: Config
clusters:
- name: staging
  cluster:
    server: https://staging.example.com
contexts:
- name: staging
  context:
    cluster: staging
    user: staging
users:
- name: staging
  user:
    token: s3cr3t
current-context: staging
";

fn names(entries: &[Entry]) -> Vec<&str> {
    entries.iter().filter_map(|e| e.name.as_deref()).collect()
}

fn backups(main: &Path) -> Vec<Snapshot> {
    Snapshot::list(main).unwrap()
}

#[test]
fn add_then_remove_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    let input = dir.path().join("staging.yaml");
    fs::write(&main, PROD).unwrap();
    fs::write(&input, STAGING).unwrap();

    let outcome = ops::add(&main, &input).unwrap();
    let first = match outcome {
        AddOutcome::Merged { snapshot, added } => {
            assert_eq!(added, 3);
            snapshot
        }
        AddOutcome::Created => panic!("main config existed"),
    };
    assert_eq!(fs::read_to_string(&first.path).unwrap(), PROD);

    let merged = codec::load(&main).unwrap();
    assert_eq!(names(&merged.clusters), ["prod", "staging"]);
    assert_eq!(names(&merged.contexts), ["prod", "staging"]);
    assert_eq!(names(&merged.users), ["prod", "staging"]);
    assert_eq!(merged.current_context.as_deref(), Some("prod"));
    assert!(merged.extra.contains_key(&"preferences".into()));
    let merged_bytes = fs::read(&main).unwrap();

    ops::remove(&main, "prod").unwrap();
    let removed = codec::load(&main).unwrap();
    assert_eq!(names(&removed.clusters), ["staging"]);
    assert_eq!(names(&removed.contexts), ["staging"]);
    assert_eq!(names(&removed.users), ["staging"]);
    assert_eq!(removed.current_context.as_deref(), Some(""));
    assert_eq!(ops::list(&main).unwrap(), ["staging"]);

    let all = backups(&main);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], first);
    assert_eq!(fs::read(&all[1].path).unwrap(), merged_bytes);
}

#[test]
fn rollback_undoes_last_change() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    let input = dir.path().join("staging.yaml");
    fs::write(&main, PROD).unwrap();
    fs::write(&input, STAGING).unwrap();

    ops::add(&main, &input).unwrap();
    let restored = ops::rollback(&main).unwrap();

    assert_eq!(fs::read_to_string(&main).unwrap(), PROD);
    assert_eq!(restored, backups(&main)[0].path);
}

#[test]
fn rollback_picks_newest_of_many() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

    for (hour, content) in [(9, "first"), (10, "second"), (11, "third")] {
        fs::write(&main, content).unwrap();
        Snapshot::take_at(&main, day.and_hms_opt(hour, 0, 0).unwrap()).unwrap();
    }
    fs::write(&main, "current").unwrap();

    ops::rollback(&main).unwrap();
    assert_eq!(fs::read_to_string(&main).unwrap(), "third");
}

#[test]
fn rollback_without_backups() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    fs::write(&main, PROD).unwrap();

    let err = ops::rollback(&main).unwrap_err();
    assert!(matches!(err, Error::NoBackupFound(_)));
}

#[test]
fn unknown_fields_survive_a_change() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    let input = dir.path().join("staging.yaml");
    fs::write(
        &main,
        "apiVersion: v1\nkind: Config\nx-tool: {pinned: [a, b]}\nclusters:\n- name: prod\n  cluster: {server: https://p, x-extra: 1}\n",
    )
    .unwrap();
    fs::write(&input, STAGING).unwrap();

    let before = codec::load(&main).unwrap();
    ops::add(&main, &input).unwrap();
    let after = codec::load(&main).unwrap();

    assert_eq!(after.extra, before.extra);
    assert_eq!(after.clusters[0], before.clusters[0]);
    assert_eq!(after.api_version, before.api_version);
}

#[test]
fn repeated_adds_keep_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    let input = dir.path().join("staging.yaml");
    fs::write(&main, PROD).unwrap();
    fs::write(&input, STAGING).unwrap();

    ops::add(&main, &input).unwrap();
    ops::add(&main, &input).unwrap();
    assert_eq!(ops::list(&main).unwrap(), ["prod", "staging", "staging"]);
    assert_eq!(backups(&main).len(), 2);

    ops::remove(&main, "staging").unwrap();
    assert_eq!(ops::list(&main).unwrap(), ["prod"]);
}

#[test]
fn first_add_creates_config() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("nested").join("config");
    let input = dir.path().join("staging.yaml");
    fs::write(&input, STAGING).unwrap();

    assert!(matches!(ops::add(&main, &input).unwrap(), AddOutcome::Created));
    assert_eq!(ops::list(&main).unwrap(), ["staging"]);
    assert!(backups(&main).is_empty());
}

#[test]
fn skeleton_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("config");
    codec::save(&main, &Document::skeleton()).unwrap();
    assert_eq!(codec::load(&main).unwrap(), Document::skeleton());
}
