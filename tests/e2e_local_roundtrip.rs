mod common;

use common::{Scratch, REPLACEMENT, SEED};

#[test]
fn e2e_import_export_replaces_content_and_keeps_reserved_nodes() {
    let scratch = Scratch::new();
    let seed = scratch.write("seed.xml", SEED);

    let output = scratch.jack("import", &seed, &[]);
    assert!(output.status.success(), "{}", common::stderr(&output));

    let sys = scratch.path("sys.xml");
    let output = scratch.jack("export", &sys, &["repository-base-xpath=/content"]);
    assert!(output.status.success(), "{}", common::stderr(&output));
    let exported = std::fs::read_to_string(&sys).unwrap();
    assert!(exported.contains(r#"sv:name="content""#));
    assert!(exported.contains(r#"sv:name="site""#));
    assert!(exported.contains("<sv:value>Home</sv:value>"));

    let replacement = scratch.write("fresh.xml", REPLACEMENT);
    let output = scratch.jack("import", &replacement, &["repository-base-xpath=/content"]);
    assert!(output.status.success(), "{}", common::stderr(&output));

    let doc = scratch.path("doc.xml");
    let output = scratch.jack(
        "exportdocument",
        &doc,
        &["repository-base-xpath=/content"],
    );
    assert!(output.status.success(), "{}", common::stderr(&output));
    let exported = std::fs::read_to_string(&doc).unwrap();
    assert!(exported.contains("<fresh"));
    assert!(exported.contains(r#"title="Fresh""#));
    assert!(exported.contains("<rep:policy"));
    assert!(!exported.contains("<site"));
    assert!(!exported.contains("owner="));
}

#[test]
fn e2e_existing_export_target_is_left_alone() {
    let scratch = Scratch::new();
    let target = scratch.write("out.xml", "keep");

    let output = scratch.jack("export", &target, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(common::stderr(&output).contains("already exists"));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep");
    assert!(!scratch.path("home").exists());
}

#[test]
fn e2e_missing_import_source_fails() {
    let scratch = Scratch::new();

    let output = scratch.jack("import", &scratch.path("absent.xml"), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(common::stderr(&output).contains("does not exist"));
}

#[test]
fn e2e_malformed_override_is_a_usage_error() {
    let scratch = Scratch::new();
    let seed = scratch.write("seed.xml", SEED);

    let output = scratch.jack("import", &seed, &["workspace"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn e2e_log_file_mirrors_progress() {
    let scratch = Scratch::new();
    let seed = scratch.write("seed.xml", SEED);
    let log = scratch.path("logs/jack.log");

    let log_flag = format!("--log-file={}", log.display());

    let output = scratch.jack("import", &seed, &[log_flag.as_str()]);

    assert!(output.status.success(), "{}", common::stderr(&output));
    let logged = std::fs::read_to_string(&log).unwrap();
    assert!(logged.contains("Imported the repository"));
}

#[test]
fn e2e_whole_repository_export_restores_at_root() {
    let scratch = Scratch::new();
    let seed = scratch.write("seed.xml", SEED);
    let output = scratch.jack("import", &seed, &[]);
    assert!(output.status.success(), "{}", common::stderr(&output));

    let backup = scratch.path("backup.xml");
    let output = scratch.jack("export", &backup, &[]);
    assert!(output.status.success(), "{}", common::stderr(&output));
    let exported = std::fs::read_to_string(&backup).unwrap();
    assert!(exported.contains(r#"sv:name="jcr:root""#));
    assert!(exported.contains(r#"sv:name="jcr:system""#));

    let replacement = scratch.write("fresh.xml", REPLACEMENT);
    let output = scratch.jack("import", &replacement, &["repository-base-xpath=/content"]);
    assert!(output.status.success(), "{}", common::stderr(&output));

    let output = scratch.jack("import", &backup, &[]);
    assert!(output.status.success(), "{}", common::stderr(&output));

    let restored = scratch.path("restored.xml");
    let output = scratch.jack("exportdocument", &restored, &[]);
    assert!(output.status.success(), "{}", common::stderr(&output));
    let restored = std::fs::read_to_string(&restored).unwrap();
    assert!(restored.contains("<jcr:system"));
    assert!(restored.contains("<content"));
    assert!(restored.contains(r#"owner="ops""#));
    assert!(restored.contains(r#"title="Home""#));
    assert!(!restored.contains("<fresh"));
}
