use lakeform_build::{
    BuildError, SynthError, manifest::MANIFEST_FILE, sandbox::LocalSandbox, synth,
};
use lakeform_schema::prelude::*;
use serde_json::Value;
use std::{fs, path::Path, time::Duration};
use tempfile::{TempDir, tempdir};

const MARKER: &str = "tests-pass";

fn fake_toolchain() -> Toolchain {
    Toolchain {
        test_command: format!("test -f {MARKER}"),
        build_command: r#"cat handler.txt > "$ASSET_OUTPUT/main""#.to_string(),
        ..Toolchain::default()
    }
}

fn source(root: &Path, name: &str, body: &str, passing: bool) -> std::path::PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("handler.txt"), body).unwrap();
    if passing {
        fs::write(dir.join(MARKER), "").unwrap();
    }

    dir
}

fn stack(root: &TempDir, second_passing: bool) -> Topology {
    let mut topology = Topology::new("synth-stack").unwrap();
    let bucket = topology
        .add_bucket("raw", &BucketProps::default())
        .unwrap();

    for (id, passing) in [("first", true), ("second", second_passing)] {
        let props = FunctionProps::new(
            source(root.path(), id, id, passing),
            256,
            Duration::from_secs(30),
        )
        .with_toolchain(fake_toolchain());
        let function = topology.add_function(id, &props).unwrap();

        topology
            .grant_read(&function, &bucket, Some(format!("{id}/").as_str()))
            .unwrap();
        let filter = KeyFilter::new().prefix(&format!("{id}/")).unwrap();
        topology
            .notify(&bucket, EventType::ObjectCreated, filter, &function)
            .unwrap();
    }

    topology
}

#[test]
fn synth_writes_manifest_and_content_addressed_assets() {
    let root = tempdir().unwrap();
    let out = root.path().join("cdk.out");
    let topology = stack(&root, true);

    let assembly = synth(&topology, &LocalSandbox::new(), &out).unwrap();

    let raw = fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
    let json: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["stack"], "synth-stack");
    assert_eq!(json["functions"].as_array().unwrap().len(), 2);
    assert_eq!(json["permissions"].as_array().unwrap().len(), 2);

    for id in ["first", "second"] {
        let binary = assembly.binary_path(id).unwrap();
        assert!(binary.starts_with(&out));
        assert_eq!(fs::read_to_string(binary).unwrap(), id);
    }
}

#[test]
fn failing_tests_abort_synthesis_and_keep_previous_output() {
    let root = tempdir().unwrap();
    let out = root.path().join("cdk.out");
    synth(&stack(&root, true), &LocalSandbox::new(), &out).unwrap();
    let previous = fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();

    fs::remove_file(root.path().join("second").join(MARKER)).unwrap();
    let err = synth(&stack(&root, false), &LocalSandbox::new(), &out)
        .expect_err("second function's tests fail");
    match err {
        SynthError::Build { function, source } => {
            assert_eq!(function, "second");
            assert!(matches!(source, BuildError::TestsFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fs::read_to_string(out.join(MANIFEST_FILE)).unwrap(), previous);

    // only the source folders and the untouched output remain
    let mut left: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["cdk.out", "first", "second"]);

    // fixing the suite is enough for the next run
    fs::write(root.path().join("second").join(MARKER), "").unwrap();
    synth(&stack(&root, true), &LocalSandbox::new(), &out).unwrap();
    assert!(out.join(MANIFEST_FILE).is_file());
}

#[test]
fn invalid_topology_is_rejected_before_bundling() {
    let root = tempdir().unwrap();
    let out = root.path().join("cdk.out");
    let err = synth(&topology_with_overlap(&root), &LocalSandbox::new(), &out)
        .expect_err("overlapping rules must fail validation");
    assert!(matches!(
        err,
        SynthError::Schema(lakeform_schema::Error::Validation(_))
    ));
    assert!(!out.exists());
}

fn topology_with_overlap(root: &TempDir) -> Topology {
    let mut topology = Topology::new("overlap").unwrap();
    let bucket = topology
        .add_bucket("raw", &BucketProps::default())
        .unwrap();
    let props = FunctionProps::new(
        source(root.path(), "overlap", "x", true),
        256,
        Duration::from_secs(30),
    )
    .with_toolchain(fake_toolchain());
    let function = topology.add_function("overlap-fn", &props).unwrap();

    for prefix in ["landing/", "landing/2024/"] {
        let filter = KeyFilter::new().prefix(prefix).unwrap();
        topology
            .notify(&bucket, EventType::ObjectCreated, filter, &function)
            .unwrap();
    }

    topology
}

fn single_function(source_folder: &Path) -> Topology {
    let mut topology = Topology::new("single").unwrap();
    let props = FunctionProps::new(source_folder, 256, Duration::from_secs(30))
        .with_toolchain(fake_toolchain());
    topology.add_function("convert", &props).unwrap();

    topology
}

fn assert_refused(err: SynthError, reason_part: &str) {
    match err {
        SynthError::OutputDir { reason, .. } => {
            assert!(reason.contains(reason_part), "unexpected reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn out_dir_holding_the_project_is_never_replaced() {
    let root = tempdir().unwrap();
    let project = root.path().join("project");
    let src = source(&project.join("src"), "convert", "convert", true);
    fs::write(project.join("README.md"), "readme").unwrap();
    fs::write(src.join("main.go"), "package main\n").unwrap();

    let err = synth(&single_function(&src), &LocalSandbox::new(), &project)
        .expect_err("project dir holds the function source");
    assert_refused(err, "contains the source folder of function 'convert'");

    assert_eq!(fs::read_to_string(project.join("README.md")).unwrap(), "readme");
    assert_eq!(
        fs::read_to_string(src.join("main.go")).unwrap(),
        "package main\n"
    );
    assert!(!project.join(MANIFEST_FILE).exists());
}

#[test]
fn out_dir_inside_a_source_folder_is_rejected() {
    let root = tempdir().unwrap();
    let src = source(root.path(), "convert", "convert", true);
    let out = src.join("cdk.out");

    let err = synth(&single_function(&src), &LocalSandbox::new(), &out)
        .expect_err("output would land inside the source");
    assert_refused(err, "is inside the source folder of function 'convert'");
    assert!(!out.exists());
}

#[test]
fn out_dir_with_foreign_files_is_left_alone() {
    let root = tempdir().unwrap();
    let src = source(root.path(), "convert", "convert", true);
    let out = root.path().join("docs");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("notes.md"), "notes").unwrap();

    let err = synth(&single_function(&src), &LocalSandbox::new(), &out)
        .expect_err("docs is not an assembly");
    assert_refused(err, "holds 'notes.md'");
    assert_eq!(fs::read_to_string(out.join("notes.md")).unwrap(), "notes");

    // an empty directory is fine
    fs::remove_file(out.join("notes.md")).unwrap();
    synth(&single_function(&src), &LocalSandbox::new(), &out).unwrap();
    assert!(out.join(MANIFEST_FILE).is_file());
}

