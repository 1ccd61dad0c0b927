//! End-to-end tests for the `mail-run` binary and the `specs/` fixtures.

use mailpipe::execute_pipeline;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn spec_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("specs")
}

fn mail_run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mail-run"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mail-run")
}

/// Run a fixture through the library and the binary and compare both to
/// the `.expected` file.
fn assert_spec(name: &str) {
    let dir = spec_dir();
    let input_path = dir.join("mail.data");
    let pipe_path = dir.join(format!("{name}.pipe"));
    let expected = fs::read_to_string(dir.join(format!("{name}.expected"))).unwrap();

    let input = fs::read_to_string(&input_path).unwrap();
    let pipeline = fs::read_to_string(&pipe_path).unwrap();
    let (output, _) = execute_pipeline(&input, &pipeline).unwrap();
    assert_eq!(output, expected, "library output differs for {name}");

    let out = mail_run(&[
        input_path.to_str().unwrap(),
        "-p",
        pipe_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "mail-run failed for {name}");
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        expected,
        "binary output differs for {name}"
    );
}

macro_rules! spec_test {
    ($name:ident, $file:expr) => {
        #[test]
        fn $name() {
            assert_spec($file);
        }
    };
}

spec_test!(spec_copy_erich, "copy-erich");
spec_test!(spec_not_to_erich, "not-to-erich");
spec_test!(spec_locate_button, "locate-button");
spec_test!(spec_passthrough, "passthrough");

#[test]
fn test_inline_flags_match_pipeline_file() {
    let input = spec_dir().join("mail.data");
    let out = mail_run(&[
        input.to_str().unwrap(),
        "--from",
        "erich@example.com",
        "--copy-to",
        "richard@example.com",
    ]);
    assert!(out.status.success());
    let expected = fs::read_to_string(spec_dir().join("copy-erich.expected")).unwrap();
    assert_eq!(String::from_utf8(out.stdout).unwrap(), expected);
}

#[test]
fn test_output_file_creates_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let out_path = tmp.path().join("nested").join("out.data");
    let input = spec_dir().join("mail.data");

    let out = mail_run(&[
        input.to_str().unwrap(),
        "--from",
        "ralph@example.com",
        "-o",
        out_path.to_str().unwrap(),
    ]);

    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(&out_path).unwrap(),
        "ralph@example.com\nerich@example.com\nI do not make mistakes of that kind\n"
    );
}

#[test]
fn test_partial_trailing_record_is_dropped() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("partial.data");
    fs::write(&input, "a@x\nb@x\nhello\nc@x\nd@x\n").unwrap();

    let out = mail_run(&[input.to_str().unwrap()]);

    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "a@x\nb@x\nhello\n");
    assert!(String::from_utf8(out.stderr).unwrap().contains("incomplete record"));
}

#[test]
fn test_bad_pipeline_reports_line() {
    let tmp = tempfile::tempdir().unwrap();
    let pipe = tmp.path().join("bad.pipe");
    fs::write(&pipe, "PIPE READ\n| SHRED\n| SEND\n").unwrap();
    let input = spec_dir().join("mail.data");

    let out = mail_run(&[input.to_str().unwrap(), "-p", pipe.to_str().unwrap()]);

    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Line 2: Unknown command: SHRED"), "{stderr}");
}

#[test]
fn test_missing_input_file() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope.data");

    let out = mail_run(&[missing.to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(
        String::from_utf8(out.stderr)
            .unwrap()
            .contains("Error reading input file")
    );
}

#[test]
fn test_pipeline_conflicts_with_inline_flags() {
    let pipe = spec_dir().join("passthrough.pipe");
    let out = mail_run(&["-p", pipe.to_str().unwrap(), "--from", "x@example.com"]);
    assert!(!out.status.success());
}
