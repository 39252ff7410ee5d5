//! Integration tests for normalize-stubgen.

use normalize_stubgen::{
    ExhaustedPolicy, ExtractError, LoadError, StubError, StubOptions, format_go, generate_stub,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn raw() -> StubOptions {
    StubOptions {
        format: false,
        ..Default::default()
    }
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing {:?} in:\n{}", needle, haystack))
}

// === Thinger ===

#[test]
fn thinger_stub() {
    let output = generate_stub(&fixture("thinger"), "Thinger", &StubOptions::default()).unwrap();

    assert!(output.starts_with("// Code generated by stubgen. DO NOT EDIT.\n\npackage ref\n"));
    assert!(output.contains("var _ Thinger = (*StubThinger)(nil)\n"));
    assert!(output.contains("func NewStubThinger() *StubThinger {\n"));

    let thing = position(&output, "func (s *StubThinger) Thing() error {\n");
    let with_param = position(&output, "func (s *StubThinger) ThingWithParam(x int) error {\n");
    let with_params = position(
        &output,
        "func (s *StubThinger) ThingWithParams(a int, b string) (string, error) {\n",
    );
    assert!(thing < with_param && with_param < with_params);

    assert!(output.contains(
        "\tThingCalls   []StubThingerThingCall\n\tthingReturns []StubThingerThingReturn\n"
    ));
    assert!(output.contains("type StubThingerThingWithParamsCall struct {\n\tArg1 int\n\tArg2 string\n}\n"));
    assert!(output.contains("type StubThingerThingWithParamsReturn struct {\n\tR0 string\n\tR1 error\n}\n"));
    assert!(output.contains(
        "func (o *StubThingerThingWithParamsOn) Return(R0 string, R1 error) *StubThingerThingWithParamsOn {\n"
    ));
    assert!(output.contains("\treturn r.R0, r.R1\n"));
}

#[test]
fn thinger_returns_follow_call_order() {
    let output = generate_stub(&fixture("thinger"), "Thinger", &StubOptions::default()).unwrap();
    // The Nth call (index len(Calls)-1 after recording) reads the Nth queued tuple.
    assert!(output.contains(
        "\ts.ThingCalls = append(s.ThingCalls, StubThingerThingCall{})\n\tvar r StubThingerThingReturn\n\tif n := len(s.ThingCalls) - 1; n < len(s.thingReturns) {\n\t\tr = s.thingReturns[n]\n"
    ));
    assert!(output.contains(
        "\to.stub.thingReturns = append(o.stub.thingReturns, StubThingerThingReturn{R0: R0})\n\treturn o\n"
    ));
}

#[test]
fn thinger_is_deterministic() {
    for options in [StubOptions::default(), raw()] {
        let first = generate_stub(&fixture("thinger"), "Thinger", &options).unwrap();
        let second = generate_stub(&fixture("thinger"), "Thinger", &options).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn formatting_is_idempotent() {
    let formatted =
        generate_stub(&fixture("thinger"), "Thinger", &StubOptions::default()).unwrap();
    assert_eq!(format_go(&formatted).unwrap(), formatted);
}

#[test]
fn formatting_agrees_with_raw_output() {
    let unformatted = generate_stub(&fixture("thinger"), "Thinger", &raw()).unwrap();
    let formatted =
        generate_stub(&fixture("thinger"), "Thinger", &StubOptions::default()).unwrap();
    assert_eq!(format_go(&unformatted).unwrap(), formatted);
}

#[test]
fn zero_value_policy() {
    let options = StubOptions {
        exhausted: ExhaustedPolicy::ZeroValue,
        ..Default::default()
    };
    let output = generate_stub(&fixture("thinger"), "Thinger", &options).unwrap();
    assert!(!output.contains("else if"));
    assert!(output.contains("// zero values are returned.\n"));
}

// === Store ===

#[test]
fn store_unformatted() {
    let output = generate_stub(&fixture("store"), "Store", &raw()).unwrap();
    insta::assert_snapshot!(output);
}

#[test]
fn store_named_results_are_aligned() {
    let output = generate_stub(&fixture("store"), "Store", &StubOptions::default()).unwrap();
    assert!(output.contains("\tGetCalls   []StubStoreGetCall\n\tgetReturns []StubStoreGetReturn\n"));
    assert!(output.contains("\tvalue []byte\n\terr   error\n"));
    assert!(output.contains("func (s *StubStore) Get(key string) ([]byte, error) {\n"));
}

// === Signatures ===

const RUNNER: &str = r#"package svc

import (
	"context"
	"io"
	"strings"
)

func upper(s string) string { return strings.ToUpper(s) }

type Runner interface {
	Run(ctx context.Context, args ...string) error
	Open(string, int) (io.ReadCloser, error)
	Close()
}
"#;

#[test]
fn runner_signatures() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("runner.go"), RUNNER).unwrap();
    let output = generate_stub(dir.path(), "Runner", &StubOptions::default()).unwrap();

    assert!(output.contains("import (\n\t\"context\"\n\t\"io\"\n\t\"sync\"\n)\n"));
    assert!(!output.contains("\"strings\""));
    assert!(output.contains("func (s *StubRunner) Run(ctx context.Context, args ...string) error {\n"));
    assert!(output.contains("\tArg1 context.Context\n\tArg2 []string\n"));
    assert!(output.contains("func (s *StubRunner) Open(arg1 string, arg2 int) (io.ReadCloser, error) {\n"));
    assert!(output.contains("StubRunnerOpenCall{Arg1: arg1, Arg2: arg2}"));
    assert!(output.contains("func (s *StubRunner) Close() {\n"));
    assert!(output.contains("type StubRunnerCloseCall struct{}\n"));
    assert!(output.contains("func (o *StubRunnerCloseOn) Return() *StubRunnerCloseOn {\n"));
}

const CHECKER: &str = r#"package term

import (
	"github.com/mattn/go-isatty"
	"github.com/satori/go.uuid"
)

type Checker interface {
	Check(fd uintptr, id uuid.UUID) isatty.Mode
}
"#;

#[test]
fn prefixed_import_paths_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("checker.go"), CHECKER).unwrap();
    let output = generate_stub(dir.path(), "Checker", &StubOptions::default()).unwrap();
    assert!(output.contains(
        "import (\n\t\"github.com/mattn/go-isatty\"\n\t\"github.com/satori/go.uuid\"\n\t\"sync\"\n)\n"
    ));
    assert!(output.contains("func (s *StubChecker) Check(fd uintptr, id uuid.UUID) isatty.Mode {\n"));
}

const DOT: &str = r#"package ref

import . "example.com/types"

type Finder interface {
	Find(q Query) error
}
"#;

#[test]
fn dot_imports_are_carried() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("finder.go"), DOT).unwrap();
    let output = generate_stub(dir.path(), "Finder", &StubOptions::default()).unwrap();
    assert!(output.contains("import (\n\t. \"example.com/types\"\n\t\"sync\"\n)\n"));
}

const MULTILINE: &str = "package ref\n\ntype Multi interface {\n\tF(x struct {\n\t\tA int\n\t}) error\n}\n";

#[test]
fn multiline_parameter_types() {
    let mut outputs = Vec::new();
    for source in [MULTILINE.to_string(), MULTILINE.replace('\n', "\r\n")] {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("multi.go"), source).unwrap();
        let unformatted = generate_stub(dir.path(), "Multi", &raw()).unwrap();
        let formatted = generate_stub(dir.path(), "Multi", &StubOptions::default()).unwrap();
        assert!(!formatted.contains('\r'));
        assert_eq!(format_go(&unformatted).unwrap(), formatted);
        assert!(formatted.contains("// F implements Multi.F(x struct { A int }).\n"));
        assert!(formatted.contains("func (s *StubMulti) F(x struct {\n\tA int\n}) error {\n"));
        outputs.push(formatted);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn ignored_generator_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.go"), "package p\n\ntype I interface {\n\tM()\n}\n").unwrap();
    fs::write(
        dir.path().join("gen.go"),
        "//go:build ignore\n\npackage main\n\nfunc main() {}\n",
    )
    .unwrap();
    let output = generate_stub(dir.path(), "I", &StubOptions::default()).unwrap();
    assert!(output.contains("\npackage p\n"));
}

// === Errors ===

#[test]
fn unknown_interface() {
    let err = generate_stub(&fixture("thinger"), "Nope", &StubOptions::default()).unwrap_err();
    assert!(matches!(err, StubError::Extract(ExtractError::NotFound(ref name)) if name == "Nope"));
    assert_eq!(err.to_string(), "interface Nope not found");
}

#[test]
fn test_files_are_not_searched() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.go"), "package p\n").unwrap();
    fs::write(
        dir.path().join("a_test.go"),
        "package p\n\ntype Hidden interface {\n\tM()\n}\n",
    )
    .unwrap();
    let err = generate_stub(dir.path(), "Hidden", &StubOptions::default()).unwrap_err();
    assert!(matches!(err, StubError::Extract(ExtractError::NotFound(_))));
}

#[test]
fn missing_directory() {
    let err = generate_stub(&fixture("does-not-exist"), "Thinger", &StubOptions::default())
        .unwrap_err();
    assert!(matches!(err, StubError::Load(LoadError::Io { .. })));
}

// === CLI ===

#[test]
fn cli_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stub_thinger.go");
    let result = Command::new(env!("CARGO_BIN_EXE_stubgen"))
        .arg(fixture("thinger"))
        .arg("Thinger")
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Stub generated in"));

    let written = fs::read_to_string(&out).unwrap();
    let expected =
        generate_stub(&fixture("thinger"), "Thinger", &StubOptions::default()).unwrap();
    assert_eq!(written, expected);
}

#[test]
fn cli_reports_errors() {
    let result = Command::new(env!("CARGO_BIN_EXE_stubgen"))
        .arg(fixture("thinger"))
        .arg("Nope")
        .output()
        .unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("interface Nope not found"));
}
