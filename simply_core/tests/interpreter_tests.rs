use simply_core::language::{Error, ErrorKind, Interpreter};

type TestResult = Result<(), Error>;

const QUICKSORT: &str = include_str!("programs/quicksort.simply");

// run a program with the given standard input and return everything it wrote
fn run_with_input(code: &str, input: &str) -> Result<String, Error> {
    let mut output = Vec::new();
    Interpreter::new(input.as_bytes(), &mut output).run_source(code)?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn run(code: &str) -> Result<String, Error> {
    run_with_input(code, "")
}

fn run_err(code: &str) -> Error {
    match run(code) {
        Ok(output) => panic!("program should have failed, wrote {:?}", output),
        Err(e) => e,
    }
}

#[test]
fn operator_precedence_and_associativity() -> TestResult {
    let output = run("BEGIN PRINT 2 + 3 * 4, 2 ** 3 ** 2, 2 - 3 - 4, -2 ** 2 END")?;

    assert_eq!("14\n512\n-5\n4\n", output);

    Ok(())
}

#[test]
fn division_yields_floats() -> TestResult {
    let output = run("BEGIN PRINT 7 / 2, 4 / 2, 2 ** -1, 1.5 * 2 END")?;

    assert_eq!("3.5\n2.0\n0.5\n3.0\n", output);

    Ok(())
}

#[test]
fn division_by_zero_is_fatal() {
    let literal = run_err("BEGIN PRINT 1 / 0 END");
    assert_eq!(literal.kind, ErrorKind::Runtime);
    assert!(literal.message.contains("Division by 0"));

    let code = "\
        NUMBER x\n\
        BEGIN\n\
            x := 2 - 2\n\
            PRINT 10 / x\n\
        END";
    let computed = run_err(code);
    assert!(computed.message.contains("Division by 0"));
    assert_eq!(computed.line, Some(4));

    assert!(run_err("BEGIN PRINT 0 ** -1 END").message.contains("Division by 0"));
}

#[test]
fn arithmetic_type_errors() {
    assert!(run_err("BEGIN PRINT \"a\" + 1 END").message.starts_with("Cannot add these types"));
    assert!(run_err("BEGIN PRINT 'a' * 2 END").message.starts_with("Cannot multiply these types"));
    assert!(run_err("BEGIN PRINT -\"a\" END").message.starts_with("Cannot negate this type"));
    assert!(run_err("BEGIN IF \"a\" < 1 BEGIN PRINT 1 END END").message.starts_with("Cannot compare"));
}

#[test]
fn integer_overflow_is_fatal() {
    let e = run_err("BEGIN PRINT 9223372036854775807 + 1 END");

    assert!(e.message.contains("Integer overflow"));
}

#[test]
fn if_else_runs_exactly_one_branch() -> TestResult {
    let code = "\
        NUMBER x\n\
        BEGIN\n\
            x := 0\n\
            IF 1 < 2 BEGIN PRINT \"then\" END ELSE BEGIN x := 99 PRINT \"else\" END\n\
            IF 2 < 1 BEGIN x := 50 END ELSE BEGIN PRINT \"else\" END\n\
            IF x ~= 0 BEGIN PRINT \"unreachable\" END\n\
            PRINT x\n\
        END";

    let output = run(code)?;

    assert_eq!("then\nelse\n0\n", output);

    Ok(())
}

#[test]
fn break_leaves_loop_and_does_not_leak() -> TestResult {
    let code = "\
        NUMBER i\n\
        BEGIN\n\
            i := 0\n\
            WHILE i < 10 BEGIN\n\
                i := i + 1\n\
                IF i = 3 BEGIN BREAK END\n\
                PRINT i\n\
            END\n\
            PRINT \"after\"\n\
            WHILE i < 5 BEGIN i := i + 1 END\n\
            PRINT i\n\
        END";

    let output = run(code)?;

    assert_eq!("1\n2\nafter\n5\n", output);

    Ok(())
}

#[test]
fn break_skips_the_next_condition_test() -> TestResult {
    let code = "\
        NUMBER i\n\
        DEF NUMBER check(NUMBER n) BEGIN PRINT \"check\" RETURN n END\n\
        BEGIN\n\
            i := 0\n\
            WHILE check(i) < 10 BEGIN\n\
                i := i + 1\n\
                IF i = 3 BEGIN BREAK END\n\
                PRINT i\n\
            END\n\
            PRINT \"after\"\n\
        END";

    let output = run(code)?;

    assert_eq!("check\n1\ncheck\n2\ncheck\nafter\n", output);

    Ok(())
}

#[test]
fn free_names_resolve_through_the_caller() -> TestResult {
    let code = "\
        DEF PROC show() BEGIN PRINT y END\n\
        DEF PROC caller() BEGIN NUMBER y y := 42 show() END\n\
        BEGIN\n\
            caller()\n\
        END";

    let output = run(code)?;

    assert_eq!("42\n", output);

    Ok(())
}

#[test]
fn free_names_fail_without_a_binding_caller() {
    let code = "\
        DEF PROC show() BEGIN PRINT y END\n\
        BEGIN\n\
            show()\n\
        END";

    let e = run_err(code);

    assert_eq!(e.to_string(), "Runtime error on line 1: Undefined variable y");
}

#[test]
fn quicksort_sorts_array_argument_in_place() -> TestResult {
    let output = run_with_input(QUICKSORT, "5\n3\n1\n4\n2\n")?;

    let expected = "\
        arr[0] := arr[1] := arr[2] := arr[3] := arr[4] := \
        1\n\
        2\n\
        3\n\
        4\n\
        5\n";

    assert_eq!(expected, output);

    Ok(())
}

#[test]
fn split_produces_string_array() -> TestResult {
    let code = "\
        STRING parts\n\
        STRING line\n\
        BEGIN\n\
            parts[] := SPLIT (\"a,b,c\") \",\"\n\
            PRINT parts\n\
            line := \"x y\"\n\
            parts[] := SPLIT (line) \" \"\n\
            PRINT parts[1]\n\
        END";

    let output = run(code)?;

    assert_eq!("a\nb\nc\ny\n", output);

    Ok(())
}

#[test]
fn split_with_empty_delimiter_is_fatal() {
    let e = run_err("STRING parts BEGIN parts[] := SPLIT (\"abc\") \"\" END");

    assert!(e.message.contains("Empty SPLIT delimiter"));
}

#[test]
fn two_dimensional_element_assignment() -> TestResult {
    let code = "\
        NUMBER m[2,3]\n\
        BEGIN\n\
            m[1,2] := 9\n\
            PRINT m[1,2], m[0,0]\n\
            PRINT m\n\
        END";

    let output = run(code)?;

    assert_eq!("9\nNone\n[None, None, None]\n[None, None, 9]\n", output);

    Ok(())
}

#[test]
fn array_containing_itself_prints_and_compares() -> TestResult {
    let code = "\
        NUMBER a[2]\n\
        BEGIN\n\
            a[0] := a\n\
            PRINT a\n\
            IF a = a BEGIN PRINT \"same\" END\n\
        END";

    let output = run(code)?;

    assert_eq!("[[...], None]\nNone\nsame\n", output);

    Ok(())
}

#[test]
fn oversized_array_is_fatal() {
    let e = run_err("NUMBER a[9223372036854775807] BEGIN PRINT 1 END");
    assert_eq!(e.kind, ErrorKind::Runtime);
    assert!(e.message.contains("too large"));

    let e = run_err("NUMBER m[4294967296, 4294967296] BEGIN PRINT 1 END");
    assert!(e.message.contains("too large"));
}

#[test]
fn out_of_range_index_is_fatal() {
    assert!(run_err("NUMBER a[2] BEGIN a[2] := 1 END").message.contains("out of range"));
    assert!(run_err("NUMBER a[2] BEGIN PRINT a[0 - 1] END").message.contains("out of range"));
    assert!(run_err("NUMBER a[2] BEGIN PRINT a[0.5] END").message.contains("must be an integer"));
}

#[test]
fn reassignment_updates_existing_binding() -> TestResult {
    let code = "\
        NUMBER x\n\
        DEF PROC bump() BEGIN x := x + 1 END\n\
        BEGIN\n\
            x := 1\n\
            x := x + 10\n\
            bump()\n\
            PRINT x\n\
        END";

    let output = run(code)?;

    assert_eq!("12\n", output);

    let e = run_err("BEGIN z := 1 END");
    assert!(e.message.contains("Undefined variable z"));

    Ok(())
}

#[test]
fn swap_exchanges_values() -> TestResult {
    let code = "\
        NUMBER a\n\
        NUMBER b\n\
        NUMBER v[2]\n\
        BEGIN\n\
            a := 1\n\
            b := 2\n\
            a :=: b\n\
            v[0] := 7\n\
            v[0] :=: a\n\
            PRINT a, b, v\n\
        END";

    let output = run(code)?;

    assert_eq!("7\n1\n2\nNone\n", output);

    Ok(())
}

#[test]
fn import_reads_whole_file() -> TestResult {
    let path = std::env::temp_dir().join(format!("simply_import_{}.txt", std::process::id()));
    std::fs::write(&path, "hello\nworld").map_err(Error::from)?;

    let code = format!(
        "STRING s\nBEGIN\n    s := IMPORT \"{}\"\n    PRINT s\nEND",
        path.display()
    );
    let output = run(&code);
    let _ = std::fs::remove_file(&path);

    assert_eq!("hello\nworld\n", output?);

    Ok(())
}

#[test]
fn import_of_missing_file_is_io_error() {
    let e = run_err("STRING s BEGIN s := IMPORT \"/definitely/not/here.txt\" END");

    assert_eq!(e.kind, ErrorKind::Io);
    assert_eq!(e.line, Some(1));
}

#[test]
fn read_prompts_and_coerces_input() -> TestResult {
    let code = "\
        NUMBER a\n\
        NUMBER b\n\
        STRING c\n\
        NUMBER grid[2,2]\n\
        BEGIN\n\
            READ a, b, c, grid\n\
            PRINT a + 1, b * 2, c, grid[1,0]\n\
        END";

    let output = run_with_input(code, "41\n1.5\nhi there\n1\n2\n3\n4\n")?;

    let expected = "\
        a := b := c := grid[0,0] := grid[0,1] := grid[1,0] := grid[1,1] := \
        42\n\
        3.0\n\
        hi there\n\
        3\n";

    assert_eq!(expected, output);

    Ok(())
}

#[test]
fn read_at_end_of_input_is_fatal() {
    let e = run_err("NUMBER a BEGIN READ a END");

    assert_eq!(e.kind, ErrorKind::Runtime);
    assert!(e.message.contains("end of input"));
}

#[test]
fn recursion_returns_values() -> TestResult {
    let code = "\
        DEF NUMBER fact(NUMBER n)\n\
        BEGIN\n\
            IF n <= 1 BEGIN RETURN 1 END\n\
            RETURN n * fact(n - 1)\n\
        END\n\
        BEGIN\n\
            PRINT fact(10)\n\
        END";

    let output = run(code)?;

    assert_eq!("3628800\n", output);

    Ok(())
}

#[test]
fn return_stops_enclosing_loop() -> TestResult {
    let code = "\
        DEF NUMBER first_over(NUMBER limit)\n\
        BEGIN\n\
            NUMBER i\n\
            i := 0\n\
            WHILE i < 100 BEGIN\n\
                i := i + 1\n\
                IF i * i > limit BEGIN RETURN i END\n\
            END\n\
            RETURN 0 - 1\n\
        END\n\
        BEGIN\n\
            PRINT first_over(50)\n\
        END";

    let output = run(code)?;

    assert_eq!("8\n", output);

    Ok(())
}

#[test]
fn recursion_just_under_the_default_depth_completes() -> TestResult {
    let code = "\
        DEF NUMBER depth(NUMBER n)\n\
        BEGIN\n\
            IF n = 0 BEGIN RETURN 0 END\n\
            RETURN 1 + depth(n - 1)\n\
        END\n\
        BEGIN\n\
            PRINT depth(990)\n\
        END";

    let output = run(code)?;

    assert_eq!("990\n", output);

    Ok(())
}

#[test]
fn recursion_past_the_default_depth_is_reported() {
    let code = "\
        DEF NUMBER depth(NUMBER n)\n\
        BEGIN\n\
            IF n = 0 BEGIN RETURN 0 END\n\
            RETURN 1 + depth(n - 1)\n\
        END\n\
        BEGIN\n\
            PRINT depth(5000)\n\
        END";

    let e = run_err(code);

    assert!(e.message.starts_with("Maximum call depth of 1000 exceeded"));
}

#[test]
fn call_errors() {
    let code = "DEF PROC f(NUMBER a) BEGIN PRINT a END BEGIN f(1, 2) END";
    assert!(run_err(code).message.starts_with("Wrong number of parameters to function f"));

    assert!(run_err("BEGIN g() END").message.contains("Call to undefined function g"));
    assert!(run_err("NUMBER g BEGIN g() END").message.contains("Call to non-function g"));
    assert!(run_err("DEF PROC f() BEGIN PRINT 1 END BEGIN PRINT f END").message.contains("f is not a variable"));
}

#[test]
fn call_depth_is_bounded() {
    let code = "DEF PROC f() BEGIN f() END BEGIN f() END";
    let mut output = Vec::new();

    let e = Interpreter::new(&b""[..], &mut output)
        .with_max_call_depth(16)
        .run_source(code)
        .unwrap_err();

    assert!(e.message.starts_with("Maximum call depth of 16 exceeded"));
}

#[test]
fn syntax_errors_report_position() {
    let code = "NUMBER x\nBEGIN\n  IF x BEGIN PRINT x END\nEND";

    let e = run_err(code);

    assert_eq!(e.kind, ErrorKind::Parser);
    assert_eq!(
        e.to_string(),
        "Parser error at line 3, column 8: expected token GREATER_THAN_OR_EQUAL, received token BEGIN"
    );
}
