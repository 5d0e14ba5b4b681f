use aquila::{
    Chunk, CompileError, Error, ErrorKind, RuntimeError, Vm, VmConfig, Word, bytecode::disasm::disassemble,
    compile_source, run_source,
};

fn run_with_config(source: &str, config: VmConfig) -> Result<(Word, String), Error> {
    let mut out = Vec::new();
    let exit = run_source(source, config, &mut out)?;
    Ok((exit, String::from_utf8(out).unwrap()))
}

fn run(source: &str) -> (Word, String) {
    run_with_config(source, VmConfig::default()).unwrap()
}

fn output(source: &str) -> String {
    run(source).1
}

fn compile_error_kind(source: &str) -> ErrorKind {
    match run_with_config(source, VmConfig::default()) {
        Err(Error::Compile(err)) => err.kind(),
        other => panic!("expected a compile error, got {:?}", other),
    }
}

fn runtime_error(source: &str, config: VmConfig) -> RuntimeError {
    match run_with_config(source, config) {
        Err(Error::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

const FACTORIAL: &str = "
func fact(n: integer): integer {
    if n <= 1 {
        return 1;
    }
    return n * fact(n - 1);
}

func main(): integer {
    print(fact(10));
    return fact(5);
}
";

// =============================================================================
// Programs
// =============================================================================

#[test]
fn test_print_values() {
    let (exit, out) = run("func main(): integer { print(42); print(true); print(false); return 0; }");
    assert_eq!(out, "42\ntrue\nfalse\n");
    assert_eq!(exit, 0);
}

#[test]
fn test_recursive_factorial() {
    let (exit, out) = run(FACTORIAL);
    assert_eq!(out, "3628800\n");
    assert_eq!(exit, 120);
}

#[test]
fn test_recursive_fibonacci() {
    let out = output(
        "
        func fib(n: integer): integer {
            if n < 2 {
                return n;
            }
            return fib(n - 1) + fib(n - 2);
        }

        func main(): integer {
            print(fib(15));
            return 0;
        }
        ",
    );
    assert_eq!(out, "610\n");
}

#[test]
fn test_while_loop_sum() {
    let (exit, out) = run(
        "
        func main(): integer {
            let i: integer = 0;
            let sum: integer = 0;
            while i < 10 {
                i = i + 1;
                sum = sum + i;
            }
            print(sum);
            return sum;
        }
        ",
    );
    assert_eq!(out, "55\n");
    assert_eq!(exit, 55);
}

#[test]
fn test_loop_body_locals_are_popped_each_iteration() {
    let config = VmConfig {
        max_stack_size: 16,
        ..VmConfig::default()
    };
    let (exit, _) = run_with_config(
        "
        func main(): integer {
            let i: integer = 0;
            let total: integer = 0;
            while i < 1000 {
                let doubled: integer = i * 2;
                let tripled: integer = i * 3;
                total = total + tripled - doubled;
                i = i + 1;
            }
            return total;
        }
        ",
        config,
    )
    .unwrap();
    assert_eq!(exit, 499_500);
}

#[test]
fn test_shadowing_in_nested_block() {
    let out = output(
        "
        func main(): integer {
            let a: integer = 1;
            {
                let a: integer = 2;
                print(a);
            }
            print(a);
            return 0;
        }
        ",
    );
    assert_eq!(out, "2\n1\n");
}

#[test]
fn test_if_without_else() {
    let out = output(
        "
        func main(): integer {
            let x: integer = 3;
            if x > 2 { print(1); }
            if x > 5 { print(2); }
            print(x);
            return 0;
        }
        ",
    );
    assert_eq!(out, "1\n3\n");
}

#[test]
fn test_boolean_function() {
    let out = output(
        "
        func is_even(n: integer): boolean {
            return n / 2 * 2 == n;
        }

        func main(): integer {
            print(is_even(4));
            print(is_even(7));
            return 0;
        }
        ",
    );
    assert_eq!(out, "true\nfalse\n");
}

#[test]
fn test_arguments_evaluated_left_to_right() {
    let out = output(
        "
        func one(): integer { print(1); return 1; }
        func two(): integer { print(2); return 2; }
        func sub(a: integer, b: integer): integer { return a - b; }

        func main(): integer {
            print(sub(one(), two()));
            return 0;
        }
        ",
    );
    assert_eq!(out, "1\n2\n-1\n");
}

#[test]
fn test_parameters_are_copies() {
    let out = output(
        "
        func bump(n: integer): integer {
            n = n + 1;
            return n;
        }

        func main(): integer {
            let x: integer = 5;
            print(bump(x));
            print(x);
            return 0;
        }
        ",
    );
    assert_eq!(out, "6\n5\n");
}

#[test]
fn test_return_from_inside_loop_block() {
    let out = output(
        "
        func first_square_above(limit: integer): integer {
            let i: integer = 0;
            while true {
                let square: integer = i * i;
                if square > limit {
                    return i;
                }
                i = i + 1;
            }
            return -1;
        }

        func main(): integer {
            print(first_square_above(50));
            print(first_square_above(0));
            return 0;
        }
        ",
    );
    assert_eq!(out, "8\n1\n");
}

#[test]
fn test_arithmetic_over_integer_grid() {
    for a in (-40..=40).step_by(7) {
        for b in (-40..=40).step_by(9) {
            let source = format!(
                "func main(): integer {{ print(({}) - ({}) * 2 / 1); return 0; }}",
                a, b
            );
            assert_eq!(output(&source), format!("{}\n", a - b * 2), "a = {}, b = {}", a, b);
        }
    }
}

#[test]
fn test_arithmetic_over_variables() {
    for (a, b) in [(0, 1), (5, -3), (-17, 4), (1_000_000, -999), (-1, -1)] {
        let source = format!(
            "func main(): integer {{
                 let a: integer = {};
                 let b: integer = {};
                 print((a) - (b) * 2 / 1);
                 return a - b;
             }}",
            a, b
        );
        let (exit, out) = run(&source);
        assert_eq!(out, format!("{}\n", a - b * 2));
        assert_eq!(exit, a - b);
    }
}

#[test]
fn test_extreme_literals() {
    let (exit, out) = run(
        "func main(): integer {
             print(-9223372036854775808);
             print(9223372036854775807);
             return -9223372036854775808;
         }",
    );
    assert_eq!(out, "-9223372036854775808\n9223372036854775807\n");
    assert_eq!(exit, Word::MIN);
}

#[test]
fn test_call_with_two_arguments() {
    let out = output(
        "
        func add(x: integer, y: integer): integer { return x + y; }
        func main(): integer { print(add(2,3)); return 0; }
        ",
    );
    assert_eq!(out, "5\n");
}

#[test]
fn test_loop_then_code_after_it() {
    let out = output(
        "
        func main(): integer {
            let i: integer = 0;
            while (i < 3) {
                print(i);
                i = i + 1;
            }
            print(100);
            return i;
        }
        ",
    );
    assert_eq!(out, "0\n1\n2\n100\n");
}

#[test]
fn test_shadowing_in_bare_blocks() {
    let out = output(
        "
        func main(): integer {
            { let a: integer = 1; { let a: integer = 2; print(a); } print(a); }
            return 0;
        }
        ",
    );
    assert_eq!(out, "2\n1\n");
}

#[test]
fn test_precedence_and_unary_minus() {
    let out = output(
        "
        func main(): integer {
            print(2 + 3 * 4);
            print((2 + 3) * 4);
            print(-2 * -3);
            print(10 - 4 - 3);
            print(100 / 10 / 5);
            print(-7 / 2);
            return 0;
        }
        ",
    );
    assert_eq!(out, "14\n20\n6\n3\n2\n-3\n");
}

// =============================================================================
// Artifacts and tooling
// =============================================================================

#[test]
fn test_artifact_runs_like_source() {
    let chunk = compile_source(FACTORIAL).unwrap();
    let loaded = Chunk::from_bytes(&chunk.to_bytes().unwrap()).unwrap();
    assert_eq!(loaded, chunk);

    let mut out = Vec::new();
    let mut vm = Vm::new();
    vm.run(&loaded, &mut out).unwrap();
    assert_eq!(out, b"3628800\n");
    assert_eq!(vm.exit_value().map(|v| v.as_integer()), Some(120));
}

#[test]
fn test_disassembly_of_compiled_program() {
    let chunk = compile_source(FACTORIAL).unwrap();
    let text = disassemble(&chunk);
    let first = text.lines().next().unwrap();
    assert!(first.starts_with("0000   CALL"));
    assert!(text.contains("► LOAD"));
    assert!(text.contains("MUL"));
    assert!(text.contains("JUMP_IF_FALSE"));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_compile_errors_are_reported_before_running() {
    assert_eq!(compile_error_kind("func main(): integer { print(x); return 0; }"), ErrorKind::Name);
    assert_eq!(compile_error_kind("func main(): integer { return true; }"), ErrorKind::Type);
    assert_eq!(compile_error_kind("func main(): integer { return 0 }"), ErrorKind::Syntax);
    assert_eq!(compile_error_kind("func f(): integer { return 0; }"), ErrorKind::EntryPoint);
    assert_eq!(compile_error_kind("func main(): integer { return 1 @ 2; }"), ErrorKind::Lexical);
    assert_eq!(
        compile_error_kind(
            "func f(a: integer): integer { return a; }
             func main(): integer { return f(); }"
        ),
        ErrorKind::Arity
    );
}

#[test]
fn test_compile_error_message() {
    let err = run_with_config(
        "func main(): integer {\n    let flag: boolean = 1;\n    return 0;\n}",
        VmConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "compile error: line 2: expected boolean but found integer"
    );
}

#[test]
fn test_division_by_zero() {
    let err = runtime_error(
        "func main(): integer { let zero: integer = 0; print(10 / zero); return 0; }",
        VmConfig::default(),
    );
    assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
}

#[test]
fn test_output_before_runtime_error_is_kept() {
    let mut out = Vec::new();
    let result = run_source(
        "func main(): integer { print(1); print(1 / 0); return 0; }",
        VmConfig::default(),
        &mut out,
    );
    assert!(matches!(
        result,
        Err(Error::Runtime(RuntimeError::DivisionByZero { .. }))
    ));
    assert_eq!(out, b"1\n");
}

#[test]
fn test_integer_overflow() {
    let err = runtime_error(
        "
        func main(): integer {
            let n: integer = 2;
            while true {
                n = n * n;
            }
            return n;
        }
        ",
        VmConfig::default(),
    );
    assert!(matches!(err, RuntimeError::IntegerOverflow { .. }));
}

#[test]
fn test_unbounded_recursion_hits_frame_limit() {
    let source = "
        func down(n: integer): integer {
            return down(n + 1);
        }

        func main(): integer {
            return down(0);
        }
    ";
    let config = VmConfig {
        max_frames: 64,
        ..VmConfig::default()
    };
    let err = runtime_error(source, config);
    assert!(matches!(err, RuntimeError::FrameOverflow { limit: 64, .. }));

    let err = runtime_error(source, VmConfig::default());
    assert!(matches!(err, RuntimeError::FrameOverflow { limit: 256, .. }));
}

#[test]
fn test_recursion_within_frame_limit() {
    let config = VmConfig {
        max_frames: 12,
        ..VmConfig::default()
    };
    // main plus fact(10) .. fact(1)
    let (exit, _) = run_with_config(FACTORIAL, config).unwrap();
    assert_eq!(exit, 120);
}

#[test]
fn test_infinite_loop_hits_step_limit() {
    let config = VmConfig {
        max_steps: Some(10_000),
        ..VmConfig::default()
    };
    let err = runtime_error("func main(): integer { while true { } return 0; }", config);
    assert!(matches!(err, RuntimeError::StepLimitExceeded { limit: 10_000 }));
}

#[test]
fn test_function_without_final_return_is_rejected() {
    // would otherwise fall through into `never_called`
    assert_eq!(
        compile_error_kind(
            "func main(): integer { let a: integer = 7; print(a); }
             func never_called(): integer { print(99); return 0; }"
        ),
        ErrorKind::Return
    );

    let err = compile_source(
        "func f(x: integer): boolean {
             let y: integer = x;
         }

         func main(): integer {
             print(f(1));
             return 0;
         }",
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingReturn {
            line: 3,
            function: "f".to_string()
        }
    );
}
