#[cfg(test)]
mod interpreter_tests {
    use rox as lox;

    use lox::driver::{run, RunError, EXIT_RUNTIME, EXIT_STATIC};
    use lox::error::RuntimeError;

    /// Run a program and return everything it printed.
    fn output(source: &str) -> String {
        let mut out: Vec<u8> = Vec::new();
        if let Err(e) = run(source, &mut out) {
            panic!("program failed: {}", e);
        }
        String::from_utf8(out).expect("output is UTF-8")
    }

    /// Run a program that must fail at runtime; return its output so far and
    /// the error.
    fn runtime_failure(source: &str) -> (String, RuntimeError) {
        let mut out: Vec<u8> = Vec::new();
        match run(source, &mut out) {
            Err(RunError::Runtime(e)) => (String::from_utf8(out).expect("UTF-8"), e),
            Err(other) => panic!("expected a runtime error, got: {}", other),
            Ok(()) => panic!("expected a runtime error, program succeeded"),
        }
    }

    #[test]
    fn test_arithmetic_and_printing() {
        assert_eq!(output("print 1 + 1.0;"), "2\n");
        assert_eq!(output("print 7 / 2;"), "3.5\n");
        assert_eq!(output("print -(3 - 5) * 2;"), "4\n");
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output("print nil; print true; print !0;"), "nil\ntrue\nfalse\n");
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(output("print 1 / 0;"), "inf\n");
        assert_eq!(output("print -1 / 0;"), "-inf\n");
    }

    #[test]
    fn test_equality() {
        assert_eq!(output("print 1 == 1; print \"a\" == \"a\"; print nil == false;"), "true\ntrue\nfalse\n");
        assert_eq!(output("print 1 == \"1\"; print nil == nil;"), "false\ntrue\n");
        assert_eq!(output("fun f() {} var g = f; print f == g; print clock == clock;"), "true\ntrue\n");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(output("print nil or \"x\"; print 1 and 2; print false and boom;"), "x\n2\nfalse\n");
    }

    #[test]
    fn test_global_redeclaration_takes_the_later_value() {
        assert_eq!(output("var a = \"before\"; var a = \"after\"; print a;"), "after\n");
    }

    #[test]
    fn test_uninitialized_variable_is_nil() {
        assert_eq!(output("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        let source = "var a = \"global\";\n\
                      { var a = \"outer\"; { var a = \"inner\"; print a; } print a; }\n\
                      print a;";
        assert_eq!(output(source), "inner\nouter\nglobal\n");
    }

    #[test]
    fn test_closures_capture_the_defining_scope() {
        // The closure keeps seeing the outer `a` even after a shadowing local
        // appears in the same block.
        let source = "var a = \"global\";\n\
                      {\n\
                        fun show() { print a; }\n\
                        show();\n\
                        var a = \"block\";\n\
                        show();\n\
                      }";
        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn test_returned_closure_keeps_parameters_alive() {
        let source = "fun makeAdder(n) { fun add(x) { return x + n; } return add; }\n\
                      var add2 = makeAdder(2);\n\
                      print add2(40);";
        assert_eq!(output(source), "42\n");
    }

    #[test]
    fn test_counter_closure_mutates_captured_state() {
        let source = "fun counter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }\n\
                      var c = counter(); c(); c();\n\
                      print c();\n\
                      var d = counter();\n\
                      print d();";
        assert_eq!(output(source), "3\n1\n");
    }

    #[test]
    fn test_recursion_and_forward_reference() {
        let source = "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
                      print fib(15);\n\
                      fun isEven(n) { if (n == 0) return true; return isOdd(n - 1); }\n\
                      fun isOdd(n) { if (n == 0) return false; return isEven(n - 1); }\n\
                      print isEven(10);";
        assert_eq!(output(source), "610\ntrue\n");
    }

    #[test]
    fn test_return_unwinds_loops_and_blocks() {
        let source = "fun find() { var i = 0; while (true) { { if (i == 3) return i; } i = i + 1; } }\n\
                      print find();\n\
                      fun early() { for (var i = 0; i < 10; i = i + 1) { if (i == 2) return \"two\"; } return \"none\"; }\n\
                      print early();";
        assert_eq!(output(source), "3\ntwo\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output("fun f() {} print f(); fun g() { return; } print g();"), "nil\nnil\n");
    }

    #[test]
    fn test_for_and_while_loops() {
        assert_eq!(
            output("var s = 0; for (var i = 1; i <= 4; i = i + 1) s = s + i; print s;"),
            "10\n"
        );
        assert_eq!(output("var n = 3; while (n > 0) { print n; n = n - 1; }"), "3\n2\n1\n");
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(output("fun f() {} print f; print clock;"), "<fn f>\n<native fn>\n");
    }

    #[test]
    fn test_clock_is_a_number_that_does_not_go_backwards() {
        assert_eq!(
            output("var a = clock(); var b = clock(); print b >= a; print a >= 0;"),
            "true\ntrue\n"
        );
    }

    #[test]
    fn test_type_errors() {
        let (_, e) = runtime_failure("print 1 + \"a\";");
        assert_eq!(e.to_string(), "Operands must be two numbers or two strings.\n[line 1]");

        let (_, e) = runtime_failure("print 1 < \"a\";");
        assert_eq!(e.to_string(), "Operands must be numbers.\n[line 1]");

        let (_, e) = runtime_failure("print -nil;");
        assert_eq!(e.to_string(), "Operand must be a number.\n[line 1]");
    }

    #[test]
    fn test_arity_mismatch_names_both_counts() {
        let (_, e) = runtime_failure("fun f(a, b) {}\nf(1);");
        assert!(matches!(e, RuntimeError::ArityMismatch { expected: 2, got: 1, line: 2 }));
        assert_eq!(e.to_string(), "Expected 2 arguments but got 1.\n[line 2]");

        let (_, e) = runtime_failure("clock(1);");
        assert_eq!(e.to_string(), "Expected 0 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, e) = runtime_failure("\"not a function\"();");
        assert_eq!(e.to_string(), "Can only call functions and classes.\n[line 1]");
    }

    #[test]
    fn test_undefined_variable() {
        let (_, e) = runtime_failure("print 1;\nprint missing;");
        assert_eq!(e.to_string(), "Undefined variable 'missing'.\n[line 2]");

        let (_, e) = runtime_failure("missing = 1;");
        assert!(matches!(e, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_output_before_a_runtime_error_is_kept() {
        let (printed, _) = runtime_failure("print \"first\"; print 1 - nil; print \"never\";");
        assert_eq!(printed, "first\n");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let mut out: Vec<u8> = Vec::new();
        let err = run("print \"side effect\"; { var a = a; }", &mut out).unwrap_err();

        assert!(matches!(err, RunError::Static(_)));
        assert_eq!(err.exit_code(), EXIT_STATIC);
        assert!(out.is_empty());
    }

    #[test]
    fn test_runtime_errors_exit_with_70() {
        let err = run("nil();", Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
    }

    const TRACE: &str = "var log = \"\";\n\
                         fun t(x) { log = log + x; return x; }\n";

    #[test]
    fn test_evaluation_order_is_left_to_right() {
        let source = format!(
            "{}fun f(a, b, c) {{}}\n\
             f(t(\"a\"), t(\"b\"), t(\"c\"));\n\
             t(\"x\") + t(\"y\");\n\
             t(\"l\") == t(\"r\");\n\
             print log;",
            TRACE
        );
        assert_eq!(output(&source), "abcxylr\n");
    }

    #[test]
    fn test_assignment_target_is_evaluated_before_its_value() {
        let source = format!(
            "{}class Box {{}}\n\
             var box = Box();\n\
             fun target(x) {{ t(x); return box; }}\n\
             target(\"o\").field = t(\"v\");\n\
             print log;\n\
             print box.field;",
            TRACE
        );
        assert_eq!(output(&source), "ov\nv\n");
    }

    #[test]
    fn test_short_circuit_skips_the_right_operand() {
        let source = format!(
            "{}print false and t(\"1\");\n\
             print true or t(\"2\");\n\
             print nil or t(\"3\");\n\
             print true and t(\"4\");\n\
             print log;",
            TRACE
        );
        assert_eq!(output(&source), "false\ntrue\n3\n4\n34\n");
    }
}
