#[cfg(test)]
mod resolver_tests {
    use rox as lox;

    use lox::ast::Stmt;
    use lox::driver::scan;
    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::{Locals, Resolver};

    fn resolve_errors(source: &str) -> Vec<String> {
        let (tokens, _) = scan(source);
        let statements = Parser::new(&tokens).parse().expect("program parses");

        match Resolver::new().resolve(&statements) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(LoxError::to_string).collect(),
        }
    }

    #[test]
    fn test_own_initializer_read_is_rejected_in_locals_only() {
        assert_eq!(
            resolve_errors("{ var a = 1; { var a = a; } }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );

        // At global scope the read is left to runtime.
        assert!(resolve_errors("var a = a;").is_empty());
    }

    #[test]
    fn test_forward_reference_to_global_function_resolves() {
        assert!(resolve_errors("fun a() { return b(); } fun b() { return 1; } print a();").is_empty());
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            resolve_errors("return;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
        assert_eq!(
            resolve_errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        // A bare return inside init is fine.
        assert!(resolve_errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_and_super_placement() {
        assert_eq!(
            resolve_errors("fun f() { return this; }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            resolve_errors("print super.x;"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            resolve_errors("class A { f() { return super.f(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            resolve_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_nested_function_inside_method_keeps_this() {
        assert!(resolve_errors(
            "class A { m() { fun inner() { return this; } return inner; } }"
        )
        .is_empty());
    }

    #[test]
    fn test_resolving_twice_gives_the_same_table_and_behaviour() {
        let (tokens, _) = scan(
            "fun outer() { var x = 1; fun inner() { x = x + 1; return x; } return inner; }\n\
             class A { m() { return \"A\"; } }\n\
             class B < A { m() { return super.m() + \"B\"; } }\n\
             var counter = outer();\n\
             print counter();\n\
             print counter();\n\
             print B().m();\n\
             var a = \"global\";\n\
             { fun show() { print a; } show(); var a = \"block\"; show(); }",
        );
        let statements = Parser::new(&tokens).parse().expect("program parses");

        let first = Resolver::new().resolve(&statements).expect("resolves");
        let second = Resolver::new().resolve(&statements).expect("resolves");

        assert!(!first.is_empty());
        assert_eq!(first, second);

        let first_output = run_with(&statements, first);
        let second_output = run_with(&statements, second);

        assert_eq!(first_output, "2\n3\nAB\nglobal\nglobal\n");
        assert_eq!(first_output, second_output);
    }

    /// Evaluate `statements` in a fresh interpreter using `locals`.
    fn run_with<'a>(statements: &'a [Stmt<'a>], locals: Locals) -> String {
        let mut out: Vec<u8> = Vec::new();
        {
            let mut interpreter = Interpreter::new(&mut out);
            interpreter.add_locals(locals);
            interpreter.interpret(statements).expect("program runs");
        }
        String::from_utf8(out).expect("output is UTF-8")
    }
}
