use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::object::{native_bool_to_boolean_object, Environment, Function, Object, ScopeId, NULL};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

type EvalResult = std::result::Result<Object, EvalError>;

/// EvalError describes why evaluation stopped. It reaches callers of `eval` as an
/// `Object::Error` carrying the rendered message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {operator}{right}")]
    UnknownPrefixOperator {
        operator: PrefixOperator,
        right: &'static str,
    },
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
    #[error("not a function: {0}")]
    NotAFunction(&'static str),
    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },
    #[error("division by zero: {0} / 0")]
    DivisionByZero(i64),
}

/// Evaluates `program` in the global scope of `env`, returning the value of the
/// last statement executed. Failures come back as `Object::Error`.
#[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len()))]
pub fn eval(program: &Program, env: &mut Environment) -> Object {
    let global = env.global();

    match eval_program(program, env, global) {
        Ok(obj) => {
            env.maybe_collect(&obj);
            obj
        }
        Err(err) => {
            debug!(%err, "evaluation failed");
            Object::Error(err.to_string())
        }
    }
}

fn eval_program(program: &Program, env: &mut Environment, scope: ScopeId) -> EvalResult {
    let mut res = NULL;

    for statement in &program.statements {
        res = eval_statement(statement, env, scope)?;

        if let Object::ReturnValue(value) = res {
            return Ok(*value);
        }
    }

    Ok(res)
}

// Unlike a program, a block leaves return values wrapped so that they keep
// unwinding through enclosing blocks until the call frame or program unwraps them.
fn eval_block_statement(
    block: &BlockStatement,
    env: &mut Environment,
    scope: ScopeId,
) -> EvalResult {
    let mut res = NULL;

    for statement in &block.statements {
        res = eval_statement(statement, env, scope)?;

        if matches!(res, Object::ReturnValue(_)) {
            return Ok(res);
        }
    }

    Ok(res)
}

fn eval_statement(statement: &Statement, env: &mut Environment, scope: ScopeId) -> EvalResult {
    match statement {
        Statement::Expression(exp) => eval_expression(exp, env, scope),
        Statement::Let(name, exp) => {
            let value = eval_expression(exp, env, scope)?;

            // A `return` reached while computing the value leaves the enclosing
            // function; nothing is bound.
            if matches!(value, Object::ReturnValue(_)) {
                return Ok(value);
            }

            env.set(scope, name, value);
            Ok(NULL)
        }
        Statement::Return(exp) => {
            let value = eval_expression(exp, env, scope)?;
            Ok(Object::ReturnValue(Box::new(value)))
        }
    }
}

fn eval_expression(expression: &Expression, env: &mut Environment, scope: ScopeId) -> EvalResult {
    match expression {
        Expression::IntegerLiteral(v) => Ok(Object::Integer(*v)),
        Expression::Boolean(b) => Ok(native_bool_to_boolean_object(*b)),
        Expression::Prefix(operator, right) => {
            let right = eval_expression(right, env, scope)?;
            eval_prefix_expression(*operator, right)
        }
        Expression::Infix(operator, left, right) => {
            let left = eval_expression(left, env, scope)?;
            let right = eval_expression(right, env, scope)?;
            eval_infix_expression(*operator, left, right)
        }
        Expression::If(condition, consequence, alternative) => {
            let condition = eval_expression(condition, env, scope)?;

            if condition.is_truthy() {
                eval_block_statement(consequence, env, scope)
            } else if let Some(alternative) = alternative {
                eval_block_statement(alternative, env, scope)
            } else {
                Ok(NULL)
            }
        }
        Expression::Identifier(name) => eval_identifier(name, env, scope),
        Expression::FunctionLiteral(parameters, body) => Ok(Object::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: scope,
        }))),
        Expression::Call(function, arguments) => {
            let mark = env.pin_mark();
            let evaluated = eval_call_operands(function, arguments, env, scope);
            env.unpin(mark);

            let (function, args) = evaluated?;
            apply_function(function, args, env)
        }
    }
}

// The callee and each finished argument stay pinned while later arguments are
// evaluated, since those may run calls that trigger a collection.
fn eval_call_operands(
    function: &Expression,
    arguments: &[Expression],
    env: &mut Environment,
    scope: ScopeId,
) -> std::result::Result<(Object, Vec<Object>), EvalError> {
    let function = eval_expression(function, env, scope)?;
    env.pin(&function);

    let mut args = Vec::with_capacity(arguments.len());
    for arg in arguments {
        let arg = eval_expression(arg, env, scope)?;
        env.pin(&arg);
        args.push(arg);
    }

    Ok((function, args))
}

fn eval_identifier(name: &str, env: &Environment, scope: ScopeId) -> EvalResult {
    env.get(scope, name)
        .ok_or_else(|| EvalError::IdentifierNotFound(name.to_string()))
}

fn eval_prefix_expression(operator: PrefixOperator, right: Object) -> EvalResult {
    match operator {
        PrefixOperator::Bang => Ok(native_bool_to_boolean_object(!right.is_truthy())),
        PrefixOperator::Minus => match right {
            Object::Integer(v) => Ok(Object::Integer(v.wrapping_neg())),
            _ => Err(EvalError::UnknownPrefixOperator {
                operator,
                right: right.type_name(),
            }),
        },
    }
}

fn eval_infix_expression(operator: InfixOperator, left: Object, right: Object) -> EvalResult {
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => {
            eval_integer_infix_expression(operator, *l, *r)
        }
        (Object::Boolean(l), Object::Boolean(r)) if operator == InfixOperator::Eq => {
            Ok(native_bool_to_boolean_object(l == r))
        }
        (Object::Boolean(l), Object::Boolean(r)) if operator == InfixOperator::NotEq => {
            Ok(native_bool_to_boolean_object(l != r))
        }
        _ if left.type_name() != right.type_name() => Err(EvalError::TypeMismatch {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
        _ => Err(EvalError::UnknownInfixOperator {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
    }
}

fn eval_integer_infix_expression(operator: InfixOperator, left: i64, right: i64) -> EvalResult {
    let res = match operator {
        InfixOperator::Plus => Object::Integer(left.wrapping_add(right)),
        InfixOperator::Minus => Object::Integer(left.wrapping_sub(right)),
        InfixOperator::Asterisk => Object::Integer(left.wrapping_mul(right)),
        InfixOperator::Slash => {
            if right == 0 {
                return Err(EvalError::DivisionByZero(left));
            }
            Object::Integer(left.wrapping_div(right))
        }
        InfixOperator::Lt => native_bool_to_boolean_object(left < right),
        InfixOperator::Gt => native_bool_to_boolean_object(left > right),
        InfixOperator::Eq => native_bool_to_boolean_object(left == right),
        InfixOperator::NotEq => native_bool_to_boolean_object(left != right),
    };

    Ok(res)
}

fn apply_function(function: Object, args: Vec<Object>, env: &mut Environment) -> EvalResult {
    let function = match function {
        Object::Function(function) => function,
        other => return Err(EvalError::NotAFunction(other.type_name())),
    };

    if function.parameters.len() != args.len() {
        return Err(EvalError::WrongArgumentCount {
            want: function.parameters.len(),
            got: args.len(),
        });
    }

    trace!(arity = args.len(), "applying function");

    let scope = extend_function_env(&function, args, env);

    env.enter(scope);
    let evaluated = eval_block_statement(&function.body, env, scope);
    env.leave();

    let evaluated = unwrap_return_value(evaluated?);
    env.maybe_collect(&evaluated);

    Ok(evaluated)
}

fn extend_function_env(function: &Function, args: Vec<Object>, env: &mut Environment) -> ScopeId {
    let scope = env.new_enclosed(function.env);

    for (parameter, arg) in function.parameters.iter().zip(args) {
        env.set(scope, parameter, arg);
    }

    scope
}

fn unwrap_return_value(obj: Object) -> Object {
    match obj {
        Object::ReturnValue(value) => *value,
        obj => obj,
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator;
    use crate::lexer::Lexer;
    use crate::object::{Environment, Object};
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn eval_integer_expression() {
        expect_values(vec![
            ("5;", "5"),
            ("10;", "10"),
            ("-5", "-5"),
            ("-10", "-10"),
            ("5 + 5 + 5 + 5 - 10", "10"),
            ("2 * 2 * 2 * 2 * 2", "32"),
            ("-50 + 100 + -50", "0"),
            ("5 * 2 + 10", "20"),
            ("5 + 2 * 10", "25"),
            ("20 + 2 * -10", "0"),
            ("50 / 2 * 2 + 10", "60"),
            ("2 * (5 + 10)", "30"),
            ("3 * 3 * 3 + 10", "37"),
            ("3 * (3 * 3) + 10", "37"),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", "50"),
            ("(10 - (10 - 4) * 1) / 2", "2"),
            ("-7 / 2", "-3"),
            ("7 / -2", "-3"),
            ("9223372036854775807 + 1", "-9223372036854775808"),
        ]);
    }

    #[test]
    fn eval_boolean_expression() {
        expect_values(vec![
            ("true;", "true"),
            ("false;", "false"),
            ("1 < 2", "true"),
            ("1 > 2", "false"),
            ("1 < 1", "false"),
            ("1 > 1", "false"),
            ("1 == 1", "true"),
            ("1 != 1", "false"),
            ("1 == 2", "false"),
            ("1 != 2", "true"),
            ("true == true", "true"),
            ("false == false", "true"),
            ("true == false", "false"),
            ("true != false", "true"),
            ("false != true", "true"),
            ("(1 < 2) == true", "true"),
            ("(1 < 2) == false", "false"),
            ("(1 > 2) == true", "false"),
            ("(1 > 2) == false", "true"),
        ]);
    }

    #[test]
    fn eval_bang_expression() {
        expect_values(vec![
            ("!true;", "false"),
            ("!false;", "true"),
            ("!5;", "false"),
            ("!0", "false"),
            ("!!true;", "true"),
            ("!!false;", "false"),
            ("!!5;;", "true"),
            ("!if (false) { 1 }", "true"),
        ]);
    }

    #[test]
    fn eval_if_else_expression() {
        expect_values(vec![
            ("if (true) { 10 }", "10"),
            ("if (false) { 10 }", "null"),
            ("if (1) { 10 }", "10"),
            ("if (0) { 10 }", "10"),
            ("if (1 < 2) { 10 }", "10"),
            ("if (1 > 2) { 10 }", "null"),
            ("if (1 > 2) { 10 } else { 20 }", "20"),
            ("if (1 < 2) { 10 } else { 20 }", "10"),
            ("if (true) { }", "null"),
        ]);
    }

    #[test]
    fn eval_return_statements() {
        expect_values(vec![
            ("return 10;", "10"),
            ("return 10; 9;", "10"),
            ("return 2 * 5; 9;", "10"),
            ("9; return 2 * 5; 9;", "10"),
            ("if (10 > 1) { if (10 > 1) { return 10; } return 1; }", "10"),
            ("let f = fn() { return 1; 2 }; f(); 3", "3"),
            (
                "let f = fn(x) { if (x > 1) { return x; } 0 }; f(5) + f(1)",
                "5",
            ),
        ]);
    }

    #[test]
    fn eval_let_statements() {
        expect_values(vec![
            ("let a = 5; a;", "5"),
            ("let a = 5 * 5; a;", "25"),
            ("let a = 5; let b = a; b;", "5"),
            ("let a = 5; let b = a; let c = a + b + 5; c;", "15"),
            ("let a = 1; let a = a + 1; a", "2"),
            ("let a = 5;", "null"),
        ]);
    }

    #[test]
    fn return_inside_let_value_leaves_function() {
        expect_values(vec![
            ("let f = fn() { let x = if (true) { return 1; }; 2 }; f()", "1"),
            ("let f = fn() { let x = if (false) { return 1; }; x }; f()", "null"),
            ("let x = if (true) { return 5; }; 10", "5"),
            ("let x = if (true) { return 5; }; x", "5"),
        ]);

        let mut env = Environment::new();
        run_in(&mut env, "let x = if (true) { return 5; };");
        assert_eq!(env.get(env.global(), "x"), None);
    }

    #[test]
    fn error_handling() {
        expect_values(vec![
            ("5 + true;", "ERROR: type mismatch: INTEGER + BOOLEAN"),
            ("5 + true; 5;", "ERROR: type mismatch: INTEGER + BOOLEAN"),
            ("1 == true", "ERROR: type mismatch: INTEGER == BOOLEAN"),
            ("-true", "ERROR: unknown operator: -BOOLEAN"),
            ("true + false;", "ERROR: unknown operator: BOOLEAN + BOOLEAN"),
            ("true < false", "ERROR: unknown operator: BOOLEAN < BOOLEAN"),
            ("5; true + false; 5", "ERROR: unknown operator: BOOLEAN + BOOLEAN"),
            (
                "if (10 > 1) { true + false; }",
                "ERROR: unknown operator: BOOLEAN + BOOLEAN",
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                "ERROR: unknown operator: BOOLEAN + BOOLEAN",
            ),
            ("if (false) { 1 } == if (false) { 2 }", "ERROR: unknown operator: NULL == NULL"),
            ("foobar", "ERROR: identifier not found: foobar"),
            ("let a = foobar; a", "ERROR: identifier not found: foobar"),
            ("5(1)", "ERROR: not a function: INTEGER"),
            ("fn(x) { x }()", "ERROR: wrong number of arguments: want=1, got=0"),
            ("fn() { 1 }(2)", "ERROR: wrong number of arguments: want=0, got=1"),
            ("10 / 0", "ERROR: division by zero: 10 / 0"),
            (
                "let f = fn(a, b) { a }; f(1, missing, 1 + true)",
                "ERROR: identifier not found: missing",
            ),
            ("undefined(1 + true)", "ERROR: identifier not found: undefined"),
            ("let f = fn(x) { -x }; f(false)", "ERROR: unknown operator: -BOOLEAN"),
        ]);
    }

    #[test]
    fn errors_are_error_objects() {
        let obj = eval_input("5 + true;");

        assert_eq!(
            obj,
            Object::Error("type mismatch: INTEGER + BOOLEAN".to_string())
        );
        assert!(obj.is_error());
    }

    #[test]
    fn failed_let_does_not_bind() {
        let mut env = Environment::new();

        run_in(&mut env, "let a = 1;");
        run_in(&mut env, "let a = nope;");

        assert_eq!(env.get(env.global(), "a"), Some(Object::Integer(1)));
    }

    #[test]
    fn function_object() {
        expect_values(vec![("fn(x) { x + 2; };", "fn(x) {\n(x + 2)\n}")]);
    }

    #[test]
    fn function_application() {
        expect_values(vec![
            ("let identity = fn(x) { x; }; identity(5);", "5"),
            ("let identity = fn(x) { return x; }; identity(5);", "5"),
            ("let double = fn(x) { x * 2; }; double(5);", "10"),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", "10"),
            ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", "20"),
            ("fn(x) { x; }(5)", "5"),
            ("let noop = fn() { }; noop()", "null"),
        ]);
    }

    #[test]
    fn closures() {
        expect_values(vec![
            (
                "let newAdder = fn(x) { fn(y) { x + y }; }; let addTwo = newAdder(2); addTwo(2);",
                "4",
            ),
            (
                "let newAdder = fn(x) { fn(y) { x + y }; };
                 let addTwo = newAdder(2);
                 let addThree = newAdder(3);
                 addTwo(2) + addThree(10)",
                "17",
            ),
            (
                "let x = 100; let newAdder = fn(x) { fn(y) { x + y }; }; let addOne = newAdder(1); let x = 50; addOne(1)",
                "2",
            ),
            ("let y = 1; let f = fn() { y }; let g = fn(y) { f() }; g(7)", "1"),
        ]);
    }

    #[test]
    fn call_scope_does_not_leak() {
        expect_values(vec![
            ("let f = fn(x) { let inner = x; inner }; f(1); inner", "ERROR: identifier not found: inner"),
            ("let x = 10; let f = fn(x) { x }; f(1); x", "10"),
        ]);
    }

    #[test]
    fn finished_call_scopes_are_reclaimed() {
        let mut env = Environment::new();

        run_in(&mut env, "let h = fn() { 1 }; h()");
        run_in(&mut env, "let g = fn() { let h = fn() { 1 }; h() };");
        run_in(&mut env, &"g(); ".repeat(500));

        assert!(env.live_scopes() < 200, "{} scopes live", env.live_scopes());

        env.collect();
        assert_eq!(env.live_scopes(), 1);
    }

    #[test]
    fn captured_scopes_survive_collection() {
        let mut env = Environment::new();

        run_in(
            &mut env,
            "let newAdder = fn(x) { fn(y) { x + y } };
             let addTwo = newAdder(2);
             let curry = fn(a) { fn(b) { fn(c) { a + b + c } } };
             let g = fn() { let h = fn() { 1 }; h() };",
        );
        run_in(&mut env, &"g(); ".repeat(500));
        env.collect();

        // addTwo keeps the scope of its newAdder call alive.
        assert_eq!(env.live_scopes(), 2);
        assert_eq!(run_in(&mut env, "addTwo(3)"), Object::Integer(5));
        assert_eq!(run_in(&mut env, "curry(1)(2)(3)"), Object::Integer(6));
    }

    #[test]
    fn pinned_arguments_survive_collection() {
        // Each argument list builds closures while the other arguments run calls
        // that allocate and collect scopes.
        let mut env = Environment::new();

        run_in(
            &mut env,
            "let newAdder = fn(x) { fn(y) { x + y } };
             let churn = fn(n) { if (n > 0) { newAdder(n); newAdder(n); churn(n - 1) } else { 0 } };
             let apply2 = fn(f, n, g) { f(1) + g(1) };",
        );

        assert_eq!(
            run_in(&mut env, "apply2(newAdder(10), churn(40), newAdder(20))"),
            Object::Integer(32)
        );
        assert_eq!(
            run_in(&mut env, "newAdder(churn(40) + 5)(churn(40) + 1)"),
            Object::Integer(6)
        );
    }

    #[test]
    fn recursive_function() {
        expect_values(vec![(
            "let fibonacci = fn(x) {
                if (x == 0) {
                    0
                } else {
                    if (x == 1) {
                        return 1;
                    } else {
                        fibonacci(x - 1) + fibonacci(x - 2);
                    }
                }
            };
            fibonacci(15);",
            "610",
        )]);
    }

    fn expect_values(tests: Vec<(&str, &str)>) {
        for (input, expected) in &tests {
            let obj = eval_input(input);
            assert_eq!(obj.to_string(), expected.to_string(), "for `{}`", input);
        }
    }

    fn eval_input(input: &str) -> Object {
        run_in(&mut Environment::new(), input)
    }

    fn run_in(env: &mut Environment, input: &str) -> Object {
        let lexer = Lexer::new(input);
        let mut parser = Parser::new(lexer);

        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "Parser errors for `{}`: {:?}",
            input,
            parser.errors()
        );

        evaluator::eval(&program, env)
    }
}
