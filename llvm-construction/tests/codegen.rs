use ast::{build::*, Program, Type};
use compiler_shared::context::Context;
use llvm_construction::{FieldLayout, Layout, ProgramGenerator};
use strtab::{StringTable, Symbol};
use type_checking::{check, CheckerOptions};

fn compile(program: &Program<'_>) -> String {
    compile_with(program, FieldLayout::default())
}

fn compile_with(program: &Program<'_>, strategy: FieldLayout) -> String {
    let context = Context::dummy();
    let (mut model, analysis) =
        check(program, &context, &CheckerOptions::default()).expect("program is valid");
    let layout = Layout::compute(&mut model, strategy).unwrap();

    let mut out = Vec::new();
    ProgramGenerator::new(program, &model, &layout, &analysis)
        .generate(&mut out)
        .unwrap();
    String::from_utf8(out).unwrap()
}

/// The definition of the function whose header starts with `header`.
fn function<'ir>(ir: &'ir str, header: &str) -> &'ir str {
    let start = ir
        .find(&format!("define {}", header))
        .unwrap_or_else(|| panic!("no function {} in\n{}", header, ir));
    let len = ir[start..].find("}\n").expect("function is terminated") + 2;
    &ir[start..start + len]
}

struct Names(StringTable<'static>);

impl Names {
    fn new() -> Self {
        Names(StringTable::new())
    }

    fn get(&mut self, name: &'static str) -> Symbol<'static> {
        self.0.intern(name)
    }

    fn main(
        &mut self,
        vars: Vec<ast::Spanned<ast::VarDeclaration<'static>>>,
        statements: Vec<ast::Spanned<ast::Stmt<'static>>>,
        classes: Vec<ast::Spanned<ast::ClassDeclaration<'static>>>,
    ) -> Program<'static> {
        let (main, args) = (self.get("Main"), self.get("args"));
        program(main_class(main, args, vars, statements), classes)
    }
}

#[test]
fn module_starts_with_prelude_and_vtables() {
    let mut n = Names::new();
    let program = n.main(vec![], vec![], vec![]);
    let ir = compile(&program);

    assert!(ir.starts_with("declare i8* @calloc(i32, i32)\n"));
    let vtable = ir.find("@.Main_vtable = global [0 x i8*] []").unwrap();
    let main = ir.find("define i32 @main()").unwrap();
    assert!(ir.find("define void @throw_nsz()").unwrap() < vtable);
    assert!(vtable < main);
}

#[test]
fn print_of_arithmetic() {
    let mut n = Names::new();
    let program = n.main(
        vec![],
        vec![print(mul(add(int(1), int(2)), bracket(sub(int(5), int(3)))))],
        vec![],
    );

    assert_eq!(
        function(&compile(&program), "i32 @main"),
        "define i32 @main() {\n\
         entry:\n\
         \t%_0 = add i32 1, 2\n\
         \t%_1 = sub i32 5, 3\n\
         \t%_2 = mul i32 %_0, %_1\n\
         \tcall void (i32) @print_int(i32 %_2)\n\
         \tret i32 0\n\
         }\n"
    );
}

#[test]
fn allocation_installs_vtable_and_calls_dispatch_through_it() {
    let mut n = Names::new();
    let (a, b, m, y, obj) = (n.get("A"), n.get("B"), n.get("m"), n.get("y"), n.get("obj"));
    let program = n.main(
        vec![var(Type::Class(a), obj)],
        vec![
            assign(obj, new_object(b)),
            print(call(ident(obj), m, vec![])),
        ],
        vec![
            class(
                a,
                None,
                vec![],
                vec![method(Type::Int, m, vec![], vec![], vec![], int(1))],
            ),
            class(
                b,
                Some(a),
                vec![var(Type::Int, y)],
                vec![method(Type::Int, m, vec![], vec![], vec![], int(2))],
            ),
        ],
    );
    let ir = compile(&program);

    assert!(ir.contains(
        "@.B_vtable = global [1 x i8*] [\n\
         \ti8* bitcast (i32 (i8*)* @B.m to i8*)\n\
         ]\n"
    ));
    assert_eq!(
        function(&ir, "i32 @main"),
        "define i32 @main() {\n\
         entry:\n\
         \t%Main_main_obj = alloca i8*\n\
         \t%_0 = call i8* @calloc(i32 1, i32 20)\n\
         \t%_1 = bitcast i8* %_0 to i8***\n\
         \t%_2 = getelementptr [1 x i8*], [1 x i8*]* @.B_vtable, i32 0, i32 0\n\
         \tstore i8** %_2, i8*** %_1\n\
         \tstore i8* %_0, i8** %Main_main_obj\n\
         \t%_3 = load i8*, i8** %Main_main_obj\n\
         \t%_4 = bitcast i8* %_3 to i8***\n\
         \t%_5 = load i8**, i8*** %_4\n\
         \t%_6 = getelementptr i8*, i8** %_5, i32 0\n\
         \t%_7 = load i8*, i8** %_6\n\
         \t%_8 = bitcast i8* %_7 to i32 (i8*)*\n\
         \t%_9 = call i32 %_8(i8* %_3)\n\
         \tcall void (i32) @print_int(i32 %_9)\n\
         \tret i32 0\n\
         }\n"
    );
}

#[test]
fn parameters_are_copied_into_stack_slots() {
    let mut n = Names::new();
    let (a, id, v, b, tmp) = (n.get("A"), n.get("id"), n.get("v"), n.get("b"), n.get("tmp"));
    let program = n.main(
        vec![],
        vec![],
        vec![class(
            a,
            None,
            vec![],
            vec![method(
                Type::Int,
                id,
                vec![var(Type::Int, v), var(Type::Boolean, b)],
                vec![var(Type::IntArray, tmp)],
                vec![],
                ident(v),
            )],
        )],
    );

    assert_eq!(
        function(&compile(&program), "i32 @A.id"),
        "define i32 @A.id(i8* %this, i32 %.v, i1 %.b) {\n\
         entry:\n\
         \t%A_id_v = alloca i32\n\
         \t%A_id_b = alloca i1\n\
         \t%A_id_tmp = alloca i32*\n\
         \tstore i32 %.v, i32* %A_id_v\n\
         \tstore i1 %.b, i1* %A_id_b\n\
         \t%_0 = load i32, i32* %A_id_v\n\
         \tret i32 %_0\n\
         }\n"
    );
}

#[test]
fn fields_are_addressed_behind_the_header() {
    let mut n = Names::new();
    let (a, b, x, flag, get) = (n.get("A"), n.get("B"), n.get("x"), n.get("flag"), n.get("get"));
    let program = n.main(
        vec![],
        vec![],
        vec![
            class(a, None, vec![var(Type::Int, x)], vec![]),
            class(
                b,
                Some(a),
                vec![var(Type::Boolean, flag)],
                vec![method(
                    Type::Boolean,
                    get,
                    vec![],
                    vec![],
                    vec![assign(x, int(5))],
                    ident(flag),
                )],
            ),
        ],
    );

    assert_eq!(
        function(&compile(&program), "i1 @B.get"),
        "define i1 @B.get(i8* %this) {\n\
         entry:\n\
         \t%_0 = getelementptr i8, i8* %this, i32 8\n\
         \t%_1 = bitcast i8* %_0 to i32*\n\
         \tstore i32 5, i32* %_1\n\
         \t%_2 = getelementptr i8, i8* %this, i32 12\n\
         \t%_3 = bitcast i8* %_2 to i1*\n\
         \t%_4 = load i1, i1* %_3\n\
         \tret i1 %_4\n\
         }\n"
    );
}

#[test]
fn int_array_allocation_and_store() {
    let mut n = Names::new();
    let arr = n.get("arr");
    let program = n.main(
        vec![var(Type::IntArray, arr)],
        vec![
            assign(arr, new_int_array(int(3))),
            array_assign(arr, int(1), int(4)),
        ],
        vec![],
    );

    assert_eq!(
        function(&compile(&program), "i32 @main"),
        "define i32 @main() {\n\
         entry:\n\
         \t%Main_main_arr = alloca i32*\n\
         \t%_0 = mul i32 3, 4\n\
         \t%_1 = add i32 %_0, 4\n\
         \t%_2 = icmp sge i32 %_1, 4\n\
         \tbr i1 %_2, label %nsz_ok_0, label %nsz_err_0\n\
         nsz_err_0:\n\
         \tcall void @throw_nsz()\n\
         \tunreachable\n\
         nsz_ok_0:\n\
         \t%_3 = call i8* @calloc(i32 1, i32 %_1)\n\
         \t%_4 = bitcast i8* %_3 to i32*\n\
         \tstore i32 3, i32* %_4\n\
         \tstore i32* %_4, i32** %Main_main_arr\n\
         \t%_5 = load i32*, i32** %Main_main_arr\n\
         \t%_6 = load i32, i32* %_5\n\
         \t%_7 = icmp sge i32 1, 0\n\
         \t%_8 = icmp slt i32 1, %_6\n\
         \t%_9 = and i1 %_7, %_8\n\
         \tbr i1 %_9, label %oob_ok_0, label %oob_err_0\n\
         oob_err_0:\n\
         \tcall void @throw_oob()\n\
         \tunreachable\n\
         oob_ok_0:\n\
         \t%_10 = add i32 1, 1\n\
         \t%_11 = getelementptr i32, i32* %_5, i32 %_10\n\
         \tstore i32 4, i32* %_11\n\
         \tret i32 0\n\
         }\n"
    );
}

#[test]
fn boolean_arrays_store_bytes() {
    let mut n = Names::new();
    let flags = n.get("flags");
    let program = n.main(
        vec![var(Type::BooleanArray, flags)],
        vec![
            assign(flags, new_boolean_array(int(2))),
            array_assign(flags, int(0), tru()),
            if_else(
                lookup(ident(flags), int(0)),
                print(length(ident(flags))),
                block(vec![]),
            ),
        ],
        vec![],
    );
    let main = function(&compile(&program), "i32 @main").to_owned();

    // no multiplication for one byte elements
    assert!(main.contains("\t%_0 = add i32 2, 4\n\t%_1 = icmp sge i32 %_0, 4\n"));
    assert!(main.contains("\tstore i32 2, i32* %_3\n\tstore i8* %_2, i8** %Main_main_flags\n"));
    assert!(main.contains("zext i1 true to i8\n"));
    assert!(main.contains("getelementptr i8, i8* "));
    assert!(main.contains("= trunc i8 "));
    assert_eq!(main.matches("bitcast i8* ").count(), 4);
}

/// Every bounds check branches to a block that calls the trap when the
/// index is negative or not below the length.
#[test]
fn every_array_access_is_guarded_by_the_trap() {
    let mut n = Names::new();
    let (ints, flags, i) = (n.get("ints"), n.get("flags"), n.get("i"));
    let program = n.main(
        vec![
            var(Type::IntArray, ints),
            var(Type::BooleanArray, flags),
            var(Type::Int, i),
        ],
        vec![
            assign(i, sub(int(0), int(1))),
            assign(ints, new_int_array(int(2))),
            assign(flags, new_boolean_array(int(2))),
            array_assign(ints, ident(i), int(1)),
            array_assign(flags, int(2), fals()),
            print(lookup(ident(ints), add(ident(i), int(3)))),
            if_else(lookup(ident(flags), ident(i)), block(vec![]), block(vec![])),
        ],
        vec![],
    );
    let ir = compile(&program);
    let lines: Vec<&str> = ir.lines().collect();

    let mut checks = 0;
    for (position, line) in lines.iter().enumerate() {
        if !line.contains("= and i1 ") {
            continue;
        }
        checks += 1;
        let in_bounds = line.trim().split(' ').next().unwrap();
        let branch = lines[position + 1].trim();
        assert!(
            branch.starts_with(&format!("br i1 {}, label %oob_ok_", in_bounds)),
            "unexpected branch {}",
            branch
        );
        let failure_target = branch.rsplit("label %").next().unwrap();
        let failure_block = lines
            .iter()
            .position(|l| *l == format!("{}:", failure_target))
            .expect("failure block exists");
        assert_eq!(lines[failure_block + 1], "\tcall void @throw_oob()");

        // the condition combines both signed comparisons
        let lower = lines[position - 2].trim();
        let upper = lines[position - 1].trim();
        assert!(lower.contains("= icmp sge i32 "), "{}", lower);
        assert!(lower.ends_with(", 0"));
        assert!(upper.contains("= icmp slt i32 "), "{}", upper);
    }
    assert_eq!(checks, 4);
}

#[test]
fn and_short_circuits_through_a_phi() {
    let mut n = Names::new();
    let b = n.get("b");
    let program = n.main(
        vec![var(Type::Boolean, b)],
        vec![assign(b, and(less(int(1), int(2)), not(fals())))],
        vec![],
    );

    assert_eq!(
        function(&compile(&program), "i32 @main"),
        "define i32 @main() {\n\
         entry:\n\
         \t%Main_main_b = alloca i1\n\
         \t%_0 = icmp slt i32 1, 2\n\
         \tbr i1 %_0, label %and_rhs_0, label %and_end_0\n\
         and_rhs_0:\n\
         \t%_1 = xor i1 1, false\n\
         \tbr label %and_end_0\n\
         and_end_0:\n\
         \t%_2 = phi i1 [ false, %entry ], [ %_1, %and_rhs_0 ]\n\
         \tstore i1 %_2, i1* %Main_main_b\n\
         \tret i32 0\n\
         }\n"
    );
}

#[test]
fn control_flow_labels_are_unique_in_the_module() {
    let mut n = Names::new();
    let (a, m, k, w, obj) = (n.get("A"), n.get("m"), n.get("k"), n.get("w"), n.get("obj"));
    let empty_if = || if_else(tru(), block(vec![]), block(vec![]));
    let program = n.main(
        vec![var(Type::Class(a), obj)],
        vec![empty_if(), assign(obj, new_object(a))],
        vec![class(
            a,
            None,
            vec![],
            vec![
                method(Type::Int, m, vec![], vec![], vec![empty_if()], int(0)),
                method(
                    Type::Int,
                    w,
                    vec![],
                    vec![],
                    vec![while_loop(fals(), block(vec![]))],
                    int(0),
                ),
                method(Type::Int, k, vec![], vec![], vec![empty_if()], int(0)),
            ],
        )],
    );
    let ir = compile(&program);

    assert!(function(&ir, "i32 @main").contains("br i1 true, label %if_then_0, label %if_else_0"));
    assert!(function(&ir, "i32 @A.m").contains("br i1 true, label %if_then_1, label %if_else_1"));
    assert!(function(&ir, "i32 @A.k").contains("br i1 true, label %if_then_2, label %if_else_2"));
    assert_eq!(
        function(&ir, "i32 @A.w"),
        "define i32 @A.w(i8* %this) {\n\
         entry:\n\
         \tbr label %loop_cond_0\n\
         loop_cond_0:\n\
         \tbr i1 false, label %loop_body_0, label %loop_end_0\n\
         loop_body_0:\n\
         \tbr label %loop_cond_0\n\
         loop_end_0:\n\
         \tret i32 0\n\
         }\n"
    );
    assert!(function(&ir, "i32 @A.m").contains(
        "if_then_1:\n\tbr label %if_end_1\nif_else_1:\n\tbr label %if_end_1\nif_end_1:\n"
    ));
}

#[test]
fn this_is_passed_as_receiver() {
    let mut n = Names::new();
    let (a, m, k, v) = (n.get("A"), n.get("m"), n.get("k"), n.get("v"));
    let program = n.main(
        vec![],
        vec![],
        vec![class(
            a,
            None,
            vec![],
            vec![
                method(Type::Int, m, vec![var(Type::Boolean, v)], vec![], vec![], int(1)),
                method(
                    Type::Int,
                    k,
                    vec![],
                    vec![],
                    vec![],
                    call(this(), m, vec![tru()]),
                ),
            ],
        )],
    );
    let k_function = function(&compile(&program), "i32 @A.k").to_owned();

    assert!(k_function.contains("\t%_0 = bitcast i8* %this to i8***\n"));
    assert!(k_function.contains("\t%_4 = bitcast i8* %_3 to i32 (i8*, i1)*\n"));
    assert!(k_function.contains("\t%_5 = call i32 %_4(i8* %this, i1 true)\n"));
}

#[test]
fn inherited_methods_dispatch_to_the_declaring_class() {
    let mut n = Names::new();
    let (a, b, c, m, q) = (n.get("A"), n.get("B"), n.get("C"), n.get("m"), n.get("q"));
    let int_method = |name| method(Type::Int, name, vec![], vec![], vec![], int(0));
    let program = n.main(
        vec![],
        vec![],
        vec![
            class(a, None, vec![], vec![int_method(m)]),
            class(b, Some(a), vec![], vec![int_method(q)]),
            class(c, Some(a), vec![], vec![int_method(q)]),
        ],
    );

    let ir = compile_with(&program, FieldLayout::SharedRootCounter);
    assert!(ir.contains(
        "@.C_vtable = global [3 x i8*] [\n\
         \ti8* bitcast (i32 (i8*)* @A.m to i8*),\n\
         \ti8* null,\n\
         \ti8* bitcast (i32 (i8*)* @C.q to i8*)\n\
         ]\n"
    ));

    let ir = compile_with(&program, FieldLayout::ParentPrefix);
    assert!(ir.contains(
        "@.C_vtable = global [2 x i8*] [\n\
         \ti8* bitcast (i32 (i8*)* @A.m to i8*),\n\
         \ti8* bitcast (i32 (i8*)* @C.q to i8*)\n\
         ]\n"
    ));
}
