//! End-to-end pipeline tests: BPL source in, assembly text out, without
//! invoking the external toolchain (we never assemble or run anything,
//! only assert on `Result` shape and emitted-assembly substrings).

use std::io::Write;

use bplc::CompileError;

fn write_source(src: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".bpl").tempfile().unwrap();
    write!(file, "{src}").unwrap();
    file
}

#[test]
fn arithmetic_and_write() {
    let file = write_source("int main(void) { write(2 + 3 * 4); writeln(); return 0; }");
    let asm = bplc::compile_to_assembly(file.path()).unwrap();
    assert!(asm.contains("imul"));
    assert!(asm.contains("call printf"));
}

#[test]
fn while_loop_counts_to_a_bound() {
    let file = write_source(
        "int main(void) {
            int i;
            i = 0;
            while (i < 10) {
                write(i);
                i = i + 1;
            }
            return 0;
        }",
    );
    let asm = bplc::compile_to_assembly(file.path()).unwrap();
    assert!(asm.contains("jge") || asm.contains("jl"));
    assert!(asm.contains("jmp .L"));
}

#[test]
fn recursive_factorial_calls_itself() {
    let file = write_source(
        "int fact(int n) {
            if (n < 2) {
                return 1;
            } else {
                return n * fact(n - 1);
            }
        }
        int main(void) {
            write(fact(5));
            writeln();
            return 0;
        }",
    );
    let asm = bplc::compile_to_assembly(file.path()).unwrap();
    assert!(asm.contains("call fact"));
    assert!(asm.contains("fact:"));
}

#[test]
fn global_array_sum() {
    let file = write_source(
        "int nums[5];
        int sum(void) {
            int i;
            int total;
            i = 0;
            total = 0;
            while (i < 5) {
                total = total + nums[i];
                i = i + 1;
            }
            return total;
        }
        int main(void) {
            write(sum());
            writeln();
            return 0;
        }",
    );
    let asm = bplc::compile_to_assembly(file.path()).unwrap();
    assert!(asm.contains(".comm nums, 40, 64"));
    assert!(asm.contains("call sum"));
}

#[test]
fn pointer_deref_assignment() {
    let file = write_source(
        "int main(void) {
            int x;
            int *p;
            x = 1;
            p = &x;
            *p = 42;
            write(x);
            writeln();
            return 0;
        }",
    );
    let asm = bplc::compile_to_assembly(file.path()).unwrap();
    assert!(asm.contains("mov %rax, (%r12)"));
}

#[test]
fn type_mismatch_is_rejected_with_a_type_error() {
    let file = write_source("int main(void) { int x; string s; x = s; return 0; }");
    let err = bplc::compile_to_assembly(file.path()).unwrap_err();
    assert!(matches!(err, CompileError::Type { .. }));
}

#[test]
fn undefined_variable_is_rejected_with_a_resolve_error() {
    let file = write_source("int main(void) { y = 1; return 0; }");
    let err = bplc::compile_to_assembly(file.path()).unwrap_err();
    assert!(matches!(err, CompileError::Resolve { .. }));
}
