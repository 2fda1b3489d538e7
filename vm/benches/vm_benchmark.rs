//! Run with:
//!   cargo bench --bench vm_benchmark

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use bytecode::{Assembly, AssemblyBuilder, Op};
use vm::{LoggedOutput, VM};

fn create_vm(program: Assembly) -> VM {
    VM::builder(program)
        .with_output(LoggedOutput::new())
        .build()
}

/// Recursive fibonacci, one `Call`/`Return` pair per node.
fn fib_program(n: i64) -> Assembly {
    let mut b = AssemblyBuilder::new();
    let fib = b.declare_procedure(1);
    b.i64_push(n).call(fib).op(Op::Pop).exit(0);

    b.bind_procedure(fib);
    b.arg(0).i64_push(1).op(Op::I64CmpLe);
    let recurse = b.jump(Op::JumpFalse);
    b.arg(0).op(Op::Return);
    b.bind(recurse);
    b.arg(0).i64_push(1).op(Op::I64Sub).call(fib);
    b.arg(0).i64_push(2).op(Op::I64Sub).call(fib);
    b.op(Op::I64Add).op(Op::Return);

    b.build().expect("fib program")
}

/// A counted loop doing integer and float arithmetic on the stack.
fn arithmetic_program(iterations: i64) -> Assembly {
    let mut b = AssemblyBuilder::new();
    b.i64_push(iterations);
    let head = b.current_address();
    b.op(Op::Dup)
        .i64_push(3)
        .op(Op::I64Mul)
        .op(Op::I64ToF64)
        .f64_push(0.5)
        .op(Op::F64Mul)
        .op(Op::Pop)
        .i64_push(1)
        .op(Op::I64Sub)
        .op(Op::Dup)
        .i64_push(0)
        .op(Op::I64CmpGt)
        .jump_to(Op::JumpTrue, head)
        .exit(0);
    b.build().expect("arithmetic program")
}

fn bench_fibonacci(c: &mut Criterion) {
    let mut vm = create_vm(fib_program(20));

    c.bench_function("fibonacci_20", |b| {
        b.iter(|| {
            vm.reset();
            black_box(vm.run().expect("Benchmark failed"));
        });
    });
}

fn bench_arithmetic_loop(c: &mut Criterion) {
    let mut vm = create_vm(arithmetic_program(10_000));

    c.bench_function("arithmetic_loop_10000", |b| {
        b.iter(|| {
            vm.reset();
            black_box(vm.run().expect("Benchmark failed"));
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_fibonacci, bench_arithmetic_loop
}

criterion_main!(benches);
