use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{VM, VmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkInfo {
    pub iterations: u32,
    pub elapsed: Duration,
}

impl BenchmarkInfo {
    pub fn total_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e3
    }

    pub fn per_iteration_ms(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.total_ms() / self.iterations as f64
    }

    pub fn per_iteration_us(&self) -> f64 {
        self.per_iteration_ms() * 1e3
    }
}

impl fmt::Display for BenchmarkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Benchmark complete ({} iterations completed in {:.3} ms).",
            self.iterations,
            self.total_ms()
        )?;
        writeln!(f, "  {:.6} ms per iteration", self.per_iteration_ms())?;
        write!(f, "  {:.3} us per iteration", self.per_iteration_us())
    }
}

impl VM {
    /// Run the loaded program `iterations` times, resetting before each run.
    ///
    /// A fault aborts the whole benchmark. The program's exit code is
    /// not inspected.
    pub fn run_benchmark(&mut self, iterations: u32) -> Result<BenchmarkInfo, VmError> {
        log::debug!("vm: benchmark, {iterations} iterations");
        let start = Instant::now();
        for _ in 0..iterations {
            self.reset();
            self.run()?;
        }
        let elapsed = start.elapsed();
        self.reset();
        Ok(BenchmarkInfo {
            iterations,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytecode::{AssemblyBuilder, Op};

    use super::*;
    use crate::LoggedOutput;

    fn arithmetic_loop() -> AssemblyBuilder {
        let mut b = AssemblyBuilder::new();
        b.i64_push(200);
        let head = b.current_address();
        b.i64_push(3)
            .i64_push(4)
            .op(Op::I64Mul)
            .op(Op::Pop)
            .i64_push(1)
            .op(Op::I64Sub)
            .op(Op::Dup)
            .i64_push(0)
            .op(Op::I64CmpGt)
            .jump_to(Op::JumpTrue, head)
            .record_alloc(1)
            .exit(0);
        b
    }

    #[test]
    fn state_is_identical_between_iterations() {
        let mut vm = VM::builder(arithmetic_loop().build().unwrap())
            .with_output(LoggedOutput::new())
            .build();
        let initial = vm.snapshot();

        let info = vm.run_benchmark(25).unwrap();
        assert_eq!(info.iterations, 25);
        assert_eq!(vm.snapshot(), initial);

        let again = vm.run_benchmark(25).unwrap();
        assert_eq!(again.iterations, 25);
        assert_eq!(vm.snapshot(), initial);
    }

    #[test]
    fn fault_aborts_benchmark() {
        let mut b = AssemblyBuilder::new();
        b.op(Op::Pop);
        let mut vm = VM::builder(b.build().unwrap())
            .with_output(LoggedOutput::new())
            .build();
        assert_eq!(vm.run_benchmark(3), Err(VmError::StackUnderflow));
    }

    #[test]
    fn report_format() {
        let info = BenchmarkInfo {
            iterations: 4,
            elapsed: Duration::from_millis(10),
        };
        assert!((info.per_iteration_ms() - 2.5).abs() < 1e-9);
        assert_eq!(
            info.to_string().lines().next(),
            Some("Benchmark complete (4 iterations completed in 10.000 ms).")
        );
    }
}
