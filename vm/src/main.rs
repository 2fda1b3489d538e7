use clap::{Args, Parser as ClapParser, Subcommand};
use std::{
    path::{Path, PathBuf},
    process,
};

use bytecode::Assembly;
use heap::HeapSettings;
use vm::{ConsoleOutput, LoggedOutput, StackSettings, VM, VMBuilder, VMSettings, natives};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Assembly file to run when no subcommand is given
    path: Option<PathBuf>,

    #[command(flatten)]
    limits: Limits,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program
    Run { path: PathBuf },

    /// Run a program and print a VM dump if it faults
    Debug { path: PathBuf },

    /// Run a program repeatedly and report timing
    Bench {
        path: PathBuf,

        #[arg(short, long, help = "Number of iterations to run")]
        iterations: u32,
    },

    /// Print the instruction listing, procedure table and strings
    Disasm { path: PathBuf },
}

#[derive(Args, Debug)]
struct Limits {
    #[arg(long, global = true, default_value_t = 8192, help = "Initial operand stack slots")]
    stack_size: usize,

    #[arg(long, global = true, help = "Operand stack ceiling in slots")]
    max_stack_size: Option<usize>,

    #[arg(long, global = true, default_value_t = 131_072, help = "Initial heap words")]
    heap_size: usize,

    #[arg(long, global = true, help = "Heap ceiling in words")]
    max_heap_size: Option<usize>,

    #[arg(long, global = true, default_value_t = 1_000_000, help = "Maximum call depth")]
    max_call_depth: usize,

    #[arg(long, global = true, help = "Abort after this many instructions")]
    max_steps: Option<u64>,
}

impl Limits {
    fn settings(&self) -> VMSettings {
        VMSettings {
            stack: StackSettings {
                initial_size: self.stack_size,
                max_size: self.max_stack_size,
            },
            heap: HeapSettings {
                initial_words: self.heap_size,
                max_words: self.max_heap_size,
            },
            max_call_depth: self.max_call_depth,
            max_steps: self.max_steps,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let command = match (cli.command, cli.path) {
        (Some(command), _) => command,
        (None, Some(path)) => Command::Run { path },
        (None, None) => {
            eprintln!("No assembly file given. See --help.");
            process::exit(1);
        }
    };

    let settings = cli.limits.settings();
    match command {
        Command::Run { path } => run(&path, settings, false),
        Command::Debug { path } => run(&path, settings, true),
        Command::Bench { path, iterations } => bench(&path, settings, iterations),
        Command::Disasm { path } => disasm(&path),
    }
}

fn load(path: &Path) -> Assembly {
    match Assembly::from_file(path) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Error loading '{}': {}", path.display(), err);
            process::exit(1);
        }
    }
}

fn builder(path: &Path, settings: VMSettings) -> VMBuilder {
    natives::register_std(VM::builder(load(path)).with_settings(settings))
}

fn run(path: &Path, settings: VMSettings, debug: bool) {
    let mut vm = builder(path, settings).with_output(ConsoleOutput).build();
    match vm.run() {
        Ok(status) => process::exit(status.code()),
        Err(err) => {
            eprintln!("Runtime execution error: {err}");
            if debug {
                eprintln!("Debugging info:");
                eprint!("{}", vm.debug_dump());
            }
            process::exit(1);
        }
    }
}

fn bench(path: &Path, settings: VMSettings, iterations: u32) {
    let mut vm = builder(path, settings)
        .with_output(LoggedOutput::new())
        .build();
    match vm.run_benchmark(iterations) {
        Ok(info) => println!("{info}"),
        Err(err) => {
            eprintln!("Runtime execution error: {err}");
            process::exit(1);
        }
    }
}

fn disasm(path: &Path) {
    let program = load(path);
    println!("== instructions ==");
    print!("{}", program.dump_program());
    println!("== procedures ==");
    print!("{}", program.dump_proc_table());
    println!("== strings ==");
    print!("{}", program.dump_strings());
}
