use brainfuck::cli_util::print_runtime_error;
use brainfuck::config::{self, Overrides, Settings, MAX_STEPS_ENV};
use brainfuck::{
    BoundsPolicy, BrainfuckError, ConfigError, EofPolicy, Interpreter, Program, StepControl, Tape,
    DEFAULT_TAPE_SIZE,
};
use clap::Parser;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage: {0} [-x memsize] [-d] [--max-steps N] [--eof POLICY] [--bounds POLICY] sourcefile
  -x memsize         Size of the memory tape in cells, default {1}
  -d, --debug        Print a step-by-step table of operations instead of executing
  --max-steps N      Abort after N instructions (fallback {2}; default unlimited)
  --eof POLICY       What ',' stores at end of input: zero (default) or unchanged
  --bounds POLICY    Pointer moved off the tape: error (default) or wrap
  -h                 Show this help
  sourcefile         Path to .bf file

Defaults for -x, --max-steps, --eof and --bounds may also be set in the
[interpreter] section of {3} (or the file named by {4}).
"#,
        program,
        DEFAULT_TAPE_SIZE,
        MAX_STEPS_ENV,
        config::CONFIG_FILE_NAME,
        config::CONFIG_PATH_ENV,
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "brainfuck", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Size of the memory tape in cells
    #[arg(short = 'x', value_name = "memsize", value_parser = config::parse_memsize)]
    memsize: Option<usize>,

    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N", value_parser = config::parse_step_limit)]
    max_steps: Option<u64>,

    /// What ',' stores at end of input
    #[arg(long = "eof", value_name = "POLICY")]
    eof: Option<EofPolicy>,

    /// What happens when the pointer leaves the tape
    #[arg(long = "bounds", value_name = "POLICY")]
    bounds: Option<BoundsPolicy>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    /// Path to the Brainfuck source file
    #[arg(value_name = "sourcefile")]
    sourcefile: Option<PathBuf>,
}

fn run(program: &str) -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            eprintln!("Use -h for help");
            let _ = io::stderr().flush();
            return EXIT_USAGE;
        }
    };

    if cli.help {
        usage_and_exit(program, EXIT_USAGE);
    }

    let Some(path) = cli.sourcefile else {
        eprintln!("{program}: {}", ConfigError::MissingSource);
        let _ = io::stderr().flush();
        return EXIT_USAGE;
    };

    let file_overrides = match config::load_file_overrides() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return EXIT_USAGE;
        }
    };

    let flags = Overrides {
        memsize: cli.memsize,
        eof: cli.eof,
        bounds: cli.bounds,
        max_steps: cli.max_steps,
    };
    let env_max_steps = env::var(MAX_STEPS_ENV).ok();
    let settings = Settings::resolve(flags, env_max_steps.as_deref(), file_overrides);
    log::debug!("settings: {settings:?}");

    let code = match Program::load(&path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return EXIT_FAILURE;
        }
    };

    let tape = match Tape::new(settings.memsize, settings.bounds) {
        Ok(tape) => tape,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return EXIT_USAGE;
        }
    };

    // First ctrl+c asks the interpreter to stop at the next step; a second one
    // exits immediately, e.g. while blocked on ','.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if cancel_handler.swap(true, Ordering::Relaxed) {
            std::process::exit(EXIT_INTERRUPTED);
        }
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return EXIT_FAILURE;
    }

    let mut bf = Interpreter::new(code, tape, io::stdin().lock(), io::stdout().lock())
        .with_eof_policy(settings.eof)
        .with_step_control(StepControl::new(settings.max_steps, cancel))
        .with_debug(cli.debug);

    match bf.run() {
        Ok(_) => 0,
        Err(BrainfuckError::Canceled) => {
            eprintln!("{program}: interrupted");
            let _ = io::stderr().flush();
            EXIT_INTERRUPTED
        }
        Err(err) => {
            print_runtime_error(Some(program), bf.program().as_bytes(), &err);
            EXIT_FAILURE
        }
    }
}

fn main() {
    env_logger::init();

    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("brainfuck"));

    let code = run(&program);
    std::process::exit(code);
}
