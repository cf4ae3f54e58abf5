//! A stand-in for an interactive external tool.
//!
//! Every argument is one step, executed in order:
//!
//! - `out:TEXT`, `err:TEXT`: write `TEXT` and a newline to stdout or stderr
//! - `raw:TEXT`: write `TEXT` to stdout with no newline, as a prompt waiting on the same line would
//! - `await:TEXT`: read stdin lines until one equals `TEXT`; exits 4 if stdin closes first
//! - `hold:TEXT`: like `await`, but a closed stdin blocks forever, as a tool reading from a
//!   terminal nobody types into would
//! - `sleep-ms:N`: pause
//! - `deadline-ms:N`: from now on, exit 5 if still running after `N` milliseconds
//! - `exit:N`: exit with code `N`
//!
//! Running out of steps exits 0.

use std::io::{self, BufRead, Write};
use std::process;
use std::time::Duration;

const CODE_STDIN_CLOSED: i32 = 4;
const CODE_DEADLINE: i32 = 5;

#[derive(Debug)]
enum Step {
    Stdout(String),
    Stderr(String),
    Raw(String),
    Await(String),
    Hold(String),
    Sleep(Duration),
    Deadline(Duration),
    Exit(i32),
}

fn parse_step(arg: &str) -> Step {
    let (op, value) = arg
        .split_once(':')
        .unwrap_or_else(|| panic!("step {arg:?} is not of the form OP:VALUE"));
    let millis = || Duration::from_millis(value.parse().unwrap());
    match op {
        "out" => Step::Stdout(value.to_owned()),
        "err" => Step::Stderr(value.to_owned()),
        "raw" => Step::Raw(value.to_owned()),
        "await" => Step::Await(value.to_owned()),
        "hold" => Step::Hold(value.to_owned()),
        "sleep-ms" => Step::Sleep(millis()),
        "deadline-ms" => Step::Deadline(millis()),
        "exit" => Step::Exit(value.parse().unwrap()),
        _ => panic!("unknown step {op:?}"),
    }
}

/// Returns whether `expected` was read before stdin closed.
fn await_line(expected: &str) -> bool {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.unwrap();
        if line.trim() == expected {
            return true;
        }
    }
    false
}

fn main() {
    let steps: Vec<Step> = std::env::args().skip(1).map(|a| parse_step(&a)).collect();

    for step in steps {
        match step {
            Step::Stdout(text) => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{text}").unwrap();
                stdout.flush().unwrap();
            }
            Step::Stderr(text) => {
                let mut stderr = io::stderr().lock();
                writeln!(stderr, "{text}").unwrap();
                stderr.flush().unwrap();
            }
            Step::Raw(text) => {
                let mut stdout = io::stdout().lock();
                write!(stdout, "{text}").unwrap();
                stdout.flush().unwrap();
            }
            Step::Await(text) => {
                if !await_line(&text) {
                    eprintln!("stdin closed while waiting for {text:?}");
                    process::exit(CODE_STDIN_CLOSED);
                }
            }
            Step::Hold(text) => {
                if !await_line(&text) {
                    loop {
                        std::thread::park();
                    }
                }
            }
            Step::Sleep(duration) => std::thread::sleep(duration),
            Step::Deadline(duration) => {
                std::thread::spawn(move || {
                    std::thread::sleep(duration);
                    process::exit(CODE_DEADLINE);
                });
            }
            Step::Exit(code) => process::exit(code),
        }
    }
}
