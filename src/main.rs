use std::env;
use std::fs;
use std::process::{self, Command};

use katc::error::report_fatal;

fn main() {
    let mut args = env::args().skip(1);
    let Some(source_path) = args.next() else {
        eprintln!("usage: katc <source-file> [output]");
        process::exit(2);
    };
    let output = args.next();

    let source = match fs::read_to_string(&source_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("unable to open {}: {}", source_path, err);
            process::exit(1);
        }
    };

    let asm = match katc::compile(&source) {
        Ok(asm) => asm,
        Err(err) => {
            report_fatal(&source_path, &err);
            process::exit(1);
        }
    };

    match output {
        // without an output name the assembly goes to stdout
        None => print!("{}", asm),
        Some(output) => {
            let asm_path = format!("{}.s", output);
            if let Err(err) = fs::write(&asm_path, &asm) {
                eprintln!("unable to write {}: {}", asm_path, err);
                process::exit(1);
            }
            // hand the text to the system toolchain for a 32-bit executable
            match Command::new("gcc")
                .args(["-m32", &asm_path, "-o", &output])
                .status()
            {
                Ok(status) if status.success() => (),
                Ok(status) => {
                    eprintln!("gcc exited with {}", status);
                    process::exit(1);
                }
                Err(err) => {
                    eprintln!("unable to run gcc: {}", err);
                    process::exit(1);
                }
            }
        }
    }
}
