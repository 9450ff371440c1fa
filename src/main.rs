#![warn(clippy::all)]

use std::io::{self, Write as _};
use std::process;

use structopt::StructOpt;

use pgrid::{Console, Opt};

fn main() {
    let opt = Opt::from_args();
    let mut cnsl = Console::term(opt.global_opt().console_config());
    let stdout = io::stdout();
    let result = opt.run(&mut cnsl, &mut stdout.lock());
    let _ = io::stdout().flush();
    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!();
            eprintln!("Error: {:?}", err);
            process::exit(1);
        }
    }
}
