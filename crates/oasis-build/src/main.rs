fn main() {
    if let Err(err) = oasis_build::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(oasis_build::exit_code_for(&err));
    }
}
