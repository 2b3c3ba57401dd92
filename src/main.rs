fn main() {
    if let Err(err) = flow_autolayout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
