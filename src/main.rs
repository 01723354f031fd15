fn main() {
    if let Err(err) = vdi_topology::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
