fn main() {
    std::process::exit(cafebabe::cli::run());
}
