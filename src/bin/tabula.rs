fn main() {
    tabula::cli::run();
}
