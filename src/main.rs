fn main() {
    deptctl::cli::run();
}
