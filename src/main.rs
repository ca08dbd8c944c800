fn main() {
    dorso_lib::run()
}
