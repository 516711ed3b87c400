fn main() {
    foliar::run();
}
