fn main() {
    // No-op on host targets; exports ESP-IDF link/env directives on device
    // builds (requires the esp-idf toolchain environment).
    embuild::espidf::sysenv::output();
}
