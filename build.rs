fn main() {
    // Release builds stamp their version through the environment
    println!("cargo:rerun-if-env-changed=BULWARK_VERSION");
}
