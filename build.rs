// build.rs
use std::path::Path;

fn main() {
    let proto_file = "proto/course_intake.proto";

    println!("cargo:rerun-if-changed={}", proto_file);
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_WITH_PROTO");

    // Only the gRPC surface needs generated code
    if std::env::var_os("CARGO_FEATURE_WITH_PROTO").is_none() {
        return;
    }

    if !Path::new(proto_file).exists() {
        panic!("Proto file not found: {}", proto_file);
    }

    if let Err(e) = tonic_build::configure()
        .build_client(false)
        .compile(&[proto_file], &["proto/"])
    {
        panic!("Failed to compile {}: {}. Is protoc installed?", proto_file, e);
    }
}
