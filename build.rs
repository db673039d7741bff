use std::env;
use std::path::PathBuf;

const PROTOS: &[&str] = &[
    "proto/p4/v1/p4runtime.proto",
    "proto/p4/v1/p4data.proto",
    "proto/p4/config/v1/p4info.proto",
    "proto/p4/config/v1/p4types.proto",
    "proto/google/rpc/status.proto",
    "proto/google/rpc/code.proto",
];

fn main() {
    // use the vendored protoc and its well known types
    env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
    let well_known = protoc_bin_vendored::include_path().unwrap();
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());

    let mut config = prost_build::Config::new();
    config.bytes(["."]);
    config.file_descriptor_set_path(out_dir.join("p4runtime_descriptor.bin"));
    config.service_generator(
        tonic_build::configure()
            .build_server(false)
            .service_generator(),
    );
    config
        .compile_protos(PROTOS, &[PathBuf::from("proto"), well_known])
        .unwrap();

    for proto in PROTOS {
        println!("cargo:rerun-if-changed={}", proto);
    }
}
