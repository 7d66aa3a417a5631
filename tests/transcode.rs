use std::path::{Path, PathBuf};

use draco_transcoder::core::scene::utils::set_compression_options;
use draco_transcoder::io::gltf::transcoder::Err;
use draco_transcoder::prelude::*;

fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("draco_transcoder_it_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn decode_file(path: &Path) -> Scene {
    GltfDecoder::new().decode_file_to_scene(path).unwrap()
}

fn decode_bytes(bytes: &[u8]) -> Scene {
    GltfDecoder::new().decode_buffer_to_scene(bytes).unwrap()
}

fn expected_scene(path: &Path, options: &CompressionOptions) -> Scene {
    let mut scene = decode_file(path);
    set_compression_options(Some(options), &mut scene);
    scene
}

#[test]
fn fixtures_decode_to_the_same_scene() {
    let embedded = decode_file(&data_path("quad.gltf"));
    let binary = decode_file(&data_path("quad.glb"));
    let external = decode_file(&data_path("external/quad.gltf"));
    assert_eq!(embedded, binary);
    assert_eq!(embedded, external);

    assert_eq!(embedded.num_meshes(), 1);
    assert_eq!(embedded.get_mesh(0).unwrap().num_faces(), 2);
    assert_eq!(embedded.root_node_indices(), &[0]);
    assert_eq!(embedded.nodes()[0].children(), &[1]);
    assert_eq!(embedded.images()[0].get_mime_type(), "image/png");
    assert_eq!(embedded.textures()[0].get_sampler().wrap_s, 33071);
    assert_eq!(embedded.materials()[0].metallic_factor, 0.0);
}

#[test]
fn memory_round_trip_reproduces_the_scene() {
    init_logging();
    let options = CompressionOptions::default().with_compression_level(9);
    let input = std::fs::read(data_path("quad.glb")).unwrap();

    let mut transcoder = DracoTranscoder::create(options.clone()).unwrap();
    let mut source = MemoryEndpoint::from(input.clone());
    let mut sink = MemoryEndpoint::new();
    transcoder.transcode_endpoints(&mut source, &mut sink).unwrap();

    assert_eq!(source.position(), input.len() as u64);
    assert_eq!(transcoder.state(), TranscoderState::Written);
    let decoded = decode_bytes(sink.as_bytes());
    assert_eq!(decoded, expected_scene(&data_path("quad.glb"), &options));
    assert!(decoded.meshes().iter().all(|mesh| mesh.is_compression_enabled()));

    // A second transcode of the output is stable.
    let again = DracoTranscoder::create(options).unwrap().transcode_buffer(sink.as_bytes()).unwrap();
    assert_eq!(again, sink.into_inner());
}

#[test]
fn file_and_stream_outputs_are_identical() {
    let dir = temp_dir("identical");
    for input in ["quad.gltf", "quad.glb"] {
        let output = dir.join(format!("{}.out.glb", input));
        transcode_file(CompressionOptions::default(), &FileOptions::new(data_path(input), &output)).unwrap();
        let file_bytes = std::fs::read(&output).unwrap();

        let mut from_file = MemoryEndpoint::new();
        DracoTranscoder::create(CompressionOptions::default())
            .unwrap()
            .transcode_endpoints(&mut FileEndpoint::open(data_path(input)).unwrap(), &mut from_file)
            .unwrap();

        let bytes = std::fs::read(data_path(input)).unwrap();
        let mut from_memory = MemoryEndpoint::new();
        DracoTranscoder::create(CompressionOptions::default())
            .unwrap()
            .transcode_endpoints(&mut MemoryEndpoint::from(bytes), &mut from_memory)
            .unwrap();

        let file_to_file = dir.join(format!("{}.endpoints.glb", input));
        DracoTranscoder::create(CompressionOptions::default())
            .unwrap()
            .transcode_endpoints(
                &mut FileEndpoint::open(data_path(input)).unwrap(),
                &mut FileEndpoint::create(&file_to_file).unwrap(),
            )
            .unwrap();

        let stream_file = dir.join(format!("{}.stream.glb", input));
        DracoTranscoder::create(CompressionOptions::default())
            .unwrap()
            .transcode_endpoints(
                &mut MemoryEndpoint::from(std::fs::read(data_path(input)).unwrap()),
                &mut FileEndpoint::create(&stream_file).unwrap(),
            )
            .unwrap();

        assert_eq!(file_bytes, from_file.as_bytes(), "{}", input);
        assert_eq!(file_bytes, from_memory.as_bytes(), "{}", input);
        assert_eq!(file_bytes, std::fs::read(&stream_file).unwrap(), "{}", input);
        assert_eq!(file_bytes, std::fs::read(&file_to_file).unwrap(), "{}", input);
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn output_layouts_write_the_expected_files() {
    init_logging();
    let dir = temp_dir("layouts");
    let options = CompressionOptions::default();
    let expected = expected_scene(&data_path("quad.gltf"), &options);

    // Single self-contained .gltf.
    let single = dir.join("single.gltf");
    transcode_file(options.clone(), &FileOptions::new(data_path("quad.gltf"), &single)).unwrap();
    let json = std::fs::read_to_string(&single).unwrap();
    assert!(json.contains("data:application/octet-stream;base64,"));
    assert!(json.contains("data:image/png;base64,"));
    assert_eq!(decode_file(&single), expected);

    // .gltf with an external bin, images next to the output.
    let with_bin = dir.join("bin/scene.gltf");
    std::fs::create_dir_all(dir.join("bin")).unwrap();
    transcode_file(
        options.clone(),
        &FileOptions::new(data_path("quad.gltf"), &with_bin).with_bin_filename(dir.join("bin/scene.bin")),
    )
    .unwrap();
    assert!(dir.join("bin/scene.bin").exists());
    assert!(dir.join("bin/checker.png").exists());
    assert_eq!(decode_file(&with_bin), expected);

    // .gltf with an external bin and a resource directory.
    let with_resources = dir.join("res/scene.gltf");
    std::fs::create_dir_all(dir.join("res")).unwrap();
    transcode_file(
        options.clone(),
        &FileOptions::new(data_path("quad.gltf"), &with_resources)
            .with_bin_filename(dir.join("res/scene.bin"))
            .with_resource_directory(dir.join("res/textures")),
    )
    .unwrap();
    assert!(dir.join("res/textures/checker.png").exists());
    assert!(!dir.join("res/checker.png").exists());
    assert_eq!(decode_file(&with_resources), expected);

    // A resource directory without a bin file is ignored.
    let ignored = dir.join("ignored.gltf");
    transcode_file(
        options,
        &FileOptions::new(data_path("quad.gltf"), &ignored).with_resource_directory(dir.join("unused")),
    )
    .unwrap();
    assert!(!dir.join("unused").exists());
    assert_eq!(decode_file(&ignored), expected);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn non_empty_destination_is_not_overwritten() {
    let dir = temp_dir("non_empty");
    let destination = dir.join("existing.glb");
    std::fs::write(&destination, b"keep me").unwrap();

    let mut transcoder = DracoTranscoder::create(CompressionOptions::default()).unwrap();
    let mut source = FileEndpoint::open(data_path("quad.glb")).unwrap();
    let mut sink = FileEndpoint::open_for_write(&destination).unwrap();
    let err = transcoder.transcode_endpoints(&mut source, &mut sink).unwrap_err();
    assert_eq!(err, Err::IoError("destination not empty".to_string()));
    drop(sink);
    assert_eq!(std::fs::read(&destination).unwrap(), b"keep me");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_arguments_and_options() {
    let err = transcode_file(CompressionOptions::default(), &FileOptions::new("", "out.glb")).unwrap_err();
    assert!(matches!(err, Err::InvalidArgument(_)));
    let err = transcode_file(CompressionOptions::default(), &FileOptions::new(data_path("quad.glb"), "")).unwrap_err();
    assert!(matches!(err, Err::InvalidArgument(_)));

    let invalid = CompressionOptions::default().with_position_grid_spacing(0.0);
    let created = DracoTranscoder::create(invalid.clone()).unwrap_err();
    let implicit = transcode_file(invalid, &FileOptions::new(data_path("quad.glb"), "out.glb")).unwrap_err();
    assert!(matches!(created, Err::ValidationError(_)));
    assert_eq!(created, implicit);
}

#[test]
fn decode_failures_are_reported() {
    let mut transcoder = DracoTranscoder::create(CompressionOptions::default()).unwrap();
    let err = transcoder.transcode_buffer(b"not a gltf asset").unwrap_err();
    assert!(matches!(err, Err::DecodeError(_)));

    // External references cannot be resolved from a stream.
    let bytes = std::fs::read(data_path("external/quad.gltf")).unwrap();
    let err = DracoTranscoder::create(CompressionOptions::default())
        .unwrap()
        .transcode_buffer(&bytes)
        .unwrap_err();
    assert!(matches!(err, Err::DecodeError(_)));

    let err = transcode_file(
        CompressionOptions::default(),
        &FileOptions::new(data_path("missing.glb"), "out.glb"),
    )
    .unwrap_err();
    assert!(matches!(err, Err::DecodeError(_)));
}
