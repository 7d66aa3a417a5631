use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::compression::CompressionOptions;
use crate::core::scene::{utils, Scene};
use crate::io::endpoint::{ByteSink, ByteSource, MemoryEndpoint};
use crate::io::gltf::decode::GltfDecoder;
use crate::io::gltf::encode::GltfEncoder;
use crate::io::scene_io::{SceneDecoder, SceneEncoder};

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Err {
    #[error("Decoding Error: {0}")]
    DecodeError(String),
    #[error("Encoding Error: {0}")]
    EncodeError(String),
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Precondition Failed: {0}")]
    PreconditionFailed(String),
    #[error("Validation Error: {0}")]
    ValidationError(#[from] crate::compression::Err),
}

impl From<std::io::Error> for Err {
    fn from(err: std::io::Error) -> Self {
        Err::IoError(err.to_string())
    }
}

/// Options applied to every scene a transcoder processes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TranscodingOptions {
    /// Geometry compression settings stamped onto every mesh.
    pub geometry: CompressionOptions,
}

impl TranscodingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self) -> Result<(), crate::compression::Err> {
        self.geometry.check()
    }
}

impl From<CompressionOptions> for TranscodingOptions {
    fn from(geometry: CompressionOptions) -> Self {
        Self { geometry }
    }
}

/// Input and output locations of a file transcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Must be non-empty.
    pub input_filename: PathBuf,
    /// Must be non-empty.
    pub output_filename: PathBuf,
    pub output_bin_filename: Option<PathBuf>,
    /// Only used together with `output_bin_filename`.
    pub output_resource_directory: Option<PathBuf>,
}

impl FileOptions {
    pub fn new(input_filename: impl Into<PathBuf>, output_filename: impl Into<PathBuf>) -> Self {
        Self {
            input_filename: input_filename.into(),
            output_filename: output_filename.into(),
            output_bin_filename: None,
            output_resource_directory: None,
        }
    }

    pub fn with_bin_filename(mut self, bin_filename: impl Into<PathBuf>) -> Self {
        self.output_bin_filename = Some(bin_filename.into());
        self
    }

    pub fn with_resource_directory(mut self, resource_directory: impl Into<PathBuf>) -> Self {
        self.output_resource_directory = Some(resource_directory.into());
        self
    }

    /// The output layout selected by the optional paths. Empty paths count as
    /// absent.
    pub fn output_layout(&self) -> OutputLayout<'_> {
        fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
            path.as_deref().filter(|path| !path.as_os_str().is_empty())
        }
        match (non_empty(&self.output_bin_filename), non_empty(&self.output_resource_directory)) {
            (Some(bin), Some(resource_dir)) => OutputLayout::BinAndResources { bin, resource_dir },
            (Some(bin), None) => OutputLayout::Bin { bin },
            (None, _) => OutputLayout::SingleFile,
        }
    }

    fn has_ignored_resource_directory(&self) -> bool {
        matches!(self.output_layout(), OutputLayout::SingleFile)
            && self
                .output_resource_directory
                .as_deref()
                .is_some_and(|dir| !dir.as_os_str().is_empty())
    }
}

/// How the primary output file and its resources are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout<'a> {
    /// One self-contained file.
    SingleFile,
    /// The primary file plus an external binary payload.
    Bin { bin: &'a Path },
    /// The primary file, an external binary payload and a directory holding
    /// the other resources.
    BinAndResources { bin: &'a Path, resource_dir: &'a Path },
}

/// Progress of a transcoder through its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscoderState {
    #[default]
    Ready,
    Loaded,
    Compressed,
    Written,
}

/// Reads a scene, stamps the geometry compression options onto every mesh and
/// writes the scene back out.
///
/// Sources and destinations are either files ([`FileOptions`]) or any pair of
/// [`ByteSource`] / [`ByteSink`] endpoints. Both paths share the decoder and
/// the encoder, so a file-backed and a memory-backed run over the same input
/// produce the same bytes.
///
/// A transcoder performs one run. Once any phase has started, further runs
/// fail with [`Err::PreconditionFailed`] and a new transcoder must be created.
#[derive(Debug)]
pub struct DracoTranscoder<D = GltfDecoder, E = GltfEncoder> {
    decoder: D,
    encoder: E,
    /// The scene being transcoded.
    scene: Option<Box<Scene>>,
    options: TranscodingOptions,
    state: TranscoderState,
}

impl DracoTranscoder {
    /// Creates a transcoder backed by the glTF decoder and encoder. Fails with
    /// [`Err::ValidationError`] when the options are invalid.
    pub fn create(options: impl Into<TranscodingOptions>) -> Result<Self, Err> {
        Self::with_collaborators(options, GltfDecoder::new(), GltfEncoder::new())
    }
}

impl<D, E> DracoTranscoder<D, E>
where
    D: SceneDecoder,
    E: SceneEncoder,
{
    /// Creates a transcoder with the given decode and encode collaborators.
    pub fn with_collaborators(options: impl Into<TranscodingOptions>, decoder: D, encoder: E) -> Result<Self, Err> {
        let options = options.into();
        options.check()?;
        Ok(Self {
            decoder,
            encoder,
            scene: None,
            options,
            state: TranscoderState::Ready,
        })
    }

    pub fn options(&self) -> &TranscodingOptions {
        &self.options
    }

    pub fn state(&self) -> TranscoderState {
        self.state
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_deref()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Transcodes the file named in `file_options` and writes the result in
    /// the layout the options select.
    #[tracing::instrument(
        skip_all,
        fields(input = %file_options.input_filename.display(), output = %file_options.output_filename.display())
    )]
    pub fn transcode(&mut self, file_options: &FileOptions) -> Result<(), Err> {
        self.check_ready()?;
        self.read_scene_from_file(file_options)?;
        self.compress_scene()?;
        self.write_scene_to_file(file_options)?;
        self.log_summary();
        Ok(())
    }

    /// Transcodes the content of `source` into `sink`, which must be empty.
    #[tracing::instrument(skip_all)]
    pub fn transcode_endpoints<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<(), Err>
    where
        S: ByteSource + ?Sized,
        K: ByteSink + ?Sized,
    {
        self.check_ready()?;
        self.read_scene_from_endpoint(source)?;
        self.compress_scene()?;
        self.write_scene_to_endpoint(sink)?;
        self.log_summary();
        Ok(())
    }

    /// Transcodes an in-memory asset and returns the encoded result.
    pub fn transcode_buffer(&mut self, input: &[u8]) -> Result<Vec<u8>, Err> {
        let mut source = MemoryEndpoint::from(input);
        let mut sink = MemoryEndpoint::new();
        self.transcode_endpoints(&mut source, &mut sink)?;
        Ok(sink.into_inner())
    }

    /// Loads the scene from the input file, replacing any loaded scene.
    /// Both the input and the output filename must be non-empty.
    fn read_scene_from_file(&mut self, file_options: &FileOptions) -> Result<(), Err> {
        self.check_loadable()?;
        if file_options.input_filename.as_os_str().is_empty() {
            return Err(Err::InvalidArgument("Input filename is empty.".to_string()));
        }
        if file_options.output_filename.as_os_str().is_empty() {
            return Err(Err::InvalidArgument("Output filename is empty.".to_string()));
        }

        let scene = self
            .decoder
            .decode_file_to_scene(&file_options.input_filename)
            .map_err(|e| Err::DecodeError(e.to_string()))?;
        self.set_scene(scene);
        Ok(())
    }

    /// Loads the scene from the whole content of `source`, replacing any
    /// loaded scene. The read position of `source` ends at the end of the
    /// content.
    fn read_scene_from_endpoint<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<(), Err> {
        self.check_loadable()?;
        let len = source.content_len()?;
        tracing::debug!(bytes = len, "reading scene from endpoint");
        let buffer = source.read_content()?;

        let scene = self
            .decoder
            .decode_buffer_to_scene(&buffer)
            .map_err(|e| Err::DecodeError(e.to_string()))?;
        self.set_scene(scene);
        Ok(())
    }

    /// Stamps the geometry compression options onto every mesh of the loaded
    /// scene. Applying the options again leaves the scene unchanged.
    fn compress_scene(&mut self) -> Result<(), Err> {
        self.check_compressible()?;
        let scene = self.scene.as_deref_mut().ok_or_else(no_scene)?;
        utils::set_compression_options(Some(&self.options.geometry), scene);
        tracing::debug!(meshes = scene.num_meshes(), "applied compression options");
        self.state = TranscoderState::Compressed;
        Ok(())
    }

    /// Writes the compressed scene to the output file in the layout selected
    /// by `file_options`.
    fn write_scene_to_file(&mut self, file_options: &FileOptions) -> Result<(), Err> {
        self.check_compressed()?;
        let scene = self.scene.as_deref().ok_or_else(no_scene)?;
        if file_options.output_filename.as_os_str().is_empty() {
            return Err(Err::InvalidArgument("Output filename is empty.".to_string()));
        }
        if file_options.has_ignored_resource_directory() {
            tracing::warn!("output resource directory is ignored without an output bin filename");
        }

        let output = file_options.output_filename.as_path();
        let layout = file_options.output_layout();
        tracing::debug!(?layout, "writing scene to file");
        let result = match layout {
            OutputLayout::BinAndResources { bin, resource_dir } => {
                self.encoder.encode_scene_file_with_resources(scene, output, bin, resource_dir)
            }
            OutputLayout::Bin { bin } => self.encoder.encode_scene_file_with_bin(scene, output, bin),
            OutputLayout::SingleFile => self.encoder.encode_scene_file(scene, output),
        };
        result.map_err(|e| Err::EncodeError(e.to_string()))?;
        self.state = TranscoderState::Written;
        Ok(())
    }

    /// Encodes the compressed scene in memory and writes it to `sink` in one
    /// operation. Fails without touching `sink` when it already holds bytes.
    fn write_scene_to_endpoint<K: ByteSink + ?Sized>(&mut self, sink: &mut K) -> Result<(), Err> {
        self.check_compressed()?;
        let scene = self.scene.as_deref().ok_or_else(no_scene)?;
        if !sink.is_empty()? {
            return Err(Err::IoError("destination not empty".to_string()));
        }

        let buffer = self
            .encoder
            .encode_scene_to_buffer(scene)
            .map_err(|e| Err::EncodeError(e.to_string()))?;
        tracing::debug!(bytes = buffer.len(), "writing scene to endpoint");
        sink.write_content(&buffer)?;
        self.state = TranscoderState::Written;
        Ok(())
    }

    fn set_scene(&mut self, scene: Scene) {
        tracing::debug!(meshes = scene.num_meshes(), nodes = scene.nodes().len(), "loaded scene");
        self.scene = Some(Box::new(scene));
        self.state = TranscoderState::Loaded;
    }

    fn check_ready(&self) -> Result<(), Err> {
        match self.state {
            TranscoderState::Ready => Ok(()),
            state => Err(Err::PreconditionFailed(format!(
                "Transcoder is {:?}; create a new transcoder for every run.",
                state
            ))),
        }
    }

    fn check_loadable(&self) -> Result<(), Err> {
        match self.state {
            TranscoderState::Ready | TranscoderState::Loaded => Ok(()),
            state => Err(Err::PreconditionFailed(format!("Cannot load a scene in state {:?}.", state))),
        }
    }

    fn check_compressible(&self) -> Result<(), Err> {
        match self.state {
            TranscoderState::Loaded | TranscoderState::Compressed => Ok(()),
            TranscoderState::Ready => Err(no_scene()),
            state => Err(Err::PreconditionFailed(format!("Cannot compress a scene in state {:?}.", state))),
        }
    }

    // Writing an uncompressed scene is never allowed.
    fn check_compressed(&self) -> Result<(), Err> {
        match self.state {
            TranscoderState::Compressed => Ok(()),
            TranscoderState::Ready => Err(no_scene()),
            state => Err(Err::PreconditionFailed(format!("Cannot write a scene in state {:?}.", state))),
        }
    }

    fn log_summary(&self) {
        if let Some(scene) = self.scene.as_deref() {
            tracing::info!(
                meshes = scene.num_meshes(),
                faces = utils::num_faces(scene),
                compression_level = self.options.geometry.compression_level,
                "transcoded scene"
            );
        }
    }
}

fn no_scene() -> Err {
    Err::PreconditionFailed("No scene is loaded.".to_string())
}

/// Creates a transcoder from `options` and transcodes one file with it.
/// Invalid options fail exactly as [`DracoTranscoder::create`] does.
pub fn transcode_file(options: impl Into<TranscodingOptions>, file_options: &FileOptions) -> Result<(), Err> {
    DracoTranscoder::create(options)?.transcode(file_options)
}
