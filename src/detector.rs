use anyhow::{bail, Context, Result};
use candle_core::{Device, Tensor};
use candle_onnx::{onnx::ModelProto, read_file, simple_eval};
use hf_hub::api::sync::Api;
use image::{imageops::FilterType, RgbImage};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Model input edge, fixed by the SSD face network.
const INPUT_SIZE: u32 = 300;
/// Per-channel means subtracted during preprocessing, in B,G,R order to match
/// the network's expected input layout.
const CHANNEL_MEAN: [f32; 3] = [104.0, 177.0, 123.0];
/// Values per candidate row in the output tensor.
const CANDIDATE_STRIDE: usize = 7;

const DEFAULT_MODEL_FILE: &str = "res10_300x300_ssd.onnx";

/// One face candidate with pixel-indexed box corners in the source frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Detection {
    /// Scales a box with corners normalized to `[0, 1]` back to pixel
    /// coordinates of a `width` x `height` frame.
    pub fn from_normalized(confidence: f32, boxed: [f32; 4], width: u32, height: u32) -> Self {
        let [x1, y1, x2, y2] = boxed;
        Self {
            confidence,
            x1: (x1 * width as f32).round() as i32,
            y1: (y1 * height as f32).round() as i32,
            x2: (x2 * width as f32).round() as i32,
            y2: (y2 * height as f32).round() as i32,
        }
    }
}

/// Inference backend for the detection loop.
pub trait Detect {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

/// Pretrained SSD face detector evaluated on the CPU through candle's ONNX
/// interpreter. Returns every candidate the network emits; confidence
/// filtering is the reporter's job.
pub struct FaceDetector {
    model: ModelProto,
    input_name: String,
    output_name: String,
    device: Device,
}

impl FaceDetector {
    pub fn load(path: &Path) -> Result<Self> {
        let model = read_file(path)
            .with_context(|| format!("failed to load model from {}", path.display()))?;
        let graph = model.graph.as_ref().context("model graph missing")?;
        let input_name = graph
            .input
            .first()
            .context("model declares no input")?
            .name
            .clone();
        let output_name = graph
            .output
            .first()
            .context("model declares no output")?
            .name
            .clone();
        debug!(input = %input_name, output = %output_name, "model loaded");
        Ok(Self {
            model,
            input_name,
            output_name,
            device: Device::Cpu,
        })
    }

    fn preprocess(&self, frame: &RgbImage) -> Result<Tensor> {
        let resized = image::imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);
        let tensor = Tensor::from_vec(
            blob_planes(&resized),
            (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
            &self.device,
        )?;
        Ok(tensor)
    }
}

/// Builds the NCHW plane data for a resized frame. The network consumes BGR
/// planes while the frame is RGB, so pixel channels are read back to front.
fn blob_planes(resized: &RgbImage) -> Vec<f32> {
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * INPUT_SIZE as usize + x as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[2 - c] as f32 - CHANNEL_MEAN[c];
        }
    }
    data
}

impl Detect for FaceDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let tensor = self.preprocess(frame)?;
        let mut inputs = HashMap::new();
        inputs.insert(self.input_name.clone(), tensor);
        let mut outputs = simple_eval(&self.model, inputs).context("inference failed")?;
        let output = outputs
            .remove(&self.output_name)
            .context("model output missing")?;
        let stride = output.dims().last().copied().unwrap_or(0);
        if stride < CANDIDATE_STRIDE {
            bail!("unexpected output shape {:?}", output.dims());
        }
        let flat = output.flatten_all()?.to_vec1::<f32>()?;
        let (width, height) = frame.dimensions();
        Ok(decode_candidates(&flat, stride, width, height))
    }
}

/// Decodes the flattened detection tensor. Each row of `stride` values holds
/// `(_, _, confidence, x1, y1, x2, y2)` with box corners normalized to `[0, 1]`.
fn decode_candidates(flat: &[f32], stride: usize, width: u32, height: u32) -> Vec<Detection> {
    flat.chunks_exact(stride)
        .map(|row| {
            Detection::from_normalized(row[2], [row[3], row[4], row[5], row[6]], width, height)
        })
        .collect()
}

/// Finds the model artifact: explicit path override first, then the fixed
/// filename in the working directory (or `FACEWATCH_MODEL`), then an optional
/// hf-hub download when `FACEWATCH_MODEL_REPO` is set.
pub fn resolve_model_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    let filename =
        env::var("FACEWATCH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_FILE.to_string());
    if Path::new(&filename).exists() {
        return Ok(PathBuf::from(filename));
    }
    if let Ok(repo) = env::var("FACEWATCH_MODEL_REPO") {
        debug!(repo = %repo, file = %filename, "fetching model from hf-hub");
        let path = Api::new()
            .and_then(|api| api.model(repo).get(&filename))
            .context("failed to download model")?;
        return Ok(path);
    }
    bail!("model file {filename} not found");
}
