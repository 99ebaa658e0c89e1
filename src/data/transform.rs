// ============================================================
// Transform Pipeline
// ============================================================
// Pure image → image operations, applied in order to the image
// of each sample as it is loaded. Label ids never go through a
// transform: `apply_sample` splits the sample, transforms the
// image and puts the same ids back.
//
// An image moves through three representations:
//
//   Pixels  8-bit RGB, channel-last, values 0..=255  (decoded JPEG)
//   Float   f32 RGB, channel-last                    (after Normalize)
//   Tensor  f32, channel-first [C, H, W]             (after ToTensor)
//
// Resize and CenterCrop work on all three and keep the
// representation. Normalize on Pixels first rescales to [0, 1].
// ToTensor rescales Pixels to [0, 1] and only re-lays-out Float.
// As a result these two give identical tensors:
//
//   [Resize(256), CenterCrop(224), Normalize(m, s), ToTensor]
//   [Resize(256), CenterCrop(224), ToTensor, Normalize(m, s)]
//
// Resize uses the same triangle (bilinear, antialiased) filter in
// every representation: `image` resamples Pixels, and the f32 paths
// run an equivalent resampler that does not clamp to [0, 1]. So
// resizing before or after Normalize differs only by 8-bit rounding.
//
// CenterCrop on an image smaller than the crop pads with zeros
// (extra pixel on the right / bottom) and then crops, so the
// output size is always exactly the requested size.

use std::fmt;

use image::{imageops, ImageBuffer, Pixel, Rgb, Rgb32FImage, RgbImage};

use crate::domain::sample::{ImageTensor, Sample};
use crate::error::{Error, Result};

const RGB_CHANNELS: usize = 3;

// ─── ImageData ────────────────────────────────────────────────────────────────
/// An image at some stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    Pixels(RgbImage),
    Float(Rgb32FImage),
    Tensor(ImageTensor),
}

impl ImageData {
    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageData::Pixels(img) => img.dimensions(),
            ImageData::Float(img)  => img.dimensions(),
            ImageData::Tensor(t)   => (t.width() as u32, t.height() as u32),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ImageData::Tensor(t) => t.channels(),
            _                    => RGB_CHANNELS,
        }
    }

    /// Channel-first tensor view of this image (the ToTensor step).
    pub fn into_tensor(self) -> ImageTensor {
        match self {
            ImageData::Pixels(img) => rgb_to_tensor(&img, |v: u8| f32::from(v) / 255.0),
            ImageData::Float(img)  => float_to_tensor(&img),
            ImageData::Tensor(t)   => t,
        }
    }
}

// ─── Transform ────────────────────────────────────────────────────────────────
/// One pipeline step.
pub trait Transform: Send + Sync + fmt::Debug {
    fn apply(&self, image: ImageData) -> Result<ImageData>;
}

// ─── Resize ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    /// Scale the shorter edge to this length, keeping aspect ratio.
    ShorterEdge(u32),
    /// Exact output dimensions.
    Exact { width: u32, height: u32 },
}

/// Bilinear (triangle filter) resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    target: ResizeTarget,
}

impl Resize {
    /// Shorter edge becomes `size`; the longer edge becomes
    /// `floor(size * long / short)`.
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidTransform("Resize size must be positive".into()));
        }
        Ok(Self { target: ResizeTarget::ShorterEdge(size) })
    }

    pub fn exact(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidTransform(format!(
                "Resize dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { target: ResizeTarget::Exact { width, height } })
    }

    pub fn target(&self) -> ResizeTarget {
        self.target
    }

    /// Output `(width, height)` for an input of the given size.
    pub fn output_size(&self, width: u32, height: u32) -> Result<(u32, u32)> {
        match self.target {
            _ if width == 0 || height == 0 => Err(Error::InvalidTransform(format!(
                "cannot resize an empty {width}x{height} image"
            ))),
            ResizeTarget::Exact { width, height } => Ok((width, height)),
            ResizeTarget::ShorterEdge(size) => {
                let scale = |long: u32, short: u32| (u64::from(size) * u64::from(long) / u64::from(short)) as u32;
                if width <= height {
                    Ok((size, scale(height, width)))
                } else {
                    Ok((scale(width, height), size))
                }
            }
        }
    }
}

impl Transform for Resize {
    fn apply(&self, image: ImageData) -> Result<ImageData> {
        let (w, h)   = image.dimensions();
        let (tw, th) = self.output_size(w, h)?;
        if (tw, th) == (w, h) {
            return Ok(image);
        }

        Ok(match image {
            ImageData::Pixels(img) => {
                ImageData::Pixels(imageops::resize(&img, tw, th, imageops::FilterType::Triangle))
            }
            ImageData::Float(img) => {
                ImageData::Float(tensor_to_rgb(&resize_planes(&float_to_tensor(&img), tw, th))?)
            }
            ImageData::Tensor(t) => ImageData::Tensor(resize_planes(&t, tw, th)),
        })
    }
}

/// Per output coordinate along one axis: the first contributing
/// source index and the normalized triangle weights from there on.
/// The kernel widens by the scale factor when shrinking, the same
/// filter `imageops::resize` applies for `FilterType::Triangle`.
fn triangle_weights(src: usize, dst: usize) -> Vec<(usize, Vec<f32>)> {
    let ratio   = src as f32 / dst as f32;
    let sratio  = ratio.max(1.0);
    let support = sratio;

    (0..dst)
        .map(|d| {
            let center = (d as f32 + 0.5) * ratio;
            let left   = ((center - support).floor().max(0.0) as usize).min(src - 1);
            let right  = ((center + support).ceil() as usize).clamp(left + 1, src);

            let mut weights: Vec<f32> = (left..right)
                .map(|i| (1.0 - ((i as f32 - (center - 0.5)) / sratio).abs()).max(0.0))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum != 0.0 {
                weights.iter_mut().for_each(|w| *w /= sum);
            }
            (left, weights)
        })
        .collect()
}

/// Separable triangle-filter resize of every channel plane, rows
/// first and then columns. Works on unbounded values, so normalized
/// data survives intact, and matches the 8-bit path up to rounding.
fn resize_planes(t: &ImageTensor, width: u32, height: u32) -> ImageTensor {
    let [channels, src_h, src_w] = t.shape();
    let (dst_w, dst_h) = (width as usize, height as usize);
    let ys = triangle_weights(src_h, dst_h);
    let xs = triangle_weights(src_w, dst_w);

    let mut data: Vec<f32> = Vec::with_capacity(channels * dst_h * dst_w);
    let mut column = vec![0.0f32; src_w];
    for c in 0..channels {
        let plane = t.plane(c);
        for (top, wy) in &ys {
            column.iter_mut().for_each(|v| *v = 0.0);
            for (k, w) in wy.iter().enumerate() {
                let row = &plane[(top + k) * src_w..(top + k + 1) * src_w];
                column.iter_mut().zip(row).for_each(|(acc, v)| *acc += w * v);
            }
            for (left, wx) in &xs {
                data.push(wx.iter().zip(&column[*left..]).map(|(w, v)| w * v).sum());
            }
        }
    }
    ImageTensor::from_chw([channels, dst_h, dst_w], data)
}

// ─── CenterCrop ───────────────────────────────────────────────────────────────
/// Crop the spatial center to a fixed size, zero-padding first when
/// the image is smaller than the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterCrop {
    width:  u32,
    height: u32,
}

impl CenterCrop {
    /// Square `size × size` crop.
    pub fn new(size: u32) -> Result<Self> {
        Self::exact(size, size)
    }

    pub fn exact(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidTransform(format!(
                "CenterCrop dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Transform for CenterCrop {
    fn apply(&self, image: ImageData) -> Result<ImageData> {
        if image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }

        let (w, h) = (self.width, self.height);
        Ok(match image {
            ImageData::Pixels(img) => ImageData::Pixels(center_crop(&img, w, h)),
            ImageData::Float(img)  => ImageData::Float(center_crop(&img, w, h)),
            ImageData::Tensor(t)   => ImageData::Tensor(center_crop_planes(&t, w, h)),
        })
    }
}

/// Offset of a centered window inside `slack` spare pixels.
/// Halves round to even, matching the usual vision-library crop.
fn center_offset(slack: u32) -> u32 {
    let half = slack / 2;
    if slack % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

fn center_crop<P>(
    img:    &ImageBuffer<P, Vec<P::Subpixel>>,
    width:  u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let (w, h) = img.dimensions();

    // Zero padding needed on the left / top when the image is too small
    let pad_left = width.saturating_sub(w) / 2;
    let pad_top  = height.saturating_sub(h) / 2;

    // Crop window inside the padded frame
    let crop_left = center_offset(w.max(width) - width);
    let crop_top  = center_offset(h.max(height) - height);

    let mut out = ImageBuffer::new(width, height);
    imageops::replace(
        &mut out,
        img,
        i64::from(pad_left) - i64::from(crop_left),
        i64::from(pad_top) - i64::from(crop_top),
    );
    out
}

fn center_crop_planes(t: &ImageTensor, width: u32, height: u32) -> ImageTensor {
    let [channels, src_h, src_w] = t.shape();
    let (w, h) = (width as usize, height as usize);

    let pad_left  = w.saturating_sub(src_w) / 2;
    let pad_top   = h.saturating_sub(src_h) / 2;
    let crop_left = center_offset((src_w.max(w) - w) as u32) as usize;
    let crop_top  = center_offset((src_h.max(h) - h) as u32) as usize;

    let mut data = vec![0.0f32; channels * h * w];
    for c in 0..channels {
        let plane = t.plane(c);
        for y in 0..h {
            // Row in the padded frame, then back into the source
            let Some(sy) = (y + crop_top).checked_sub(pad_top).filter(|&sy| sy < src_h) else {
                continue;
            };
            for x in 0..w {
                if let Some(sx) = (x + crop_left).checked_sub(pad_left).filter(|&sx| sx < src_w) {
                    data[(c * h + y) * w + x] = plane[sy * src_w + sx];
                }
            }
        }
    }
    ImageTensor::from_chw([channels, h, w], data)
}

// ─── Normalize ────────────────────────────────────────────────────────────────
/// Channel statistics the pretrained backbone was trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

/// Per-channel `(pixel - mean[c]) / std[c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    mean: Vec<f32>,
    std:  Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.is_empty() || mean.len() != std.len() {
            return Err(Error::InvalidTransform(format!(
                "Normalize needs one mean and one std per channel, got {} and {}",
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|&s| s == 0.0 || !s.is_finite()) || mean.iter().any(|m| !m.is_finite()) {
            return Err(Error::InvalidTransform(
                "Normalize mean must be finite and std finite and non-zero".into(),
            ));
        }
        Ok(Self { mean, std })
    }

    pub fn imagenet() -> Self {
        Self {
            mean: IMAGENET_MEAN.to_vec(),
            std:  IMAGENET_STD.to_vec(),
        }
    }

    fn check_channels(&self, channels: usize) -> Result<()> {
        if channels != self.mean.len() {
            return Err(Error::InvalidTransform(format!(
                "Normalize configured for {} channels, image has {}",
                self.mean.len(),
                channels
            )));
        }
        Ok(())
    }
}

impl Transform for Normalize {
    fn apply(&self, image: ImageData) -> Result<ImageData> {
        self.check_channels(image.channels())?;

        match image {
            ImageData::Pixels(img) => self.apply(ImageData::Float(pixels_to_float(&img))),
            ImageData::Float(mut img) => {
                for pixel in img.pixels_mut() {
                    for (c, value) in pixel.0.iter_mut().enumerate() {
                        *value = (*value - self.mean[c]) / self.std[c];
                    }
                }
                Ok(ImageData::Float(img))
            }
            ImageData::Tensor(mut t) => {
                for c in 0..t.channels() {
                    let (mean, std) = (self.mean[c], self.std[c]);
                    t.plane_mut(c).iter_mut().for_each(|v| *v = (*v - mean) / std);
                }
                Ok(ImageData::Tensor(t))
            }
        }
    }
}

// ─── ToTensor ─────────────────────────────────────────────────────────────────
/// Channel-last image → channel-first float tensor; 8-bit pixels are
/// scaled to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToTensor;

impl Transform for ToTensor {
    fn apply(&self, image: ImageData) -> Result<ImageData> {
        Ok(ImageData::Tensor(image.into_tensor()))
    }
}

// ─── TransformPipeline ────────────────────────────────────────────────────────
/// An ordered list of transforms, applied first to last.
#[derive(Debug, Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step (builder style).
    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn push(&mut self, transform: impl Transform + 'static) {
        self.transforms.push(Box::new(transform));
    }

    /// `self` followed by `other`.
    pub fn then(mut self, other: TransformPipeline) -> Self {
        self.transforms.extend(other.transforms);
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn apply(&self, image: ImageData) -> Result<ImageData> {
        self.transforms.iter().try_fold(image, |img, t| t.apply(img))
    }

    /// Transform the image of a sample; the label ids are carried over untouched.
    pub fn apply_sample(&self, sample: Sample) -> Result<Sample> {
        let Sample { image, category, condition } = sample;
        let image = self.apply(ImageData::Tensor(image))?.into_tensor();
        Ok(Sample { image, category, condition })
    }
}

impl Transform for TransformPipeline {
    fn apply(&self, image: ImageData) -> Result<ImageData> {
        TransformPipeline::apply(self, image)
    }
}

// ─── Layout conversions ───────────────────────────────────────────────────────

fn pixels_to_float(img: &RgbImage) -> Rgb32FImage {
    let (w, h) = img.dimensions();
    ImageBuffer::from_fn(w, h, |x, y| {
        let p = img.get_pixel(x, y).0;
        Rgb(p.map(|v| f32::from(v) / 255.0))
    })
}

fn rgb_to_tensor<S, F>(img: &ImageBuffer<Rgb<S>, Vec<S>>, scale: F) -> ImageTensor
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: image::Primitive,
    F: Fn(S) -> f32,
{
    let (w, h) = img.dimensions();
    let plane  = (w * h) as usize;
    let mut data = vec![0.0f32; RGB_CHANNELS * plane];

    for (i, pixel) in img.pixels().enumerate() {
        for c in 0..RGB_CHANNELS {
            data[c * plane + i] = scale(pixel.0[c]);
        }
    }

    ImageTensor::from_chw([RGB_CHANNELS, h as usize, w as usize], data)
}

fn tensor_to_rgb(t: &ImageTensor) -> Result<Rgb32FImage> {
    if t.channels() != RGB_CHANNELS {
        return Err(Error::InvalidTransform(format!(
            "spatial transforms on tensors need {RGB_CHANNELS} channels, got {}",
            t.channels()
        )));
    }
    let (w, h) = (t.width() as u32, t.height() as u32);
    let (r, g, b) = (t.plane(0), t.plane(1), t.plane(2));
    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        let i = (y * w + x) as usize;
        Rgb([r[i], g[i], b[i]])
    }))
}

fn float_to_tensor(img: &Rgb32FImage) -> ImageTensor {
    rgb_to_tensor(img, |v: f32| v)
}
