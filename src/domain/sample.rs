// ============================================================
// Sample: what the dataset hands to a training loop
// ============================================================
// A sample is built on demand from a DataRecord plus the image
// file it names, and is never persisted:
//
//   image      channel-first float tensor [C, H, W]
//   category   dense id from the category vocabulary
//   condition  dense id from the condition vocabulary
//
// The tensor is backend-agnostic (a flat Vec<f32>); the batcher
// turns a Vec<Sample> into burn tensors on the target device.

/// A channel-first (`[C, H, W]`) float image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 3],
    data:  Vec<f32>,
}

impl ImageTensor {
    /// Wrap channel-first data. Returns `None` when `data` does not
    /// hold exactly `channels * height * width` values.
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> Option<Self> {
        let [c, h, w] = shape;
        (c * h * w == data.len()).then_some(Self { shape, data })
    }

    /// Callers inside the crate that build `data` from the shape itself.
    pub(crate) fn from_chw(shape: [usize; 3], data: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// One channel plane, row-major.
    pub fn plane(&self, channel: usize) -> &[f32] {
        let n = self.shape[1] * self.shape[2];
        &self.data[channel * n..(channel + 1) * n]
    }

    pub fn plane_mut(&mut self, channel: usize) -> &mut [f32] {
        let n = self.shape[1] * self.shape[2];
        &mut self.data[channel * n..(channel + 1) * n]
    }
}

/// One indexed dataset item.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image:     ImageTensor,
    pub category:  usize,
    pub condition: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_mismatched_length() {
        assert!(ImageTensor::new([3, 2, 2], vec![0.0; 11]).is_none());
        assert!(ImageTensor::new([3, 2, 2], vec![0.0; 12]).is_some());
    }

    #[test]
    fn test_planes_are_channel_first() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let t = ImageTensor::new([3, 2, 2], data).unwrap();
        assert_eq!(t.plane(0), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.plane(2), &[8.0, 9.0, 10.0, 11.0]);
    }
}
