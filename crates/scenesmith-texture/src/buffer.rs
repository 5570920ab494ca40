//! Pixel buffers for map synthesis.

/// A square RGB buffer, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbBuffer {
    /// Edge length in pixels.
    pub size: u32,
    /// Pixel data, `size * size` RGB triples.
    pub data: Vec<[u8; 3]>,
}

impl RgbBuffer {
    /// Buffer filled with one color.
    pub fn new(size: u32, fill: [u8; 3]) -> Self {
        Self {
            size,
            data: vec![fill; (size * size) as usize],
        }
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) {
        let idx = (y * self.size + x) as usize;
        self.data[idx] = color;
    }

    /// Flattened RGB bytes for encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().flatten().copied().collect()
    }
}

/// A square grayscale buffer, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayBuffer {
    /// Edge length in pixels.
    pub size: u32,
    /// Pixel data, one byte per pixel.
    pub data: Vec<u8>,
}

impl GrayBuffer {
    /// Buffer filled with one value.
    pub fn new(size: u32, fill: u8) -> Self {
        Self {
            size,
            data: vec![fill; (size * size) as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.size + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let idx = (y * self.size + x) as usize;
        self.data[idx] = value;
    }

    /// The raw bytes for encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// 3x3 box blur with clamped edges.
    pub fn box_blur(&self) -> Self {
        let size = self.size as i64;
        let mut out = GrayBuffer::new(self.size, 0);
        for y in 0..size {
            for x in 0..size {
                let mut sum = 0u32;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let sx = (x + dx).clamp(0, size - 1) as u32;
                        let sy = (y + dy).clamp(0, size - 1) as u32;
                        sum += self.get(sx, sy) as u32;
                    }
                }
                out.set(x as u32, y as u32, (sum / 9) as u8);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_flattens_a_spike() {
        let mut buffer = GrayBuffer::new(5, 0);
        buffer.set(2, 2, 255);
        let blurred = buffer.box_blur();
        assert_eq!(blurred.get(2, 2), 255 / 9);
        assert_eq!(blurred.get(0, 0), 0);
    }

    #[test]
    fn rgb_bytes_are_row_major_triples(){
        let mut buffer = RgbBuffer::new(2, [0, 0, 0]);
        buffer.set(1, 0, [1, 2, 3]);
        assert_eq!(buffer.to_bytes(), vec![0, 0, 0, 1, 2, 3, 0, 0, 0, 0, 0, 0]);
    }
}
