//! Raster image decoder with full mip chain (§4.3).

#[cfg(feature = "cli")]
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// decoded image payload: directory + concatenated mip levels.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// little-endian bytes: `u32 mip_count`, then `mip_count` x `(u32 w, u32 h, u32 offset, u32 size)`,
    /// then the concatenated level bytes.
    pub bytes: Vec<u8>,
    /// width of mip level 0.
    pub base_width: u32,
    /// height of mip level 0.
    pub base_height: u32,
    /// number of mip levels.
    pub mip_count: u32,
}

/// decode failure: the `image` crate could not recognize or decode the input bytes.
#[derive(Debug, Clone)]
pub struct ImageDecodeError(pub String);

impl std::fmt::Display for ImageDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ImageDecodeError {}

/// number of mip levels for a base size `(w, h)`: `floor(log2(max(w,h))) + 1`.
pub fn mip_count_for(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1);
    (32 - max_dim.leading_zeros()).max(1)
}

#[cfg(feature = "cli")]
/// decodes raw image bytes (png/jpg/jpeg/bmp/tga/webp/gif) into RGBA8 with a full mip chain.
pub fn decode(bytes: &[u8]) -> Result<ImagePayload, ImageDecodeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ImageDecodeError(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (base_width, base_height) = rgba.dimensions();

    let mip_count = mip_count_for(base_width, base_height);

    let mut levels: Vec<(u32, u32, Vec<u8>)> = Vec::with_capacity(mip_count as usize);
    let mut current = DynamicImage::ImageRgba8(rgba);
    let (mut w, mut h) = (base_width, base_height);

    loop {
        let frame = current.to_rgba8();
        levels.push((w, h, frame.into_raw()));

        if w == 1 && h == 1 {
            break;
        }

        let next_w = (w / 2).max(1);
        let next_h = (h / 2).max(1);
        current = current.resize_exact(next_w, next_h, FilterType::Lanczos3);
        w = next_w;
        h = next_h;
    }

    debug_assert_eq!(levels.len() as u32, mip_count);

    let directory_size = 4 + 16 * levels.len();
    let mut bytes_out = Vec::with_capacity(directory_size + levels.iter().map(|l| l.2.len()).sum::<usize>());

    bytes_out.extend_from_slice(&(levels.len() as u32).to_le_bytes());

    let mut offset = directory_size as u32;
    for (w, h, data) in &levels {
        let size = data.len() as u32;
        bytes_out.extend_from_slice(&w.to_le_bytes());
        bytes_out.extend_from_slice(&h.to_le_bytes());
        bytes_out.extend_from_slice(&offset.to_le_bytes());
        bytes_out.extend_from_slice(&size.to_le_bytes());
        offset += size;
    }

    for (_, _, data) in &levels {
        bytes_out.extend_from_slice(data);
    }

    Ok(ImagePayload {
        bytes: bytes_out,
        base_width,
        base_height,
        mip_count: levels.len() as u32,
    })
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use assert2::check;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("encode png");
        out
    }

    #[test]
    fn mip_chain_length_matches_formula() {
        check!(mip_count_for(5, 3) == 3);
        check!(mip_count_for(1, 1) == 1);
        check!(mip_count_for(256, 256) == 9);
    }

    #[test]
    fn five_by_three_png_yields_three_levels() {
        let png = encode_png(5, 3);
        let payload = decode(&png).expect("decode");

        check!(payload.base_width == 5);
        check!(payload.base_height == 3);
        check!(payload.mip_count == 3);

        let mip_count = u32::from_le_bytes(payload.bytes[0..4].try_into().unwrap());
        check!(mip_count == 3);

        let level0_w = u32::from_le_bytes(payload.bytes[4..8].try_into().unwrap());
        let level0_h = u32::from_le_bytes(payload.bytes[8..12].try_into().unwrap());
        check!(level0_w == 5);
        check!(level0_h == 3);
    }

    #[test]
    fn each_level_size_equals_w_times_h_times_4() {
        let png = encode_png(8, 4);
        let payload = decode(&png).expect("decode");

        for i in 0..payload.mip_count as usize {
            let base = 4 + i * 16;
            let w = u32::from_le_bytes(payload.bytes[base..base + 4].try_into().unwrap());
            let h = u32::from_le_bytes(payload.bytes[base + 4..base + 8].try_into().unwrap());
            let size = u32::from_le_bytes(payload.bytes[base + 12..base + 16].try_into().unwrap());
            check!(size == w * h * 4);
        }
    }
}
