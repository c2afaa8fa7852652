//! Built-in demo animation: a blue square springing across a dark background.

use framepress_common::error::FramepressResult;
use framepress_frame_model::{Frame, FrameBuffer, PixelFormat};
use image::{ImageBuffer, Rgba, RgbaImage};

const BACKGROUND: Rgba<u8> = Rgba([0x1a, 0x1a, 0x1a, 0xff]);
const BOX_COLOR: Rgba<u8> = Rgba([0x3b, 0x82, 0xf6, 0xff]);
const BOX_SIZE: u32 = 100;
const MARGIN_LEFT: u32 = 20;
/// Gap between the square's resting position and the right edge.
const MARGIN_RIGHT: u32 = 120;

/// Elastic ease-out: overshoots, then settles at 1.
pub fn spring_ease(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c4 = (2.0 * std::f64::consts::PI) / 3.0;
    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
}

/// Left edge of the square at `progress` in `[0, 1)`.
pub fn box_x(width: u32, progress: f64) -> i64 {
    let start = MARGIN_LEFT as f64;
    let end = width.saturating_sub(MARGIN_RIGHT) as f64;
    (start + (end - start) * spring_ease(progress)).round() as i64
}

/// Draw one frame of the animation.
pub fn render_frame(width: u32, height: u32, progress: f64) -> RgbaImage {
    let mut img = ImageBuffer::from_pixel(width, height, BACKGROUND);

    let x0 = box_x(width, progress);
    let y0 = (height as i64 / 2) - (BOX_SIZE as i64 / 2);
    for y in y0.max(0)..(y0 + BOX_SIZE as i64).min(height as i64) {
        for x in x0.max(0)..(x0 + BOX_SIZE as i64).min(width as i64) {
            img.put_pixel(x as u32, y as u32, BOX_COLOR);
        }
    }

    img
}

/// Render `total` frames covering the animation, reporting each finished
/// frame index to `on_frame`.
pub fn render_demo(
    width: u32,
    height: u32,
    total: usize,
    mut on_frame: impl FnMut(usize),
) -> FramepressResult<FrameBuffer> {
    let mut frames = FrameBuffer::with_capacity(total);
    for i in 0..total {
        let progress = i as f64 / total as f64;
        let img = render_frame(width, height, progress);
        let frame = Frame::new(width, height, PixelFormat::Rgba8, img.into_raw())?;
        frames.push(frame)?;
        on_frame(i + 1);
    }
    Ok(frames)
}
