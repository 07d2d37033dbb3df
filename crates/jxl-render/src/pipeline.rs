//! The staged row processor (§4.12): a fixed stage order applied to a
//! frame's three colour planes once VarDCT/Modular decode has produced
//! them. Each stage is independently toggleable via `Settings`,
//! mirroring `spec.md`'s per-stage Mode/Settings contract.

use jxl_color::header::{ColourEncoding, TransferFunction};

use crate::{blend, color, epf, gaborish, noise, upsampling};

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub do_ycbcr: bool,
    pub xyb_encoded: bool,
    pub upsampling_factor: usize,
    pub gaborish: bool,
    pub epf_iters: u32,
    pub inject_noise: bool,
}

/// Three contiguous colour planes of equal size, row-major.
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: [Vec<f32>; 3],
}

impl Image {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            channels: [vec![0.0; width * height], vec![0.0; width * height], vec![0.0; width * height]],
        }
    }

    fn as_mut3(&mut self) -> [&mut [f32]; 3] {
        let [a, b, c] = &mut self.channels;
        [a.as_mut_slice(), b.as_mut_slice(), c.as_mut_slice()]
    }
}

/// Run the fixed stage sequence: Gaborish -> EPF -> colour transform ->
/// noise -> (upsampling happens earlier, against the still-subsampled
/// planes, so it's invoked by the caller before this point when chroma
/// subsampling is in play).
pub struct Pipeline {
    pub settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn upsample_chroma_planes(&self, image: &mut Image, shifts: [(u32, u32); 3]) {
        if self.settings.upsampling_factor <= 1 && shifts.iter().all(|&(sx, sy)| sx == 0 && sy == 0) {
            return;
        }
        for (plane, &(sx, sy)) in image.channels.iter_mut().zip(shifts.iter()) {
            if sx == 0 && sy == 0 {
                continue;
            }
            let sub_w = image.width >> sx;
            let sub_h = image.height >> sy;
            *plane = color::upsample_chroma(plane, sub_w.max(1), sub_h.max(1), sx, sy, image.width, image.height);
        }
    }

    pub fn apply_gaborish(&self, image: &mut Image, weights: [[f32; 2]; 3]) {
        if !self.settings.gaborish {
            return;
        }
        for (plane, w) in image.channels.iter_mut().zip(weights) {
            gaborish::apply(plane, image.width, image.height, w);
        }
    }

    pub fn apply_epf(&self, image: &mut Image, inv_sigma: &[f32]) {
        for stage in 0..self.settings.epf_iters.min(3) {
            let [a, b, c] = image.as_mut3();
            epf::apply_pass([a, b, c], image.width, image.height, stage as u8, inv_sigma);
        }
    }

    pub fn colour_transform(
        &self,
        image: &mut Image,
        opsin_bias: [f32; 3],
        intensity_target: f32,
        inv_opsin_mat: [[f32; 3]; 3],
        colour_encoding: &ColourEncoding,
        tf: TransferFunction,
    ) {
        let _ = colour_encoding;
        if self.settings.do_ycbcr {
            let [a, b, c] = image.as_mut3();
            color::ycbcr_to_rgb_inplace([a, b, c]);
        } else if self.settings.xyb_encoded {
            let [a, b, c] = image.as_mut3();
            color::xyb_to_linear_rgb([a, b, c], opsin_bias, intensity_target, inv_opsin_mat);
        }
        let [a, b, c] = image.as_mut3();
        color::apply_transfer_function([a, b, c], tf);
    }

    pub fn inject_noise(&self, image: &mut Image, seed: &[f32], lut: &[f32; 8]) {
        if !self.settings.inject_noise {
            return;
        }
        let nx = noise::synthesize(seed, image.width, image.height);
        let ny = noise::synthesize(seed, image.width, image.height);
        let nb = noise::synthesize(seed, image.width, image.height);
        let [a, b, c] = image.as_mut3();
        noise::inject([a, b, c], [&nx, &ny, &nb], lut);
    }

    pub fn upsample_full(&self, image: &Image, weights: &[f32]) -> Image {
        let factor = self.settings.upsampling_factor;
        if factor <= 1 {
            return Image {
                width: image.width,
                height: image.height,
                channels: image.channels.clone(),
            };
        }
        let mut out = Image::new(image.width * factor, image.height * factor);
        for (src, dst) in image.channels.iter().zip(out.channels.iter_mut()) {
            *dst = upsampling::upsample(src, image.width, image.height, factor, weights);
        }
        out
    }

    pub fn blend_with_reference(
        &self,
        mode: blend::BlendMode,
        image: &Image,
        reference: &Image,
        fg_alpha: &[f32],
        bg_alpha: &[f32],
    ) -> Image {
        let mut out = Image::new(image.width, image.height);
        for c in 0..3 {
            for i in 0..image.width * image.height {
                out.channels[c][i] = blend::blend_sample(mode, image.channels[c][i], reference.channels[c][i], fg_alpha[i], bg_alpha[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            do_ycbcr: false,
            xyb_encoded: false,
            upsampling_factor: 1,
            gaborish: false,
            epf_iters: 0,
            inject_noise: false,
        }
    }

    #[test]
    fn disabled_stages_are_no_ops() {
        let pipeline = Pipeline::new(settings());
        let mut image = Image::new(4, 4);
        image.channels[0] = vec![1.0; 16];
        pipeline.apply_gaborish(&mut image, [[0.1, 0.05]; 3]);
        assert!(image.channels[0].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn upsample_full_with_factor_one_is_a_copy() {
        let pipeline = Pipeline::new(settings());
        let mut image = Image::new(2, 2);
        image.channels[0] = vec![1.0, 2.0, 3.0, 4.0];
        let out = pipeline.upsample_full(&image, &[]);
        assert_eq!(out.channels[0], image.channels[0]);
    }
}
