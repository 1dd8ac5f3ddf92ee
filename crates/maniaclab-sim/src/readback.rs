//! Human-interpretable readback of the cell grid.
//!
//! The rendering layer is an external collaborator; these functions fill
//! caller-visible scratch buffers instead of uploading to a texture.

use crate::sim::LabSim;

fn unit_clamp(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

impl LabSim {
    /// Map the write buffer to RGBA pixels: blocked cells are blue, the
    /// left half of the grid shows pressure and the right half fog,
    /// both mapped from `[min, max]` to full intensity. With
    /// `thread_regions`, the green channel encodes which worker-pool
    /// share a row belongs to.
    ///
    /// The returned slice is row-major, one `u32` per cell.
    pub fn pressure_rgba(&mut self, min: f64, max: f64, thread_regions: bool) -> &[u32] {
        let width = self.width() as usize;
        let height = self.height() as usize;
        let half = width / 2;
        let workers = self.worker_count;

        let mut pixels = std::mem::take(&mut self.rgba_buffer);
        pixels.resize(width * height, 0);

        {
            let bufs = self.bufs();
            for (i, pixel) in pixels.iter_mut().enumerate() {
                let cell = &bufs.back[i];
                let meta = &bufs.meta[i];
                *pixel = if meta.blocked {
                    0x0000_00FF
                } else {
                    let right = (i % width) >= half;
                    let press = (unit_clamp((f64::from(cell.air_pressure) - min) / (max - min))
                        * 255.0) as u32;
                    let fog = (unit_clamp((f64::from(cell.fog_density) - min) / (max - min))
                        * 255.0) as u32;
                    let value = if right { fog } else { press };
                    if thread_regions {
                        let row = i / width;
                        let region = (row * workers / height * 255 / workers.max(1)) as u32;
                        value | (region << 8) | (value << 16)
                    } else {
                        value | (value << 8) | (value << 16)
                    }
                };
            }
        }

        self.rgba_buffer = pixels;
        &self.rgba_buffer
    }

    /// Raw per-cell data texels from the front buffer:
    /// `[capacity-or-pressure, fog, heat, blocked]`.
    pub fn data_texels(&mut self) -> &[[f32; 4]] {
        let width = self.width() as usize;
        let height = self.height() as usize;

        let mut texels = std::mem::take(&mut self.data_buffer);
        texels.resize(width * height, [0.0; 4]);

        {
            let bufs = self.bufs();
            for (i, texel) in texels.iter_mut().enumerate() {
                let cell = &bufs.front[i];
                let meta = &bufs.meta[i];
                *texel = [
                    if meta.blocked {
                        cell.heat_capacity
                    } else {
                        cell.air_pressure
                    },
                    cell.fog_density,
                    cell.heat_energy,
                    if meta.blocked { 1.0 } else { 0.0 },
                ];
            }
        }

        self.data_buffer = texels;
        &self.data_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SimulationConfig;
    use maniaclab_core::stamp::CellStamp;
    use maniaclab_core::{ObjectArena, Stamp};

    #[test]
    fn rgba_marks_blocked_cells() {
        let mut sim = LabSim::new(10, 10, SimulationConfig::default());
        let stamp = Stamp::new(&CellStamp::from_blocking([true; 25]));
        let id = ObjectArena::new().insert(());
        sim.place_object(2, 2, id, 1.0, 300.0, &stamp);

        let width = sim.width() as usize;
        let rgba = sim.pressure_rgba(0.0, 2.0, false);
        assert_eq!(rgba[3 * width + 3], 0x0000_00FF);
        assert_ne!(rgba[0], 0x0000_00FF);
    }

    #[test]
    fn texels_carry_blocked_flag_and_capacity() {
        let mut sim = LabSim::new(10, 10, SimulationConfig::default());
        let stamp = Stamp::new(&CellStamp::from_blocking([true; 25]));
        let id = ObjectArena::new().insert(());
        sim.place_object(2, 2, id, 4.0, 300.0, &stamp);

        let width = sim.width() as usize;
        let texels = sim.data_texels();
        let blocked = texels[3 * width + 3];
        assert_eq!(blocked[0], 4.0);
        assert_eq!(blocked[3], 1.0);
        let open = texels[0];
        assert_eq!(open[0], 1.0);
        assert_eq!(open[3], 0.0);
    }
}
