use super::generic::LensModel;
use crate::calibration::LensCalibration;
use nalgebra as na;

/// Radial-tangential lens model with OpenCV coefficient order `k1 k2 p1 p2 k3`.
pub struct BrownConrady {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub width: u32,
    pub height: u32,
}

impl BrownConrady {
    pub fn new(
        camera_matrix: &na::Matrix3<f64>,
        distortion: &[f64; 5],
        width: u32,
        height: u32,
    ) -> BrownConrady {
        BrownConrady {
            fx: camera_matrix[(0, 0)],
            fy: camera_matrix[(1, 1)],
            cx: camera_matrix[(0, 2)],
            cy: camera_matrix[(1, 2)],
            k1: distortion[0],
            k2: distortion[1],
            p1: distortion[2],
            p2: distortion[3],
            k3: distortion[4],
            width,
            height,
        }
    }

    pub fn from_calibration(calib: &LensCalibration, width: u32, height: u32) -> BrownConrady {
        Self::new(&calib.camera_matrix(), &calib.distortion, width, height)
    }
}

impl LensModel for BrownConrady {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }

    fn distort_one(&self, p: &na::Vector2<f64>) -> na::Vector2<f64> {
        let xn = (p[0] - self.cx) / self.fx;
        let yn = (p[1] - self.cy) / self.fy;
        let r2 = xn * xn + yn * yn;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let xd = xn * radial + 2.0 * self.p1 * xn * yn + self.p2 * (r2 + 2.0 * xn * xn);
        let yd = yn * radial + self.p1 * (r2 + 2.0 * yn * yn) + 2.0 * self.p2 * xn * yn;
        na::Vector2::new(self.fx * xd + self.cx, self.fy * yd + self.cy)
    }
}
