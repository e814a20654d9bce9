use crate::bounds::Canvas;
use crate::error::{DiagramError, DiagramResult};
use crate::geometry::Point;
use crate::scalar::Scalar;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How `fill_canvas` places its sites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Uniform samples over the canvas, inserted in sampling order.
    #[default]
    Random,
    /// Rows of sites where every other row is shifted by half a spacing.
    Hex,
    /// A regular grid of sites.
    Square,
}

impl Distribution {
    pub const ALL: [Distribution; 3] = [Distribution::Random, Distribution::Hex, Distribution::Square];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Random => "random",
            Distribution::Hex => "hex",
            Distribution::Square => "square",
        }
    }

    /// Generates `count` sites inside the canvas.
    ///
    /// Lattice sites are pairwise distinct and returned in shuffled order.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        count: usize,
        canvas: &Canvas,
        rng: &mut R,
    ) -> DiagramResult<Vec<Point>> {
        match self {
            Distribution::Random => random_sites(count, canvas, rng),
            Distribution::Hex => {
                let mut sites = lattice_sites(count, canvas, true)?;
                sites.shuffle(rng);
                Ok(sites)
            }
            Distribution::Square => {
                let mut sites = lattice_sites(count, canvas, false)?;
                sites.shuffle(rng);
                Ok(sites)
            }
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Distribution::Random),
            "hex" => Ok(Distribution::Hex),
            "square" => Ok(Distribution::Square),
            other => Err(DiagramError::InvalidInput(format!(
                "unknown distribution '{other}', expected random, hex or square"
            ))),
        }
    }
}

fn random_sites<R: Rng + ?Sized>(count: usize, canvas: &Canvas, rng: &mut R) -> DiagramResult<Vec<Point>> {
    let w = f64::from(canvas.width());
    let h = f64::from(canvas.height());
    let mut sites = Vec::with_capacity(count);
    for _ in 0..count {
        let x = rng.r#gen::<f64>() * w;
        let y = rng.r#gen::<f64>() * h;
        sites.push(Point::from_f64(x, y)?);
    }
    Ok(sites)
}

/// Columns and rows of the smallest grid holding `count` cells of roughly square shape.
pub(crate) fn grid_dimensions(count: usize, width: u32, height: u32) -> (usize, usize) {
    let ratio = count as f64 * f64::from(width) / f64::from(height);
    let cols = (ratio.sqrt().ceil() as usize).max(1);
    let rows = count.div_ceil(cols).max(1);
    (cols, rows)
}

fn lattice_sites(count: usize, canvas: &Canvas, hex: bool) -> DiagramResult<Vec<Point>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let (cols, rows) = grid_dimensions(count, canvas.width(), canvas.height());
    let dx = canvas.width_scalar().checked_div(&Scalar::from(cols as i64))?;
    let dy = canvas.height_scalar().checked_div(&Scalar::from(rows as i64))?;

    let half = Scalar::one().checked_div(&Scalar::two())?;
    let quarter = Scalar::one().checked_div(&Scalar::from(4))?;
    let three_quarters = Scalar::from(3).checked_div(&Scalar::from(4))?;

    let mut sites = Vec::with_capacity(count);
    for i in 0..count {
        let (row, col) = (i / cols, i % cols);
        let offset = match (hex, row % 2) {
            (false, _) => &half,
            (true, 0) => &quarter,
            (true, _) => &three_quarters,
        };
        let x = &(&Scalar::from(col as i64) + offset) * &dx;
        let y = &(&Scalar::from(row as i64) + &half) * &dy;
        sites.push(Point::new(x, y));
    }
    Ok(sites)
}
