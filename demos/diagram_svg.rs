use plotters::prelude::*;
use vorostep::{Diagram, DiagramConfig, Distribution};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for distribution in Distribution::ALL {
        let filename = format!("diagram_{}.svg", distribution.as_str());
        let config = DiagramConfig::new()
            .with_size(800, 600)
            .with_node_count(40)
            .with_distribution(distribution)
            .with_seed(1);
        render(&filename, &config)?;
    }
    Ok(())
}

fn render(filename: &str, config: &DiagramConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut diagram = Diagram::from_config(config)?;
    diagram.fill_from_config(config)?;

    let (w, h) = (f64::from(config.width), f64::from(config.height));
    let root = SVGBackend::new(filename, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0.0..w, 0.0..h)?;
    // canvas y grows downwards
    let flip = |p: [f64; 2]| (p[0], h - p[1]);

    for cell in diagram.cells() {
        let mut poly: Vec<(f64, f64)> = cell.ring().iter().map(|&p| flip(p)).collect();
        if poly.len() < 3 {
            continue;
        }
        chart.draw_series(std::iter::once(Polygon::new(poly.clone(), BLUE.mix(0.1).filled())))?;
        poly.push(poly[0]);
        chart.draw_series(std::iter::once(PathElement::new(poly, BLACK.mix(0.5))))?;
    }

    let centres: Vec<(f64, f64)> = diagram.cells().iter().map(|c| flip(c.centre().to_f64())).collect();
    chart.draw_series(centres.iter().map(|&p| Circle::new(p, 3, RED.filled())))?;

    root.present()?;
    println!("Output saved to {}", filename);
    Ok(())
}
