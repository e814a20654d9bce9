use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vorostep::{Diagram, DiagramEvent, Distribution, Phase, Player, Point};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut diagram = Diagram::new(400, 300)?;
    diagram.reseed(9);
    diagram.fill_canvas(6, Distribution::Random)?;
    diagram.subscribe(|event: &DiagramEvent| {
        println!("{:>20}  node {}/{}", event.phase, event.node_count, event.target_nodes);
    });

    // Walk one insertion by hand.
    diagram.set_manual_mode(false);
    let handle = diagram.handle();
    let builder = thread::spawn(move || {
        let inserted = diagram.add_point(Point::from((200, 150)));
        (diagram, inserted)
    });

    while handle.wait_for_step(Duration::from_secs(5)) {
        match handle.phase() {
            Phase::GettingBisection | Phase::TrimmingBefore | Phase::TrimmingAfter => {
                if let (Some(bisection), Some(cell)) = (handle.bisection(), handle.trimming_cell()) {
                    println!("{:>20}  {} against cell {}", "", bisection, cell.id());
                }
            }
            Phase::Done => {
                handle.next_step();
                break;
            }
            _ => {}
        }
        handle.next_step();
    }
    let (mut diagram, inserted) = builder.join().map_err(|_| "builder panicked")?;
    inserted?;

    // Let a player animate the rest.
    let player = Player::spawn(diagram.handle(), Duration::from_millis(10));
    let builder = thread::spawn(move || {
        let report = diagram.fill_canvas(10, Distribution::Hex);
        (diagram, report)
    });
    let (diagram, report) = builder.join().map_err(|_| "builder panicked")?;
    let steps = player.stop();
    println!("{:?} in {} steps, {} cells", report?, steps, diagram.cells().len());

    diagram.validate()?;
    Ok(())
}
