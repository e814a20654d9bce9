use crate::bounds::{Canvas, Corner, CornerSet};
use crate::cell::{Cell, CellId};
use crate::config::DiagramConfig;
use crate::distribution::Distribution;
use crate::error::{DiagramError, DiagramResult};
use crate::gate::StepGate;
use crate::geometry::{Point, Segment};
use crate::observer::{DiagramEvent, Observer, Phase, PhasePayload};
use crate::scalar::Scalar;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// State visible to other threads, replaced after every phase change.
#[derive(Debug, Clone)]
struct Published {
    phase: Phase,
    payload: PhasePayload,
    cells: Arc<Vec<Arc<Cell>>>,
    corner_owners: [Option<CellId>; 4],
    node_count: usize,
    target_nodes: usize,
}

#[derive(Debug)]
struct Shared {
    width: u32,
    height: u32,
    published: RwLock<Published>,
    building: AtomicBool,
    gate: StepGate,
}

/// Outcome of [`Diagram::fill_canvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub requested: usize,
    /// Sites that produced a new cell. Duplicates are skipped.
    pub inserted: usize,
    /// The fill stopped early because the step gate was interrupted.
    pub cancelled: bool,
}

/// An incrementally built Voronoi diagram over a rectangular canvas.
///
/// Sites are inserted one at a time with [`Diagram::add_point`]. Every insertion walks
/// through a fixed sequence of [`Phase`]s; after each one the diagram publishes a snapshot,
/// notifies its observers and, unless manual mode is on, waits on its [`StepGate`] until a
/// controller calls `next()`. Other threads follow along through a [`DiagramHandle`].
///
/// A new diagram runs in manual mode, i.e. insertions complete without pausing.
pub struct Diagram {
    canvas: Canvas,
    cells: Vec<Arc<Cell>>,
    corner_owners: [Option<CellId>; 4],
    phase: Phase,
    payload: PhasePayload,
    node_count: usize,
    target_nodes: usize,
    observers: Vec<Box<dyn Observer>>,
    shared: Arc<Shared>,
    rng: StdRng,
}

impl Diagram {
    pub fn new(width: u32, height: u32) -> DiagramResult<Self> {
        let canvas = Canvas::new(width, height)?;
        let published = Published {
            phase: Phase::Starting,
            payload: PhasePayload::default(),
            cells: Arc::new(Vec::new()),
            corner_owners: [None; 4],
            node_count: 0,
            target_nodes: 0,
        };
        let gate = StepGate::new();
        gate.set_bypass(true);
        let shared = Arc::new(Shared {
            width,
            height,
            published: RwLock::new(published),
            building: AtomicBool::new(false),
            gate,
        });

        Ok(Self {
            canvas,
            cells: Vec::new(),
            corner_owners: [None; 4],
            phase: Phase::Starting,
            payload: PhasePayload::default(),
            node_count: 0,
            target_nodes: 0,
            observers: Vec::new(),
            shared,
            rng: StdRng::seed_from_u64(entropy_seed()),
        })
    }

    pub fn from_config(config: &DiagramConfig) -> DiagramResult<Self> {
        config.validate()?;
        let mut diagram = Self::new(config.width, config.height)?;
        diagram.set_manual_mode(config.manual_mode);
        if let Some(seed) = config.seed {
            diagram.reseed(seed);
        }
        Ok(diagram)
    }

    /// Replaces the generator used by [`Diagram::fill_canvas`].
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// A cloneable view for other threads.
    pub fn handle(&self) -> DiagramHandle {
        DiagramHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn gate(&self) -> &StepGate {
        &self.shared.gate
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn cells(&self) -> &[Arc<Cell>] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.0).map(|cell| cell.as_ref())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn payload(&self) -> &PhasePayload {
        &self.payload
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn target_nodes(&self) -> usize {
        self.target_nodes
    }

    pub fn set_target_nodes(&mut self, target: usize) {
        self.target_nodes = target;
    }

    pub fn corner_owner(&self, corner: Corner) -> Option<CellId> {
        self.corner_owners[corner.index()]
    }

    /// Corners whose nearest site is the centre of cell `id`.
    pub fn owned_corners(&self, id: CellId) -> CornerSet {
        Corner::ALL
            .into_iter()
            .filter(|corner| self.corner_owners[corner.index()] == Some(id))
            .collect()
    }

    pub fn is_manual(&self) -> bool {
        self.shared.gate.is_bypassed()
    }

    /// Manual mode skips the step gate. Turning it on releases a pending step.
    pub fn set_manual_mode(&self, manual: bool) {
        self.handle().set_manual_mode(manual);
    }

    /// Inserts a site. Returns `Ok(false)` if a cell with that centre already exists.
    pub fn add_point(&mut self, point: Point) -> DiagramResult<bool> {
        if self.cells.iter().any(|cell| *cell.centre() == point) {
            warn!(%point, "site already present, ignoring");
            return Ok(false);
        }
        let owners = self.corner_owners;
        let before = self.cells.len();
        let result = self.while_building(|diagram| diagram.insert(point));
        if let Err(err) = result {
            // an unappended cell cannot own corners
            if self.cells.len() == before {
                self.corner_owners = owners;
                self.shared
                    .published
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .corner_owners = owners;
            }
            return Err(err);
        }
        Ok(true)
    }

    pub fn add_point_f64(&mut self, x: f64, y: f64) -> DiagramResult<bool> {
        self.add_point(Point::from_f64(x, y)?)
    }

    /// Inserts `count` generated sites, stopping early if the gate is interrupted.
    pub fn fill_canvas(&mut self, count: usize, distribution: Distribution) -> DiagramResult<FillReport> {
        let sites = distribution.generate(count, &self.canvas, &mut self.rng)?;
        self.target_nodes = self.node_count + sites.len();
        info!(count, %distribution, "filling canvas");

        let before = self.cells.len();
        self.while_building(|diagram| {
            let mut cancelled = false;
            for site in sites {
                match diagram.add_point(site) {
                    Ok(_) => {}
                    Err(DiagramError::Interrupted) => {
                        warn!(inserted = diagram.cells.len() - before, "fill cancelled");
                        cancelled = true;
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(FillReport {
                requested: count,
                inserted: diagram.cells.len() - before,
                cancelled,
            })
        })
    }

    pub fn fill_from_config(&mut self, config: &DiagramConfig) -> DiagramResult<FillReport> {
        self.fill_canvas(config.node_count, config.distribution)
    }

    /// Checks that every cell is a single closed cycle.
    pub fn validate(&self) -> DiagramResult<()> {
        let open: Vec<CellId> = self
            .cells
            .par_iter()
            .filter(|cell| !cell.is_closed())
            .map(|cell| cell.id())
            .collect();
        if open.is_empty() {
            Ok(())
        } else {
            Err(DiagramError::degenerate(
                "validate",
                format!("{} cells are not closed: {:?}", open.len(), open),
            ))
        }
    }

    fn while_building<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let nested = self.shared.building.swap(true, Ordering::AcqRel);
        let result = f(self);
        if !nested {
            self.shared.building.store(false, Ordering::Release);
        }
        result
    }

    fn insert(&mut self, point: Point) -> DiagramResult<()> {
        self.node_count += 1;
        self.payload = PhasePayload {
            adding_point: Some(point.clone()),
            ..PhasePayload::default()
        };
        self.transition(Phase::AddPointStart)?;

        let id = CellId(self.cells.len());
        if self.cells.is_empty() {
            self.cells.push(Arc::new(Cell::with_border(id, point, &self.canvas)));
            self.corner_owners = [Some(id); 4];
            info!(cell = %id, "first cell spans the canvas");
            return self.transition(Phase::Done);
        }

        self.claim_corners(id, &point);
        let mut new_cell = Arc::new(Cell::new(id, point.clone()));
        self.payload.adding_cell = Some(Arc::clone(&new_cell));

        for index in self.nearest_order(&point) {
            if new_cell.is_complete_without_edges(&self.canvas, self.owned_corners(id)) {
                debug!(cell = %id, "new cell complete, stopping early");
                break;
            }

            let bisection = self.cells[index].bisection(&point, &self.canvas)?;
            let Some(chord) = self.cells[index].intersections(&bisection)? else {
                continue;
            };
            debug!(cell = %id, neighbour = %self.cells[index].id(), %chord, "found shared edge");

            self.payload.bisection = Some(chord.clone());
            self.transition(Phase::GettingBisection)?;

            self.payload.trimming_cell = Some(Arc::clone(&self.cells[index]));
            self.transition(Phase::TrimmingBefore)?;

            Arc::make_mut(&mut self.cells[index]).trim(&chord);
            self.payload.trimming_cell = Some(Arc::clone(&self.cells[index]));
            self.transition(Phase::TrimmingAfter)?;

            Arc::make_mut(&mut new_cell).add_edge(chord);
            self.payload.adding_cell = Some(Arc::clone(&new_cell));
        }

        self.payload.bisection = None;
        self.payload.trimming_cell = None;
        self.payload.adding_cell = Some(Arc::clone(&new_cell));
        self.transition(Phase::DoneWithoutBorder)?;

        let owned = self.owned_corners(id);
        Arc::make_mut(&mut new_cell).join_with_border(&self.canvas, owned);
        self.payload.adding_cell = Some(Arc::clone(&new_cell));
        self.transition(Phase::JoiningWithBorder)?;

        info!(cell = %id, edges = new_cell.edges().len(), "cell finished");
        self.cells.push(new_cell);
        self.payload.adding_cell = None;
        self.transition(Phase::Done)
    }

    fn claim_corners(&mut self, id: CellId, point: &Point) {
        for corner in Corner::ALL {
            let target = self.canvas.corner(corner);
            let closer = match self.corner_owners[corner.index()] {
                Some(owner) => {
                    point.distance_squared(&target) < self.cells[owner.0].centre().distance_squared(&target)
                }
                None => true,
            };
            if closer {
                debug!(cell = %id, ?corner, "corner changes owner");
                self.corner_owners[corner.index()] = Some(id);
            }
        }
    }

    /// Indices of existing cells by ascending exact distance to `point`, ties by insertion order.
    fn nearest_order(&self, point: &Point) -> Vec<usize> {
        let mut order: Vec<(Scalar, usize)> = self
            .cells
            .par_iter()
            .enumerate()
            .map(|(i, cell)| (cell.centre().distance_squared(point), i))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        order.into_iter().map(|(_, i)| i).collect()
    }

    fn transition(&mut self, phase: Phase) -> DiagramResult<()> {
        self.phase = phase;
        debug!(%phase, node = self.node_count, "phase change");

        {
            let mut published = self
                .shared
                .published
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *published = Published {
                phase,
                payload: self.payload.clone(),
                cells: Arc::new(self.cells.clone()),
                corner_owners: self.corner_owners,
                node_count: self.node_count,
                target_nodes: self.target_nodes,
            };
        }

        let event = DiagramEvent {
            phase,
            payload: self.payload.clone(),
            node_count: self.node_count,
            target_nodes: self.target_nodes,
        };
        for observer in &mut self.observers {
            observer.on_diagram_changed(&event);
        }

        self.shared.gate.hold()?;
        Ok(())
    }
}

/// Read access to a diagram from other threads, plus the controls for stepping it.
#[derive(Clone, Debug)]
pub struct DiagramHandle {
    shared: Arc<Shared>,
}

impl DiagramHandle {
    fn read(&self) -> RwLockReadGuard<'_, Published> {
        self.shared.published.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u32 {
        self.shared.width
    }

    pub fn height(&self) -> u32 {
        self.shared.height
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    /// Cells as of the last published phase.
    pub fn cells(&self) -> Arc<Vec<Arc<Cell>>> {
        Arc::clone(&self.read().cells)
    }

    pub fn payload(&self) -> PhasePayload {
        self.read().payload.clone()
    }

    pub fn bisection(&self) -> Option<Segment> {
        self.read().payload.bisection.clone()
    }

    pub fn trimming_cell(&self) -> Option<Arc<Cell>> {
        self.read().payload.trimming_cell.clone()
    }

    pub fn adding_point(&self) -> Option<Point> {
        self.read().payload.adding_point.clone()
    }

    pub fn adding_cell(&self) -> Option<Arc<Cell>> {
        self.read().payload.adding_cell.clone()
    }

    pub fn corner_owner(&self, corner: Corner) -> Option<CellId> {
        self.read().corner_owners[corner.index()]
    }

    pub fn node_count(&self) -> usize {
        self.read().node_count
    }

    pub fn target_nodes(&self) -> usize {
        self.read().target_nodes
    }

    pub fn is_manual(&self) -> bool {
        self.shared.gate.is_bypassed()
    }

    /// Whether an insertion or fill is in progress.
    pub fn is_building(&self) -> bool {
        self.shared.building.load(Ordering::Acquire)
    }

    pub fn set_manual_mode(&self, manual: bool) {
        self.shared.gate.set_bypass(manual);
    }

    /// Advances the builder by one phase. Returns `false` if it was not waiting.
    pub fn next_step(&self) -> bool {
        self.shared.gate.next()
    }

    /// Waits until the builder is paused on a phase.
    pub fn wait_for_step(&self, timeout: Duration) -> bool {
        self.shared.gate.wait_for_holder(timeout)
    }

    /// Aborts the running insertion. The diagram keeps its partial state.
    pub fn cancel(&self) {
        warn!("cancelling diagram construction");
        self.shared.gate.interrupt();
    }

    /// Allows stepping again after [`DiagramHandle::cancel`].
    pub fn resume(&self) {
        self.shared.gate.resume();
    }

    pub fn gate(&self) -> &StepGate {
        &self.shared.gate
    }
}

fn entropy_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Math::random() * 4294967296.0) as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        rand::random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventLog;
    use std::thread;

    fn pt(x: i32, y: i32) -> Point {
        Point::from((x, y))
    }

    fn seg(x1: i32, y1: i32, x2: i32, y2: i32) -> Segment {
        Segment::new(pt(x1, y1), pt(x2, y2))
    }

    #[test]
    fn test_single_site_fills_canvas() {
        let mut diagram = Diagram::new(200, 200).unwrap();
        let log = EventLog::new();
        diagram.subscribe(log.clone());

        assert!(diagram.add_point(pt(100, 100)).unwrap());
        assert_eq!(diagram.cells().len(), 1);
        let cell = &diagram.cells()[0];
        assert_eq!(cell.edges().len(), 4);
        assert!(cell.is_closed());
        assert!((cell.area() - 40000.0).abs() < 1e-6);
        assert_eq!(diagram.owned_corners(CellId(0)), CornerSet::all());
        assert_eq!(log.phases(), vec![Phase::AddPointStart, Phase::Done]);
        assert_eq!(diagram.phase(), Phase::Done);
    }

    #[test]
    fn test_two_sites_split_on_diagonal() {
        let mut diagram = Diagram::new(200, 200).unwrap();
        let log = EventLog::new();
        diagram.add_point(pt(50, 50)).unwrap();
        diagram.subscribe(log.clone());
        diagram.add_point(pt(150, 150)).unwrap();

        let events = log.drain();
        let bisection = events
            .iter()
            .find(|e| e.phase == Phase::GettingBisection)
            .and_then(|e| e.payload.bisection.clone())
            .unwrap();
        assert_eq!(bisection, seg(200, 0, 0, 200));

        let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::AddPointStart,
                Phase::GettingBisection,
                Phase::TrimmingBefore,
                Phase::TrimmingAfter,
                Phase::DoneWithoutBorder,
                Phase::JoiningWithBorder,
                Phase::Done,
            ]
        );

        assert_eq!(diagram.corner_owner(Corner::TopLeft), Some(CellId(0)));
        assert_eq!(diagram.corner_owner(Corner::BottomRight), Some(CellId(1)));
        // equidistant corners stay with the earlier cell
        assert_eq!(diagram.corner_owner(Corner::TopRight), Some(CellId(0)));
        assert_eq!(diagram.corner_owner(Corner::BottomLeft), Some(CellId(0)));

        for cell in diagram.cells() {
            assert!(cell.is_closed());
            assert!((cell.area() - 20000.0).abs() < 1e-6);
        }
        assert!(diagram.validate().is_ok());
    }

    #[test]
    fn test_duplicate_site_is_ignored() {
        let mut diagram = Diagram::new(300, 200).unwrap();
        diagram.add_point(pt(10, 20)).unwrap();
        diagram.add_point(pt(200, 120)).unwrap();
        let before: Vec<Cell> = diagram.cells().iter().map(|c| Cell::clone(c)).collect();

        let log = EventLog::new();
        diagram.subscribe(log.clone());
        assert!(!diagram.add_point(pt(200, 120)).unwrap());
        assert!(!diagram.add_point_f64(10.000001, 20.0).unwrap());

        assert!(log.is_empty());
        assert_eq!(diagram.node_count(), 2);
        let after: Vec<Cell> = diagram.cells().iter().map(|c| Cell::clone(c)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_handle_sees_published_cells() {
        let mut diagram = Diagram::new(100, 100).unwrap();
        let handle = diagram.handle();
        assert_eq!(handle.phase(), Phase::Starting);
        assert!(handle.cells().is_empty());

        diagram.add_point(pt(20, 20)).unwrap();
        diagram.add_point(pt(70, 60)).unwrap();
        assert_eq!(handle.cells().len(), 2);
        assert_eq!(handle.node_count(), 2);
        assert_eq!(handle.phase(), Phase::Done);
        assert!(handle.adding_cell().is_none());
        assert_eq!(handle.adding_point(), Some(pt(70, 60)));
        assert!(!handle.is_building());
    }

    #[test]
    fn test_snapshots_are_not_mutated_by_later_trims() {
        let mut diagram = Diagram::new(200, 200).unwrap();
        diagram.add_point(pt(100, 100)).unwrap();
        let snapshot = diagram.handle().cells();
        diagram.add_point(pt(150, 100)).unwrap();

        assert_eq!(snapshot[0].edges().len(), 4);
        assert!((snapshot[0].area() - 40000.0).abs() < 1e-6);
        assert!((diagram.cells()[0].area() - 25000.0).abs() < 1e-6);
    }

    #[test]
    fn test_stepped_insertion() {
        let mut diagram = Diagram::new(200, 200).unwrap();
        diagram.add_point(pt(50, 50)).unwrap();
        diagram.set_manual_mode(false);
        let handle = diagram.handle();

        let builder = thread::spawn(move || {
            diagram.add_point(pt(150, 150)).unwrap();
            diagram
        });

        let mut seen = Vec::new();
        while seen.last() != Some(&Phase::Done) {
            assert!(handle.wait_for_step(Duration::from_secs(10)));
            seen.push(handle.phase());
            assert!(handle.next_step());
        }

        let diagram = builder.join().unwrap();
        assert_eq!(seen.len(), 7);
        assert_eq!(seen[0], Phase::AddPointStart);
        assert_eq!(diagram.cells().len(), 2);
    }

    #[test]
    fn test_cancel_keeps_partial_state() {
        let mut diagram = Diagram::new(200, 200).unwrap();
        diagram.add_point(pt(50, 50)).unwrap();
        diagram.set_manual_mode(false);
        let handle = diagram.handle();

        let builder = thread::spawn(move || {
            let result = diagram.add_point(pt(150, 150));
            (diagram, result)
        });

        // let the builder reach the trimming step, then cancel
        for _ in 0..3 {
            assert!(handle.wait_for_step(Duration::from_secs(10)));
            handle.next_step();
        }
        assert!(handle.wait_for_step(Duration::from_secs(10)));
        assert_eq!(handle.phase(), Phase::TrimmingAfter);
        handle.cancel();

        let (diagram, result) = builder.join().unwrap();
        assert!(matches!(result, Err(DiagramError::Interrupted)));
        // the first cell was trimmed, the new cell never got appended
        assert_eq!(diagram.cells().len(), 1);
        assert!((diagram.cells()[0].area() - 20000.0).abs() < 1e-6);
        assert_eq!(handle.cells().len(), 1);
        assert_eq!(diagram.corner_owner(Corner::BottomRight), Some(CellId(0)));
        assert_eq!(handle.corner_owner(Corner::BottomRight), Some(CellId(0)));
    }

    #[test]
    fn test_fill_canvas_square() {
        let mut diagram = Diagram::from_config(&DiagramConfig::new().with_size(300, 200).with_seed(3)).unwrap();
        let report = diagram.fill_canvas(12, Distribution::Square).unwrap();
        assert_eq!(report, FillReport { requested: 12, inserted: 12, cancelled: false });
        assert_eq!(diagram.cells().len(), 12);
        assert_eq!(diagram.target_nodes(), 12);
        assert!(diagram.validate().is_ok());
        let total: f64 = diagram.cells().iter().map(|c| c.area()).sum();
        assert!((total - 60000.0).abs() < 1e-3);
    }

    #[test]
    fn test_from_config_rejects_empty_canvas() {
        let config = DiagramConfig::new().with_size(0, 10);
        assert!(matches!(Diagram::from_config(&config), Err(DiagramError::InvalidInput(_))));
        assert!(Diagram::new(10, 0).is_err());
    }
}
