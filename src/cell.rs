use crate::bounds::{Canvas, CornerSet, Side};
use crate::error::{DiagramError, DiagramResult};
use crate::geometry::{Point, Segment};
use crate::scalar::Scalar;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Identifier of a cell: its insertion index in the diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub usize);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A Voronoi cell: a site plus the unordered segments bounding its region.
///
/// Edges are mutated while later sites are inserted. Once the diagram reports the cell as
/// finished, its edges form exactly one closed cycle.
#[derive(Clone, Debug)]
pub struct Cell {
    id: CellId,
    centre: Point,
    edges: Vec<Segment>,
    // Vertices sorted by bearing, rebuilt lazily after any edge change.
    ring: OnceLock<Vec<[f64; 2]>>,
}

impl Cell {
    pub fn new(id: CellId, centre: Point) -> Self {
        Self {
            id,
            centre,
            edges: Vec::new(),
            ring: OnceLock::new(),
        }
    }

    /// A cell spanning the whole canvas, used for the very first site.
    pub fn with_border(id: CellId, centre: Point, canvas: &Canvas) -> Self {
        let mut cell = Self::new(id, centre);
        cell.edges = canvas.border_edges();
        cell
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn centre(&self) -> &Point {
        &self.centre
    }

    pub fn edges(&self) -> &[Segment] {
        &self.edges
    }

    pub fn add_edge(&mut self, edge: Segment) {
        self.edges.push(edge);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.ring.take();
    }

    /// Perpendicular bisector between the centre and `point`, spanning the canvas.
    pub fn bisection(&self, point: &Point, canvas: &Canvas) -> DiagramResult<Segment> {
        let two = Scalar::two();
        let zero = Scalar::zero();
        let (w, h) = (canvas.width_scalar(), canvas.height_scalar());
        let c = &self.centre;

        let mid_x = (&point.x + &c.x).checked_div(&two)?;
        let mid_y = (&point.y + &c.y).checked_div(&two)?;

        if point.y == c.y {
            return Ok(Segment::new(
                Point::new(mid_x.clone(), zero),
                Point::new(mid_x, h.clone()),
            ));
        }

        let dx = &point.x - &c.x;
        let dy = &point.y - &c.y;
        let slope = (-dx).checked_div(&dy)?;
        let offset = &mid_y - &(&slope * &mid_x);

        if slope.abs() > Scalar::one() {
            let top_x = (-&offset).checked_div(&slope)?;
            let bottom_x = (h - &offset).checked_div(&slope)?;
            Ok(Segment::new(
                Point::new(top_x, zero),
                Point::new(bottom_x, h.clone()),
            ))
        } else {
            let right_y = &(&slope * w) + &offset;
            Ok(Segment::new(
                Point::new(zero, offset),
                Point::new(w.clone(), right_y),
            ))
        }
    }

    /// The part of `bisection` that lies inside this cell, if any.
    ///
    /// Returns `Ok(None)` when the bisection misses the cell or only touches one vertex.
    pub fn intersections(&self, bisection: &Segment) -> DiagramResult<Option<Segment>> {
        let crossing: Vec<&Segment> = self
            .edges
            .iter()
            .filter(|edge| edge.intersects(bisection))
            .collect();

        match crossing.len() {
            0 | 1 => Ok(None),
            2 => {
                let a = bisection.intersection_point(crossing[0]);
                let b = bisection.intersection_point(crossing[1]);
                Ok(match (a, b) {
                    (Some(a), Some(b)) if a != b => Some(Segment::new(a, b)),
                    _ => None,
                })
            }
            3 | 4 => self.chord_through_vertices(bisection, &crossing),
            n => Err(DiagramError::degenerate(
                "intersections",
                format!("bisection {bisection} crosses {n} edges of cell {}", self.id),
            )),
        }
    }

    // The bisection passes through one or more vertices, so several edges report a crossing.
    fn chord_through_vertices(
        &self,
        bisection: &Segment,
        crossing: &[&Segment],
    ) -> DiagramResult<Option<Segment>> {
        let mut vertices: Vec<Point> = Vec::new();
        for edge in crossing {
            for p in edge.endpoints() {
                push_unique(&mut vertices, p.clone());
            }
        }

        let mut on_line = Vec::new();
        for p in vertices {
            if bisection.distance_to(&p)?.is_zero() {
                on_line.push(p);
            }
        }

        match on_line.len() {
            2 => {
                let b = on_line.pop();
                let a = on_line.pop();
                if let (Some(a), Some(b)) = (a, b) {
                    return Ok(Some(Segment::new(a, b)));
                }
            }
            1 => {
                let v = &on_line[0];
                if let Some(edge) = crossing.iter().find(|edge| !edge.has_endpoint(v)) {
                    if let Some(q) = edge.intersection_point(bisection) {
                        if q != *v {
                            return Ok(Some(Segment::new(v.clone(), q)));
                        }
                    }
                }
            }
            0 => {}
            n => {
                return Err(DiagramError::degenerate(
                    "intersections",
                    format!("{n} vertices of cell {} lie on bisection {bisection}", self.id),
                ));
            }
        }

        let mut points: Vec<Point> = Vec::new();
        for edge in crossing {
            if let Some(q) = bisection.intersection_point(edge) {
                push_unique(&mut points, q);
            }
        }
        match points.len() {
            0 | 1 => Ok(None),
            2 => {
                let b = points.pop();
                let a = points.pop();
                Ok(a.zip(b).map(|(a, b)| Segment::new(a, b)))
            }
            n => Err(DiagramError::degenerate(
                "intersections",
                format!("bisection {bisection} meets cell {} in {n} points", self.id),
            )),
        }
    }

    /// Cuts the cell along `chord`, dropping the side away from the centre, then adds the chord.
    pub fn trim(&mut self, chord: &Segment) {
        let before = self.edges.len();
        let mut kept = Vec::with_capacity(before + 1);

        for edge in std::mem::take(&mut self.edges) {
            let first_cut = Segment::new(edge.p1.clone(), self.centre.clone()).intersects(chord);
            let second_cut = Segment::new(edge.p2.clone(), self.centre.clone()).intersects(chord);

            match (first_cut, second_cut) {
                (true, true) => {}
                (false, false) => kept.push(edge),
                _ => {
                    let end = if edge.contains(&chord.p1) { &chord.p1 } else { &chord.p2 };
                    let keep = if first_cut { edge.p2 } else { edge.p1 };
                    if keep != *end {
                        kept.push(Segment::new(keep, end.clone()));
                    }
                }
            }
        }

        kept.push(chord.clone());
        self.edges = kept;
        self.invalidate();
        debug!(cell = %self.id, chord = %chord, before, after = self.edges.len(), "trimmed cell");
    }

    /// Whether the cell only needs border segments to close.
    ///
    /// Every canvas side must be touched by an even number of edges, counting each owned corner
    /// on that side once, and every dangling vertex must lie on the border.
    pub fn is_complete_without_edges(&self, canvas: &Canvas, owned: CornerSet) -> bool {
        if self.edges.is_empty() {
            return false;
        }

        let mut touches = [0usize; 4];
        for corner in owned.iter() {
            for side in corner.sides() {
                touches[side.index()] += 1;
            }
        }
        for edge in &self.edges {
            for side in Side::ALL {
                if canvas.on_side(side, &edge.p1) || canvas.on_side(side, &edge.p2) {
                    touches[side.index()] += 1;
                }
            }
        }
        if touches.iter().any(|count| count % 2 != 0) {
            return false;
        }

        self.unjoined().iter().all(|p| canvas.on_border(p))
    }

    /// Endpoints that no other edge shares.
    pub fn unjoined(&self) -> Vec<Point> {
        let mut dangling = Vec::new();
        for (i, edge) in self.edges.iter().enumerate() {
            for p in edge.endpoints() {
                let joined = self
                    .edges
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.has_endpoint(p));
                if !joined {
                    dangling.push(p.clone());
                }
            }
        }
        dangling
    }

    /// Distinct vertices lying on the canvas border.
    pub fn on_border(&self, canvas: &Canvas) -> Vec<Point> {
        let mut points = Vec::new();
        for edge in &self.edges {
            for p in edge.endpoints() {
                if canvas.on_border(p) {
                    push_unique(&mut points, p.clone());
                }
            }
        }
        points
    }

    /// Closes the cell along the canvas border and returns the segments added.
    ///
    /// On each side, the owned corners and dangling vertices of that side are sorted along it
    /// and joined in consecutive pairs.
    pub fn join_with_border(&mut self, canvas: &Canvas, owned: CornerSet) -> Vec<Segment> {
        let mut per_side: [Vec<Point>; 4] = Default::default();
        for corner in owned.iter() {
            for side in corner.sides() {
                push_unique(&mut per_side[side.index()], canvas.corner(corner));
            }
        }
        for p in self.unjoined() {
            for side in canvas.sides_of(&p) {
                push_unique(&mut per_side[side.index()], p.clone());
            }
        }

        let mut added: Vec<Segment> = Vec::new();
        for side in Side::ALL {
            let points = &mut per_side[side.index()];
            points.sort_by(|a, b| side.along(a).total_cmp(side.along(b)));
            if points.len() % 2 != 0 {
                debug!(cell = %self.id, ?side, count = points.len(), "odd number of border points");
            }
            for pair in points.chunks_exact(2) {
                let segment = Segment::new(pair[0].clone(), pair[1].clone());
                if !self.edges.contains(&segment) && !added.contains(&segment) {
                    added.push(segment);
                }
            }
        }

        if !added.is_empty() {
            self.edges.extend(added.iter().cloned());
            self.invalidate();
        }
        debug!(cell = %self.id, added = added.len(), "joined cell with border");
        added
    }

    /// Removes repeated edges and returns how many were dropped.
    pub fn dedup_edges(&mut self) -> usize {
        let before = self.edges.len();
        let mut unique: Vec<Segment> = Vec::with_capacity(before);
        for edge in std::mem::take(&mut self.edges) {
            if !unique.contains(&edge) {
                unique.push(edge);
            }
        }
        self.edges = unique;
        let removed = before - self.edges.len();
        if removed > 0 {
            self.invalidate();
        }
        removed
    }

    /// Whether the edges form exactly one cycle in which every vertex has degree two.
    pub fn is_closed(&self) -> bool {
        if self.edges.len() < 3 {
            return false;
        }

        let mut vertices: Vec<Point> = Vec::new();
        let mut adjacency: Vec<Vec<usize>> = Vec::new();
        for edge in &self.edges {
            let a = vertex_index(&mut vertices, &edge.p1);
            let b = vertex_index(&mut vertices, &edge.p2);
            if a == b {
                return false;
            }
            adjacency.resize(vertices.len(), Vec::new());
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        if adjacency.iter().any(|n| n.len() != 2) {
            return false;
        }

        let mut prev = 0;
        let mut current = adjacency[0][0];
        let mut steps = 1;
        while current != 0 {
            let next = if adjacency[current][0] == prev {
                adjacency[current][1]
            } else {
                adjacency[current][0]
            };
            prev = current;
            current = next;
            steps += 1;
            if steps > vertices.len() {
                return false;
            }
        }
        steps == vertices.len()
    }

    /// Distinct vertices sorted by descending bearing around their mean.
    ///
    /// The site may itself be a vertex (a site on a canvas corner), so bearings are not taken
    /// from the centre.
    pub fn ring(&self) -> &[[f64; 2]] {
        self.ring.get_or_init(|| self.build_ring())
    }

    fn build_ring(&self) -> Vec<[f64; 2]> {
        let mut vertices: Vec<Point> = Vec::new();
        for edge in &self.edges {
            for p in edge.endpoints() {
                push_unique(&mut vertices, p.clone());
            }
        }

        let points: Vec<[f64; 2]> = vertices.iter().map(Point::to_f64).collect();
        if points.is_empty() {
            return points;
        }
        let n = points.len() as f64;
        let cx = points.iter().map(|v| v[0]).sum::<f64>() / n;
        let cy = points.iter().map(|v| v[1]).sum::<f64>() / n;
        let mut ring: Vec<([f64; 2], f64)> = points
            .into_iter()
            .map(|v| (v, (v[1] - cy).atan2(v[0] - cx)))
            .collect();
        ring.sort_by(|a, b| b.1.total_cmp(&a.1));
        ring.into_iter().map(|(v, _)| v).collect()
    }

    pub fn area(&self) -> f64 {
        let ring = self.ring();
        let n = ring.len();
        if n < 3 { return 0.0; }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += ring[i][0] * ring[j][1] - ring[j][0] * ring[i][1];
        }
        (area * 0.5).abs()
    }

    pub fn centroid(&self) -> [f64; 2] {
        let ring = self.ring();
        let n = ring.len();
        if n < 3 { return self.centre.to_f64(); }

        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            let cross = ring[i][0] * ring[j][1] - ring[j][0] * ring[i][1];
            area += cross;
            cx += (ring[i][0] + ring[j][0]) * cross;
            cy += (ring[i][1] + ring[j][1]) * cross;
        }

        if area.abs() < 1e-9 {
            return self.centre.to_f64();
        }

        let factor = 1.0 / (3.0 * area);
        [cx * factor, cy * factor]
    }

    /// Even-odd test against the rendered ring.
    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        let ring = self.ring();
        let n = ring.len();
        if n < 3 { return false; }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (ring[i][0], ring[i][1]);
            let (xj, yj) = (ring[j][0], ring[j][1]);
            if (yi > p[1]) != (yj > p[1]) && p[0] < (xj - xi) * (p[1] - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl PartialEq for Cell {
    /// Same centre and the same set of edges, in any order.
    fn eq(&self, other: &Cell) -> bool {
        self.centre == other.centre
            && self.edges.len() == other.edges.len()
            && self.edges.iter().all(|e| other.edges.contains(e))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cell {} at {} ({} edges)", self.id, self.centre, self.edges.len())?;
        for edge in &self.edges {
            writeln!(f, "  {edge}")?;
        }
        Ok(())
    }
}

fn push_unique(points: &mut Vec<Point>, p: Point) {
    if !points.contains(&p) {
        points.push(p);
    }
}

fn vertex_index(vertices: &mut Vec<Point>, p: &Point) -> usize {
    match vertices.iter().position(|v| v == p) {
        Some(i) => i,
        None => {
            vertices.push(p.clone());
            vertices.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Corner;

    fn pt(x: i32, y: i32) -> Point {
        Point::from((x, y))
    }

    fn seg(x1: i32, y1: i32, x2: i32, y2: i32) -> Segment {
        Segment::new(pt(x1, y1), pt(x2, y2))
    }

    /// The 100x100 square from (100, 100) to (200, 200), centred at (150, 150).
    fn square_cell() -> Cell {
        let mut cell = Cell::new(CellId(0), pt(150, 150));
        cell.add_edge(seg(100, 100, 200, 100));
        cell.add_edge(seg(200, 100, 200, 200));
        cell.add_edge(seg(200, 200, 100, 200));
        cell.add_edge(seg(100, 200, 100, 100));
        cell
    }

    #[test]
    fn test_dedup_edges() {
        let mut cell = square_cell();
        cell.add_edge(seg(100, 100, 100, 200));
        assert_eq!(cell.edges().len(), 5);
        assert_eq!(cell.dedup_edges(), 1);
        assert_eq!(cell.edges().len(), 4);
    }

    #[test]
    fn test_bisection() {
        let wide = Canvas::new(800, 600).unwrap();
        let cell = square_cell();

        // site straight above: horizontal bisector across the canvas
        let b = cell.bisection(&pt(150, 70), &wide).unwrap();
        assert_eq!(b, seg(0, 110, 800, 110));

        // site on the same row: vertical bisector
        let b = cell.bisection(&pt(70, 150), &wide).unwrap();
        assert_eq!(b, seg(110, 0, 110, 600));

        let small = Canvas::new(200, 200).unwrap();
        let b = cell.bisection(&pt(50, 50), &small).unwrap();
        assert_eq!(b, seg(200, 0, 0, 200));
    }

    #[test]
    fn test_bisection_steep_spans_height() {
        let canvas = Canvas::new(200, 200).unwrap();
        let cell = Cell::new(CellId(0), pt(100, 100));
        // slope of the bisector is -1/4, far from vertical
        let b = cell.bisection(&pt(110, 140), &canvas).unwrap();
        assert!(b.x1().is_zero());
        assert_eq!(*b.x2(), Scalar::from(200));

        // slope 4: runs from the top side to the bottom side
        let b = cell.bisection(&pt(140, 110), &canvas).unwrap();
        assert!(b.y1().is_zero());
        assert_eq!(*b.y2(), Scalar::from(200));
        assert!(b.contains(&pt(120, 105)));
    }

    #[test]
    fn test_intersections_through_square() {
        let cell = square_cell();

        let horizontal = seg(0, 150, 800, 150);
        assert_eq!(cell.intersections(&horizontal).unwrap().unwrap(), seg(100, 150, 200, 150));

        let vertical = seg(150, 0, 150, 600);
        assert_eq!(cell.intersections(&vertical).unwrap().unwrap(), seg(150, 100, 150, 200));

        // through two opposite vertices: four edges touch the line
        let diagonal = seg(0, 0, 300, 300);
        assert_eq!(cell.intersections(&diagonal).unwrap().unwrap(), seg(100, 100, 200, 200));
    }

    #[test]
    fn test_intersections_along_edge() {
        let cell = square_cell();
        for edge in cell.edges().to_vec() {
            assert_eq!(cell.intersections(&edge).unwrap().unwrap(), edge);
        }
    }

    #[test]
    fn test_intersections_miss_and_touch() {
        let cell = square_cell();
        assert!(cell.intersections(&seg(0, 50, 800, 50)).unwrap().is_none());
        // touches the corner (200, 100) only
        assert!(cell.intersections(&seg(150, 50, 250, 150)).unwrap().is_none());
    }

    #[test]
    fn test_intersections_one_vertex_on_line() {
        let cell = square_cell();
        // enters at corner (100, 100), leaves through the right edge at (200, 150)
        let line = seg(0, 50, 400, 250);
        assert_eq!(cell.intersections(&line).unwrap().unwrap(), seg(100, 100, 200, 150));
    }

    #[test]
    fn test_trim() {
        let mut cell = square_cell();
        let chord = seg(180, 100, 180, 200);
        cell.trim(&chord);

        assert_eq!(cell.edges().len(), 4);
        assert!(cell.edges().contains(&chord));
        assert!(cell.edges().contains(&seg(100, 100, 180, 100)));
        assert!(cell.edges().contains(&seg(100, 200, 180, 200)));
        assert!(cell.edges().contains(&seg(100, 200, 100, 100)));
        assert!(cell.is_closed());
        assert!((cell.area() - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_trim_cuts_corner() {
        let mut cell = square_cell();
        cell.trim(&seg(150, 100, 200, 150));

        assert_eq!(cell.edges().len(), 5);
        assert!(cell.edges().contains(&seg(100, 100, 150, 100)));
        assert!(cell.edges().contains(&seg(200, 150, 200, 200)));
        assert!(cell.is_closed());
        assert!((cell.area() - 8750.0).abs() < 1e-6);
    }

    #[test]
    fn test_is_complete_without_edges() {
        let canvas = Canvas::new(200, 200).unwrap();
        let p1 = pt(10, 10);
        let p2 = pt(10, 100);
        let p3 = pt(100, 0);

        let mut cell = Cell::new(CellId(0), p1.clone());
        assert!(!cell.is_complete_without_edges(&canvas, CornerSet::all()));

        cell.add_edge(Segment::new(p1.clone(), p2.clone()));
        cell.add_edge(Segment::new(p2.clone(), p3.clone()));
        cell.add_edge(Segment::new(p3.clone(), p1.clone()));
        assert!(cell.is_complete_without_edges(&canvas, CornerSet::all()));

        let mut open = Cell::new(CellId(1), p1.clone());
        open.add_edge(Segment::new(p1, p2.clone()));
        open.add_edge(Segment::new(p2, p3));
        assert!(!open.is_complete_without_edges(&canvas, CornerSet::all()));
    }

    #[test]
    fn test_complete_with_corner_bonus() {
        let canvas = Canvas::new(200, 200).unwrap();
        let mut cell = Cell::new(CellId(1), pt(50, 50));
        cell.add_edge(seg(0, 100, 100, 0));
        assert!(!cell.is_complete_without_edges(&canvas, CornerSet::default()));
        let owned: CornerSet = [Corner::TopLeft].into_iter().collect();
        assert!(cell.is_complete_without_edges(&canvas, owned));
    }

    #[test]
    fn test_unjoined() {
        let mut cell = Cell::new(CellId(0), pt(100, 100));
        cell.add_edge(seg(200, 0, 100, 0));
        cell.add_edge(seg(100, 0, 0, 100));
        cell.add_edge(seg(0, 100, 0, 200));
        cell.add_edge(seg(0, 200, 200, 100));

        let unjoined = cell.unjoined();
        assert_eq!(unjoined.len(), 2);
        assert!(unjoined.contains(&pt(200, 0)));
        assert!(unjoined.contains(&pt(200, 100)));
    }

    #[test]
    fn test_on_border() {
        let canvas = Canvas::new(800, 600).unwrap();
        let mut cell = Cell::new(CellId(0), pt(200, 200));
        cell.add_edge(seg(0, 20, 800, 20));
        cell.add_edge(seg(800, 20, 700, 400));
        cell.add_edge(seg(700, 400, 0, 400));
        cell.add_edge(seg(0, 400, 0, 20));

        let border = cell.on_border(&canvas);
        assert_eq!(border.len(), 3);
        assert!(border.contains(&pt(0, 20)));
        assert!(border.contains(&pt(800, 20)));
        assert!(border.contains(&pt(0, 400)));
    }

    #[test]
    fn test_join_with_border_corner() {
        let canvas = Canvas::new(800, 600).unwrap();
        let mut cell = Cell::new(CellId(1), pt(50, 50));
        cell.add_edge(seg(0, 100, 100, 0));

        let owned: CornerSet = [Corner::TopLeft].into_iter().collect();
        let added = cell.join_with_border(&canvas, owned);

        assert_eq!(added.len(), 2);
        assert!(cell.edges().contains(&seg(0, 0, 0, 100)));
        assert!(cell.edges().contains(&seg(0, 0, 100, 0)));
        assert!(cell.is_closed());
    }

    #[test]
    fn test_join_with_border_strip() {
        // chords cross the canvas top to bottom, no corners owned
        let canvas = Canvas::new(300, 100).unwrap();
        let mut cell = Cell::new(CellId(2), pt(150, 50));
        cell.add_edge(seg(100, 0, 100, 100));
        cell.add_edge(seg(200, 0, 200, 100));

        cell.join_with_border(&canvas, CornerSet::default());
        assert_eq!(cell.edges().len(), 4);
        assert!(cell.edges().contains(&seg(100, 0, 200, 0)));
        assert!(cell.edges().contains(&seg(100, 100, 200, 100)));
        assert!(cell.is_closed());

        // joining again adds nothing
        assert!(cell.join_with_border(&canvas, CornerSet::default()).is_empty());
    }

    #[test]
    fn test_ring_square() {
        let cell = square_cell();
        let ring = cell.ring();
        assert_eq!(ring.len(), 4);
        for v in [[100.0, 100.0], [200.0, 100.0], [200.0, 200.0], [100.0, 200.0]] {
            assert!(ring.iter().any(|r| (r[0] - v[0]).abs() < 1e-6 && (r[1] - v[1]).abs() < 1e-6));
        }
        // descending bearing from the centre
        let bearings: Vec<f64> = ring.iter().map(|v| (v[1] - 150.0).atan2(v[0] - 150.0)).collect();
        assert!(bearings.windows(2).all(|w| w[0] > w[1]));

        assert!((cell.area() - 10000.0).abs() < 1e-6);
        let c = cell.centroid();
        assert!((c[0] - 150.0).abs() < 1e-6);
        assert!((c[1] - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_ring_with_site_on_corner() {
        let canvas = Canvas::new(200, 200).unwrap();
        let full = Cell::with_border(CellId(0), pt(0, 0), &canvas);
        assert_eq!(full.ring().len(), 4);
        assert!((full.area() - 40000.0).abs() < 1e-6);

        // quarter cell of a site sitting on the top-left corner
        let mut quarter = Cell::new(CellId(0), pt(0, 0));
        quarter.add_edge(seg(0, 0, 100, 0));
        quarter.add_edge(seg(100, 0, 100, 100));
        quarter.add_edge(seg(100, 100, 0, 100));
        quarter.add_edge(seg(0, 100, 0, 0));
        assert!((quarter.area() - 10000.0).abs() < 1e-6);
        let [gx, gy] = quarter.centroid();
        assert!((gx - 50.0).abs() < 1e-6 && (gy - 50.0).abs() < 1e-6);
        assert!(quarter.contains_point([20.0, 70.0]));
        assert!(!quarter.contains_point([120.0, 70.0]));
    }

    /// A sawtooth chain whose teeth meet the line y = 100 at their tips or in their middles.
    fn sawtooth(tips: &[(i32, i32)]) -> Cell {
        let mut cell = Cell::new(CellId(3), pt(150, 300));
        for pair in tips.windows(2) {
            cell.add_edge(seg(pair[0].0, pair[0].1, pair[1].0, pair[1].1));
        }
        cell
    }

    #[test]
    fn test_intersections_three_vertices_on_line_is_fatal() {
        let cell = sawtooth(&[(100, 100), (125, 150), (150, 100), (175, 150), (200, 100)]);
        let result = cell.intersections(&seg(0, 100, 800, 100));
        assert!(matches!(result, Err(DiagramError::Degenerate { .. })));
    }

    #[test]
    fn test_intersections_too_many_crossings_is_fatal() {
        let cell = sawtooth(&[(100, 50), (120, 150), (140, 50), (160, 150), (180, 50), (200, 150)]);
        let result = cell.intersections(&seg(0, 100, 800, 100));
        assert!(matches!(result, Err(DiagramError::Degenerate { .. })));
    }

    #[test]
    fn test_ring_invalidated_on_change() {
        let mut cell = square_cell();
        assert_eq!(cell.ring().len(), 4);
        cell.trim(&seg(150, 100, 200, 150));
        assert_eq!(cell.ring().len(), 5);
    }

    #[test]
    fn test_ring_pentagon() {
        let mut cell = Cell::new(CellId(0), pt(250, 250));
        cell.add_edge(seg(200, 200, 250, 150));
        cell.add_edge(seg(250, 150, 300, 250));
        cell.add_edge(seg(300, 250, 250, 400));
        cell.add_edge(seg(250, 400, 220, 300));
        cell.add_edge(seg(220, 300, 200, 200));

        assert_eq!(cell.ring().len(), 5);
        assert!(cell.is_closed());
        assert!(cell.contains_point([250.0, 250.0]));
        assert!(!cell.contains_point([100.0, 100.0]));
    }

    #[test]
    fn test_is_closed_rejects_open_chain() {
        let mut cell = Cell::new(CellId(0), pt(150, 150));
        cell.add_edge(seg(100, 100, 200, 100));
        cell.add_edge(seg(200, 100, 200, 200));
        cell.add_edge(seg(200, 200, 100, 200));
        assert!(!cell.is_closed());
    }

    #[test]
    fn test_cell_equality_ignores_edge_order() {
        let a = square_cell();
        let mut b = Cell::new(CellId(7), pt(150, 150));
        for edge in a.edges().iter().rev() {
            b.add_edge(Segment::new(edge.p2.clone(), edge.p1.clone()));
        }
        assert_eq!(a, b);
    }
}
