use crate::cell::Cell;
use crate::config::DiagramConfig;
use crate::diagram::Diagram;
use crate::distribution::Distribution;
use crate::error::DiagramError;
use crate::geometry::Segment;
use crate::observer::{DiagramEvent, EventLog};
use js_sys::{Array, Object, Reflect};
use std::sync::Arc;
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_rayon::init_thread_pool;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_threads(n: usize) -> js_sys::Promise {
    init_thread_pool(n)
}

#[wasm_bindgen(typescript_custom_section)]
const TS_PHASES: &'static str = r#"
export type Phase =
  | "STARTING"
  | "ADD_POINT_START"
  | "GETTING_BISECTION"
  | "TRIMMING_BEFORE"
  | "TRIMMING_AFTER"
  | "DONE_WITHOUT_BORDER"
  | "JOINING_WITH_BORDER"
  | "DONE";
"#;

fn to_js(err: DiagramError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn segment_to_js(segment: &Segment) -> Vec<f64> {
    let [[x1, y1], [x2, y2]] = segment.to_f64();
    vec![x1, y1, x2, y2]
}

// --- Cell Wrapper ---

#[wasm_bindgen(js_name = VoronoiCell)]
pub struct VoronoiCellWASM {
    inner: Arc<Cell>,
}

#[wasm_bindgen(js_class = VoronoiCell)]
impl VoronoiCellWASM {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> usize { self.inner.id().0 }
    #[wasm_bindgen(getter)]
    pub fn centre(&self) -> Vec<f64> { self.inner.centre().to_f64().to_vec() }
    /// Ring vertices as a flat `[x, y, x, y, ...]` array.
    #[wasm_bindgen(getter)]
    pub fn vertices(&self) -> Vec<f64> { self.inner.ring().iter().flatten().copied().collect() }
    /// Edges as a flat `[x1, y1, x2, y2, ...]` array.
    #[wasm_bindgen(getter)]
    pub fn edges(&self) -> Vec<f64> { self.inner.edges().iter().flat_map(segment_to_js).collect() }
    pub fn area(&self) -> f64 { self.inner.area() }
    pub fn centroid(&self) -> Vec<f64> { self.inner.centroid().to_vec() }
    pub fn contains(&self, x: f64, y: f64) -> bool { self.inner.contains_point([x, y]) }
}

// --- Diagram ---

/// Browser-facing diagram. Insertions run to completion; the phases they went through are
/// recorded and can be replayed with `take_events`.
#[wasm_bindgen]
pub struct VoronoiCanvas {
    inner: Diagram,
    log: EventLog,
}

#[wasm_bindgen]
impl VoronoiCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Result<VoronoiCanvas, JsValue> {
        Self::build(Diagram::new(width, height).map_err(to_js)?)
    }

    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(json: &str) -> Result<VoronoiCanvas, JsValue> {
        let config = DiagramConfig::from_json(json).map_err(to_js)?;
        Self::build(Diagram::from_config(&config.with_manual_mode(true)).map_err(to_js)?)
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 { self.inner.width() }
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 { self.inner.height() }
    #[wasm_bindgen(getter)]
    pub fn count_cells(&self) -> usize { self.inner.cells().len() }
    #[wasm_bindgen(getter)]
    pub fn node_count(&self) -> usize { self.inner.node_count() }
    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String { self.inner.phase().to_string() }

    pub fn reseed(&mut self, seed: u64) { self.inner.reseed(seed); }

    pub fn add_point(&mut self, x: f64, y: f64) -> Result<bool, JsValue> {
        self.inner.add_point_f64(x, y).map_err(to_js)
    }

    /// Adds `count` sites laid out as `"random"`, `"hex"` or `"square"`. Returns how many were inserted.
    pub fn fill(&mut self, count: usize, kind: &str) -> Result<usize, JsValue> {
        let distribution: Distribution = kind.parse().map_err(to_js)?;
        let report = self.inner.fill_canvas(count, distribution).map_err(to_js)?;
        Ok(report.inserted)
    }

    pub fn get_cell(&self, index: usize) -> Option<VoronoiCellWASM> {
        self.inner.cells().get(index).map(|cell| VoronoiCellWASM { inner: Arc::clone(cell) })
    }

    #[wasm_bindgen(getter)]
    pub fn cells(&self) -> Vec<VoronoiCellWASM> {
        self.inner.cells().iter().map(|cell| VoronoiCellWASM { inner: Arc::clone(cell) }).collect()
    }

    /// Ring vertices of all cells, concatenated. See `ring_counts` for the split.
    #[wasm_bindgen(getter)]
    pub fn rings(&self) -> Vec<f64> {
        self.inner.cells().iter().flat_map(|cell| cell.ring().iter().flatten().copied()).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn ring_counts(&self) -> Vec<u32> {
        self.inner.cells().iter().map(|cell| cell.ring().len() as u32).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn centres(&self) -> Vec<f64> {
        self.inner.cells().iter().flat_map(|cell| cell.centre().to_f64()).collect()
    }

    /// Recorded phase names since the last call.
    pub fn take_phases(&mut self) -> Array {
        self.log.drain().iter().map(|e| JsValue::from_str(e.phase.as_str())).collect()
    }

    /// Recorded events since the last call, as plain objects.
    pub fn take_events(&mut self) -> Result<Array, JsValue> {
        let events = Array::new();
        for event in self.log.drain() {
            events.push(&event_to_js(&event)?);
        }
        Ok(events)
    }
}

impl VoronoiCanvas {
    fn build(mut inner: Diagram) -> Result<VoronoiCanvas, JsValue> {
        let log = EventLog::new();
        inner.subscribe(log.clone());
        inner.set_manual_mode(true);
        Ok(VoronoiCanvas { inner, log })
    }

    pub fn diagram(&self) -> &Diagram {
        &self.inner
    }
}

fn event_to_js(event: &DiagramEvent) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &"phase".into(), &event.phase.as_str().into())?;
    Reflect::set(&obj, &"nodeCount".into(), &(event.node_count as f64).into())?;
    Reflect::set(&obj, &"targetNodes".into(), &(event.target_nodes as f64).into())?;

    let payload = &event.payload;
    let bisection = match &payload.bisection {
        Some(segment) => JsValue::from(segment_to_js(segment).into_iter().map(JsValue::from).collect::<Array>()),
        None => JsValue::NULL,
    };
    Reflect::set(&obj, &"bisection".into(), &bisection)?;

    let point = match &payload.adding_point {
        Some(p) => {
            let [x, y] = p.to_f64();
            JsValue::from(Array::of2(&x.into(), &y.into()))
        }
        None => JsValue::NULL,
    };
    Reflect::set(&obj, &"addingPoint".into(), &point)?;

    let trimming = match &payload.trimming_cell {
        Some(cell) => JsValue::from(cell.id().0 as f64),
        None => JsValue::NULL,
    };
    Reflect::set(&obj, &"trimmingCell".into(), &trimming)?;

    let adding = match &payload.adding_cell {
        Some(cell) => JsValue::from(cell.edges().iter().flat_map(segment_to_js).map(JsValue::from).collect::<Array>()),
        None => JsValue::NULL,
    };
    Reflect::set(&obj, &"addingCellEdges".into(), &adding)?;

    Ok(obj.into())
}
